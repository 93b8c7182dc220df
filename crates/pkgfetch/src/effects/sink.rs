use std::future::Future;
use std::io::{self, SeekFrom};
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

/// Where the bytes of a fetch go.
///
/// [`begin_attempt`](Destination::begin_attempt) runs before the first
/// success bytes of an attempt and must discard whatever an earlier attempt
/// of the same call wrote. Attempts that never see success bytes leave the
/// destination alone.
pub trait Destination: Send {
    /// Reposition to the origin and drop bytes from a previous attempt.
    fn begin_attempt(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Append one body chunk. A short write is an error.
    fn write_chunk(&mut self, chunk: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Flush after a successful attempt.
    fn finish(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

/// A file destination working on a duplicate of the caller's handle.
///
/// The origin is the caller's position when the destination was created.
/// Attempts truncate back to it, so partial bytes from a failed attempt
/// never survive into a later one.
#[derive(Debug)]
pub struct FileDestination {
    file:   File,
    origin: u64,
}

impl FileDestination {
    /// Duplicate `file` and remember its current position as the origin.
    pub async fn duplicate(file: &File) -> io::Result<Self> {
        let mut file = file.try_clone().await?;
        let origin = file.stream_position().await?;
        Ok(Self { file, origin })
    }

    /// Create (or truncate) the file at `path`.
    pub async fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path).await?;
        Ok(Self { file, origin: 0 })
    }

    pub fn origin(&self) -> u64 { self.origin }
}

impl Destination for FileDestination {
    async fn begin_attempt(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(self.origin)).await?;
        self.file.set_len(self.origin).await
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> { self.file.write_all(chunk).await }

    async fn finish(&mut self) -> io::Result<()> {
        self.file.flush().await?;
        self.file.sync_data().await
    }
}

/// In-memory destination; cleared at the start of each attempt.
impl Destination for Vec<u8> {
    async fn begin_attempt(&mut self) -> io::Result<()> {
        self.clear();
        Ok(())
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.extend_from_slice(chunk);
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> { Ok(()) }
}
