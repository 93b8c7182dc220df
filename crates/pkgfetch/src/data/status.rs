use std::fmt;

use crate::error::FetchError;

/// Terminal result of one fetch call.
///
/// A fetch call always ends with exactly one of these; errors never unwind
/// past the call boundary.
#[derive(Debug)]
pub enum FetchStatus {
    /// Bytes were written and the item's mtime was updated.
    Ok,

    /// The server reported the artifact unchanged. Nothing was written.
    UpToDate,

    /// The fetch failed for good. The destination contents are undefined.
    Fatal(FetchError),

    /// The caller cancelled the fetch. The destination contents are undefined.
    Cancelled,
}

impl FetchStatus {
    /// Returns `true` when the destination holds authoritative contents.
    pub fn is_success(&self) -> bool { matches!(self, FetchStatus::Ok | FetchStatus::UpToDate) }

    pub fn is_fatal(&self) -> bool { matches!(self, FetchStatus::Fatal(_)) }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchStatus::Fatal(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStatus::Ok => write!(f, "ok"),
            FetchStatus::UpToDate => write!(f, "up-to-date"),
            FetchStatus::Fatal(e) => write!(f, "fatal: {e}"),
            FetchStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}
