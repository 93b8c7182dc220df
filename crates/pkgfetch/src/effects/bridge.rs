use std::io;

use crate::core::is_success;
use crate::effects::events::EventSink;
use crate::effects::sink::Destination;

/// Per-attempt mutable state: the sink, the byte count and the last status.
///
/// The sink is only reset once the attempt has a success response to write,
/// so a `304` or an error page leaves the destination as it was.
pub(crate) struct TransferContext<'d, D: Destination> {
    sink:     &'d mut D,
    written:  u64,
    status:   u16,
    prepared: bool,
}

impl<'d, D: Destination> TransferContext<'d, D> {
    pub(crate) fn new(sink: &'d mut D) -> Self {
        Self {
            sink,
            written: 0,
            status: 0,
            prepared: false,
        }
    }

    pub(crate) fn status(&self) -> u16 { self.status }

    pub(crate) fn written(&self) -> u64 { self.written }

    #[cfg(test)]
    pub(crate) fn prepared(&self) -> bool { self.prepared }

    pub(crate) fn set_status(&mut self, status: u16) { self.status = status }

    /// Discard earlier partial output. Runs at most once per attempt.
    pub(crate) async fn prepare(&mut self) -> io::Result<()> {
        if !self.prepared {
            self.sink.begin_attempt().await?;
            self.prepared = true;
        }
        Ok(())
    }

    pub(crate) async fn finish(&mut self) -> io::Result<()> { self.sink.finish().await }
}

/// Translates transport events into engine events.
///
/// The `started` flag lives for the whole fetch call: `fetch-begin` fires
/// at most once per call, however many attempts or header lines there are.
/// `touched` records that some attempt of the call reset the sink.
pub(crate) struct ProgressBridge<'a> {
    events:   &'a dyn EventSink,
    url:      &'a str,
    expected: u64,
    started:  bool,
    touched:  bool,
}

impl<'a> ProgressBridge<'a> {
    pub(crate) fn new(events: &'a dyn EventSink, url: &'a str, expected: u64) -> Self {
        Self {
            events,
            url,
            expected,
            started: false,
            touched: false,
        }
    }

    pub(crate) fn started(&self) -> bool { self.started }

    pub(crate) fn touched(&self) -> bool { self.touched }

    /// Reset the sink for this attempt and remember that the call did so.
    pub(crate) async fn prepare<D: Destination>(&mut self, ctx: &mut TransferContext<'_, D>) -> io::Result<()> {
        self.touched = true;
        ctx.prepare().await
    }

    /// Called once per response header line.
    pub(crate) fn on_header<D: Destination>(&mut self, ctx: &mut TransferContext<'_, D>, status: u16) {
        ctx.set_status(status);
        if is_success(status) && !self.started {
            self.events.fetch_begin(self.url);
            self.events.progress_start();
            self.started = true;
        }
    }

    /// Forward a progress tick unless the current response is an error.
    pub(crate) fn on_progress<D: Destination>(&self, ctx: &TransferContext<'_, D>, downloaded: u64, total: u64) {
        if !is_success(ctx.status()) {
            return;
        }
        let total = if total == 0 { self.expected } else { total };
        self.events.progress_tick(downloaded, total);
    }

    /// Append a body chunk. Bodies of non-success responses are dropped.
    pub(crate) async fn on_data<D: Destination>(
        &mut self,
        ctx: &mut TransferContext<'_, D>,
        chunk: &[u8],
    ) -> io::Result<()> {
        if !is_success(ctx.status()) {
            return Ok(());
        }
        self.prepare(ctx).await?;
        ctx.sink.write_chunk(chunk).await?;
        ctx.written += chunk.len() as u64;
        Ok(())
    }
}
