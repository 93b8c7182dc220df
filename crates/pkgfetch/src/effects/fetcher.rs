//! The attempt loop of one fetch call.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::FetchConfig;
use crate::core::{Disposition, MirrorSelector, RetryBudget, classify, is_success, retry_delay};
use crate::data::{Candidate, FetchItem, FetchStatus};
use crate::effects::bridge::{ProgressBridge, TransferContext};
use crate::effects::events::EventSink;
use crate::effects::sink::Destination;
use crate::effects::transport::{TransferEvent, TransferRequest, Transport};
use crate::error::{FetchError, TransportError};

/// How one attempt ended, before classification.
#[derive(Debug)]
enum Attempt {
    Completed { status: u16, filetime: Option<i64>, written: u64 },
    Failed(FetchError),
    Cancelled,
}

/// Shared inputs of every attempt in a call.
pub(crate) struct FetchPlan<'a, T: Transport> {
    pub(crate) transport: &'a T,
    pub(crate) config:    &'a FetchConfig,
    pub(crate) events:    &'a dyn EventSink,
    pub(crate) cancel:    &'a CancellationToken,
}

impl<'a, T: Transport> FetchPlan<'a, T> {
    /// Drive attempts against `selector` until one classifies as terminal.
    ///
    /// On [`FetchStatus::Ok`] the item's `mtime` carries the server's
    /// modification time when the server reported one.
    pub(crate) async fn run<D: Destination>(
        &self,
        mut selector: MirrorSelector,
        item: &mut FetchItem,
        dest: &mut D,
    ) -> FetchStatus {
        let url = item.url.clone();
        let mut bridge = ProgressBridge::new(self.events, &url, item.size);
        let mut budget = RetryBudget::new(self.config.fetch_retry);

        loop {
            let attempt = budget.start_attempt();
            let candidate = match selector.next_candidate() {
                Ok(candidate) => candidate,
                Err(e) => {
                    self.events.error(&e.to_string());
                    return FetchStatus::Fatal(e);
                },
            };
            debug!(attempt, %candidate, "fetching {url}");

            let request = TransferRequest::new(candidate.url().clone())
                .if_modified_since(item.modified_since())
                .timeout(self.config.timeout())
                .verbose(self.config.verbose());

            let failure = match self.attempt(request, dest, &mut bridge).await {
                Attempt::Cancelled => {
                    info!("fetch of {url} cancelled");
                    return FetchStatus::Cancelled;
                },
                Attempt::Failed(e) => e,
                Attempt::Completed {
                    status,
                    filetime,
                    written,
                } => match classify(status) {
                    Disposition::Fetched => {
                        if let Some(mtime) = filetime {
                            item.mtime = mtime;
                        }
                        debug!(written, mtime = item.mtime, "fetched {url}");
                        return FetchStatus::Ok;
                    },
                    Disposition::Unmodified => {
                        debug!("{url} is up to date");
                        return FetchStatus::UpToDate;
                    },
                    Disposition::NotFound => {
                        let e = FetchError::NotFound {
                            url: candidate.url().to_string(),
                        };
                        if !self.config.advance_on_not_found {
                            self.report(&url, &candidate, &e, None);
                            return FetchStatus::Fatal(e);
                        }
                        e
                    },
                    Disposition::Transient => FetchError::HttpStatus {
                        status,
                        url: candidate.url().to_string(),
                    },
                },
            };

            if !budget.consume() {
                self.report(&url, &candidate, &failure, None);
                return FetchStatus::Fatal(FetchError::RetriesExhausted {
                    attempts: attempt,
                    last:     Box::new(failure),
                });
            }
            self.report(&url, &candidate, &failure, Some(budget.remaining()));

            if let Some(status) = self.backoff(attempt).await {
                return status;
            }
        }
    }

    fn report(&self, url: &str, candidate: &Candidate, error: &FetchError, remaining: Option<u32>) {
        let message = format!("An error occurred while fetching {url} from {candidate}: {error}");
        match remaining {
            Some(remaining) => warn!(remaining, "{message}, retrying"),
            None => warn!("{message}, giving up"),
        }
        self.events.error(&message);
    }

    /// Sleep between attempts. Returns a status only if cancelled meanwhile.
    async fn backoff(&self, attempt: u32) -> Option<FetchStatus> {
        let base = self.config.retry_backoff();
        if base.is_zero() {
            return None;
        }
        let delay = retry_delay(attempt.saturating_sub(1), base);
        trace!(?delay, "backing off");
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Some(FetchStatus::Cancelled),
            _ = tokio::time::sleep(delay) => None,
        }
    }

    /// Run one attempt to its end, its deadline or cancellation.
    ///
    /// The transport is polled in slices of at most one poll interval so a
    /// cancellation or an expired deadline is noticed even on a silent
    /// connection.
    async fn attempt<D: Destination>(
        &self,
        request: TransferRequest,
        dest: &mut D,
        bridge: &mut ProgressBridge<'_>,
    ) -> Attempt {
        let deadline = request.timeout.map(|timeout| Instant::now() + timeout);
        let poll_interval = self.config.poll_interval();

        // Output of an earlier attempt in this call must not survive this one.
        let mut ctx = TransferContext::new(dest);
        if bridge.touched()
            && let Err(e) = bridge.prepare(&mut ctx).await
        {
            return Attempt::Failed(FetchError::Sink(e));
        }
        let mut stream = match self.transport.begin(request) {
            Ok(stream) => stream,
            Err(e) => return Attempt::Failed(e.into()),
        };

        let mut completion = None;
        loop {
            if self.cancel.is_cancelled() {
                return Attempt::Cancelled;
            }
            let wait = match deadline {
                Some(deadline) => match remaining(deadline) {
                    Some(left) => poll_interval.min(left),
                    None => return Attempt::Failed(TransportError::Timeout.into()),
                },
                None => poll_interval,
            };

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Attempt::Cancelled,
                next = tokio::time::timeout(wait, stream.next()) => next,
            };
            let event = match next {
                Err(_) => continue,
                Ok(None) => break,
                Ok(Some(Err(e))) => return Attempt::Failed(e.into()),
                Ok(Some(Ok(event))) => event,
            };

            match event {
                TransferEvent::Header { status, line } => {
                    trace!(status, "< {line}");
                    bridge.on_header(&mut ctx, status);
                },
                TransferEvent::Progress { downloaded, total } => bridge.on_progress(&ctx, downloaded, total),
                TransferEvent::Data(chunk) => {
                    if let Err(e) = bridge.on_data(&mut ctx, &chunk).await {
                        return Attempt::Failed(FetchError::Sink(e));
                    }
                },
                TransferEvent::Complete { status, filetime } => {
                    ctx.set_status(status);
                    completion = Some((status, filetime));
                },
            }
        }

        let Some((status, filetime)) = completion else {
            return Attempt::Failed(TransportError::Incomplete.into());
        };
        if is_success(status) {
            // An empty body still replaces what the destination held.
            if let Err(e) = bridge.prepare(&mut ctx).await {
                return Attempt::Failed(FetchError::Sink(e));
            }
            if let Err(e) = ctx.finish().await {
                return Attempt::Failed(FetchError::Sink(e));
            }
        }
        Attempt::Completed {
            status,
            filetime,
            written: ctx.written(),
        }
    }
}

fn remaining(deadline: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    (!left.is_zero()).then_some(left)
}
