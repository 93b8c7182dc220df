use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;
use url::Url;

use crate::error::TransportError;

/// A boxed stream type for transfer events.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// The events of one attempt, in the order the transport observed them.
pub type EventStream = BoxStream<'static, Result<TransferEvent, TransportError>>;

/// Low-level notifications from a transport while one attempt runs.
///
/// An `Err` item in the [`EventStream`] is a transport-level failure
/// (connect error, reset, timeout); the stream is abandoned after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// One response header line. Fires once per line, status included.
    Header { status: u16, line: String },

    /// Cumulative body progress. `total` is `0` when unknown.
    Progress { downloaded: u64, total: u64 },

    /// A chunk of the response body.
    Data(Bytes),

    /// The response finished. `filetime` is the server's modification
    /// time in epoch seconds, if it reported one.
    Complete { status: u16, filetime: Option<i64> },
}

/// Everything a transport needs to run one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub url: Url,

    /// Fetch only if modified after this time (epoch seconds).
    pub if_modified_since: Option<i64>,

    /// Upper bound for the whole attempt.
    pub timeout: Option<Duration>,

    /// Ask the transport for wire-level debug output.
    pub verbose: bool,
}

impl TransferRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            if_modified_since: None,
            timeout: None,
            verbose: false,
        }
    }

    #[must_use]
    pub fn if_modified_since(mut self, mtime: Option<i64>) -> Self {
        self.if_modified_since = mtime;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Session-wide transport settings, fixed when the session opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportConfig {
    /// Skip TLS peer certificate verification. Compatibility escape hatch.
    pub tls_no_verify_peer: bool,

    /// Skip TLS hostname verification. Compatibility escape hatch.
    pub tls_no_verify_hostname: bool,

    /// Wire-level debug output.
    pub verbose: bool,
}

/// Opens the long-lived transport of a repository session.
pub trait Connector: Send + Sync {
    type Transport: Transport;

    /// Create the connection pool. Called once per session open.
    fn connect(&self, config: &TransportConfig) -> Result<Self::Transport, TransportError>;
}

/// A multiplexed connection pool capable of conditional GETs.
///
/// Implementations follow same-origin redirects on their own and perform
/// no retries; retrying is the orchestrator's job.
pub trait Transport: Send + Sync {
    /// Start one attempt. The returned stream does the work as it is
    /// polled; dropping it aborts the transfer.
    fn begin(&self, request: TransferRequest) -> Result<EventStream, TransportError>;
}
