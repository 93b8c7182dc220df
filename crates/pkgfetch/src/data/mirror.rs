use std::fmt;

use url::Url;

/// How a repository spreads its artifacts across endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MirrorStrategy {
    /// Fetch the item URL as-is; retries hit the same URL.
    #[default]
    Direct,

    /// A fixed list of mirror base URLs, tried in order with wrap-around.
    StaticList(Vec<String>),

    /// Mirrors advertised by `_http._tcp.<host>` service records.
    ServiceDiscovery,
}

/// A service discovery record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SrvRecord {
    pub host:     String,
    pub port:     u16,
    pub priority: u16,
}

impl SrvRecord {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            priority: 0,
        }
    }

    #[must_use]
    pub fn priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }
}

/// One concrete endpoint for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// An opaque URL: the item URL itself or a static mirror rebased onto it.
    Url(Url),

    /// A discovered host/port with the item path applied.
    Endpoint { host: String, port: u16, url: Url },
}

impl Candidate {
    pub fn url(&self) -> &Url {
        match self {
            Candidate::Url(url) => url,
            Candidate::Endpoint { url, .. } => url,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Candidate::Url(url) => write!(f, "{url}"),
            Candidate::Endpoint { host, port, .. } => write!(f, "{host}:{port}"),
        }
    }
}
