//! Error types for pkgfetch.

use std::io;

use thiserror::Error;

/// Why a fetch attempt (or a whole fetch call) failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("destination write failed: {0}")]
    Sink(#[source] io::Error),

    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last:     Box<FetchError>,
    },
}

impl FetchError {
    pub(crate) fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::InvalidUrl {
            url:    url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures reported by the transport itself, before any status is classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("timed out")]
    Timeout,

    #[error("connection reset: {0}")]
    Reset(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("transfer ended before completion")]
    Incomplete,

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Figment(#[from] figment::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;
