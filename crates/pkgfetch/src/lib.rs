//! Mirror-aware conditional fetching of repository artifacts.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Plain types: items, mirror strategies, statuses, events
//! - [`core`] - Pure decisions: classification, mirror cursoring, retry accounting
//! - effects - Transports, destinations, event sinks and the attempt loop
//!
//! A [`RepositorySession`] owns one long-lived transport and fetches items
//! through it, one at a time. Each fetch call walks the session's mirrors in
//! round-robin order, retries transient failures up to the configured
//! ceiling, and ends with exactly one [`FetchStatus`].
//!
//! # Example
//!
//! ```no_run
//! use pkgfetch::{FetchItem, FetchStatus, RepositorySession, ReqwestConnector};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = RepositorySession::new("FreeBSD", "pkg+http://pkg.example.org/FreeBSD", ReqwestConnector);
//! let mut item = FetchItem::new("http://pkg.example.org/FreeBSD/meta.conf").mtime(1_700_000_000);
//! let mut body = Vec::<u8>::new();
//!
//! match session.fetch(&mut item, &mut body).await {
//!     FetchStatus::Ok => println!("{} bytes, mtime {}", body.len(), item.mtime),
//!     FetchStatus::UpToDate => println!("unchanged"),
//!     other => eprintln!("{other}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod data;
mod effects;
mod error;
mod session;

pub use config::FetchConfig;
pub use data::{Candidate, FetchEvent, FetchItem, FetchStatus, MirrorStrategy, SrvRecord};
pub use effects::{
    BoxStream, Connector, Destination, EventLog, EventSink, EventStream, FileDestination, MirrorResolver,
    NoResolver, StaticResolver, TracingSink, TransferEvent, TransferRequest, Transport, TransportConfig,
};
#[cfg(feature = "reqwest")]
pub use effects::{ReqwestConnector, ReqwestTransport};
pub use error::{ConfigError, FetchError, Result, TransportError};
pub use session::RepositorySession;
