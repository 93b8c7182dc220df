//! I/O side of the engine: transports, destinations, event sinks, mirror
//! discovery and the attempt loop that ties them together.

mod bridge;
mod discovery;
mod events;
mod fetcher;
mod http;
mod sink;
mod transport;

pub use discovery::{MirrorResolver, NoResolver, StaticResolver};
pub use events::{EventLog, EventSink, TracingSink};
#[cfg(feature = "reqwest")]
pub use http::{ReqwestConnector, ReqwestTransport};
pub use sink::{Destination, FileDestination};
pub use transport::{BoxStream, Connector, EventStream, TransferEvent, TransferRequest, Transport, TransportConfig};

pub(crate) use fetcher::FetchPlan;
