//! Plain data types shared by the selection, transfer and session layers.
//!
//! Nothing in here performs I/O. Values are cheap to clone and are handed
//! between the pure `core` functions and the effectful `effects` layer.

pub mod event;
pub mod item;
pub mod mirror;
pub mod status;

pub use event::FetchEvent;
pub use item::FetchItem;
pub use mirror::{Candidate, MirrorStrategy, SrvRecord};
pub use status::FetchStatus;
