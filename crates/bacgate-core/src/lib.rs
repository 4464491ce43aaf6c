//! Synchronization engine mirroring one remote device's object model
//! into a persisted folder tree.
//!
//! The embedding application supplies a [`RemoteLink`](bacgate_proto::RemoteLink)
//! implementation and a [`SessionStore`](session::SessionStore), builds a
//! [`Gateway`] per device, and drives it:
//!
//! 1. [`Gateway::restore`] rebuilds the tree from persisted state,
//!    pruning nodes that no longer make sense, then fetches every point
//!    once and puts each on COV or the poll fallback.
//! 2. [`Gateway::discover`] walks the remote object list and mirrors
//!    everything not yet known.
//! 3. Points expose their mapped attributes behind watch channels; see
//!    [`tree::Point::subscribe`].
//!
//! Frame encoding and the socket live behind the link; this crate only
//! ever sees decoded values.

pub mod config;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod mapper;
pub mod model;
pub mod plan;
pub mod poller;
pub mod session;
pub mod subscription;
pub mod tree;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{CovConfig, CovMode, GatewayConfig};
pub use error::CoreError;
pub use gateway::Gateway;
pub use mapper::MapperCtx;
pub use model::{DataType, PointAttrs, PointConfig};
pub use session::{AttrMap, JsonFileStore, MemoryStore, SessionStore};
pub use tree::{Child, Folder, Point};
