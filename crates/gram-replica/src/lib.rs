//! gram-replica library.
//!
//! Client-side view of engagement state:
//!
//! - [`cache::ReplicaCache`]: immutable per-initiative snapshots plus the
//!   speculative mutations still in flight, advanced only by reducers
//! - [`engine::ReconciliationEngine`]: applies a mutation to the cache
//!   synchronously, issues the request, then confirms or rolls back that one
//!   mutation when its own response arrives
//! - [`transport`]: how requests reach the authoritative store, either
//!   in-process ([`transport::LocalTransport`]) or over HTTP
//!   ([`http::HttpTransport`])

pub mod cache;
pub mod engine;
pub mod error;
pub mod http;
pub mod transport;

pub use cache::{ReplicaCache, TempId};
pub use engine::{MutationId, MutationState, ReconciliationEngine, Ticket};
pub use error::ReplicaError;
pub use http::HttpTransport;
pub use transport::{EngagementTransport, LocalTransport, TransportError};
