//! gram-core library.
//!
//! Authoritative engagement state for initiatives: the SQLite-backed
//! [`store::EngagementStore`], the vote/comment services layered over it, and
//! the wire types shared by the HTTP server and client replicas.
//!
//! # Conventions
//!
//! - **Errors**: service and store paths return [`error::EngagementError`];
//!   setup/glue code uses `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod model;
pub mod service;
pub mod store;

pub use error::{EngagementError, ErrorCode};
pub use store::EngagementStore;
