//! Session orchestration for the tic-tac-toe session service.
//!
//! Ties the pure session model to the outside world: the per-instance
//! connection registry, the coordinator that persists, publishes and fans
//! out every mutation, and the service configuration.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with environment overrides
//! - [`registry`] -- Live connections and their participant identities
//! - [`coordinator`] -- Command handling and cross-instance reconciliation

pub mod config;
pub mod coordinator;
pub mod registry;

pub use config::{ConfigError, TictacConfig};
pub use coordinator::{Committed, SessionCoordinator};
pub use registry::{ConnectionRegistry, OUTBOX_CAPACITY, Outbox, outbox};
