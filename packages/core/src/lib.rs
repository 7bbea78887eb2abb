//! DriveLink Core Business Logic Layer
//!
//! This crate removes Google Docs editing state from repository nodes: it
//! deletes the Drive copy of a checked-out node, releases the node, and
//! compensates after a denied removal rolls back.
//!
//! # Architecture
//!
//! - **Transactional store**: writes are staged per transaction and committed
//!   atomically with an optimistic version check
//! - **Rollback listeners**: cleanup bound to a transaction runs after it rolls
//!   back, in a new transaction of its own
//! - **Explicit escalation**: system-identity work requires a `SystemAuthority`
//!
//! # Modules
//!
//! - [`models`] - Data structures (NodeRef, Node, Identity, request payloads)
//! - [`db`] - Repository layer with the in-memory node store and domain events
//! - [`transaction`] - Transactions, rollback listeners and the coordinator
//! - [`services`] - Drive access, document service, removal handler, compensation
//! - [`api`] - axum HTTP surface
//! - [`config`] - Environment-driven server configuration

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod transaction;

// Re-export commonly used types
pub use config::{ConfigError, ServerConfig, TransactionConfig};
pub use db::{DomainEvent, MemoryStore, NodeStore, StoreError};
pub use models::*;
pub use services::*;
pub use transaction::{RollbackListener, Transaction, TransactionCoordinator};
