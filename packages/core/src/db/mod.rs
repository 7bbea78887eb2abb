//! Repository Layer
//!
//! This module handles node persistence:
//!
//! - `NodeStore` trait - transactional read/write abstraction
//! - `MemoryStore` - in-memory implementation with optimistic concurrency
//! - `DomainEvent` - change notifications broadcast to subscribers
//! - `StoreError` - permission, integrity and concurrency failures

mod error;
pub mod events;
mod memory_store;
mod node_store;

pub use error::StoreError;
pub use events::DomainEvent;
pub use memory_store::MemoryStore;
pub use node_store::{DeleteResult, NodeStore};
