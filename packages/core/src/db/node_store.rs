//! NodeStore Trait - Repository Abstraction Layer
//!
//! This module defines the `NodeStore` trait that abstracts transactional node
//! persistence. Services talk to the trait; `MemoryStore` is the bundled
//! implementation.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All data methods are async so a networked repository can
//!    implement the trait without blocking
//! 2. **Transaction-Scoped**: Every read and write goes through a [`Transaction`];
//!    writes are staged and only become visible to others on `commit`
//! 3. **Permission Checks at the Store**: Writes are checked against the
//!    transaction's identity and fail with `StoreError::AccessDenied`
//! 4. **Ownership Semantics**: `save_node` takes the node by value

use crate::db::{DomainEvent, StoreError};
use crate::models::{Aspect, Node, NodeRef};
use crate::transaction::Transaction;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Result of a delete operation
///
/// Deleting a missing node is not an error; `existed` reports whether there
/// was anything to delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResult {
    pub existed: bool,
}

impl DeleteResult {
    pub fn existed() -> Self {
        Self { existed: true }
    }

    pub fn not_found() -> Self {
        Self { existed: false }
    }
}

/// Transactional node persistence
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store is shared by every request
/// task and by rollback compensation tasks.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Read a node as seen by `tx` (its own staged writes first)
    ///
    /// Returns `Ok(None)` if the node does not exist.
    async fn get_node(&self, tx: &Transaction, node_ref: &NodeRef) -> Result<Option<Node>, StoreError>;

    /// Stage a create or update of `node`
    ///
    /// # Errors
    ///
    /// - `AccessDenied` if the transaction's identity may not write the node
    /// - `TransactionClosed` if `tx` is no longer active
    async fn save_node(&self, tx: &Transaction, node: Node) -> Result<(), StoreError>;

    /// Stage deletion of a node
    ///
    /// # Errors
    ///
    /// - `AccessDenied` if the transaction's identity may not write the node
    /// - `Constraint` if the node is still checked out for editing
    async fn delete_node(&self, tx: &Transaction, node_ref: &NodeRef) -> Result<DeleteResult, StoreError>;

    /// Apply all staged writes atomically
    ///
    /// # Errors
    ///
    /// - `ConcurrencyFailure` if a node changed since the transaction read it
    /// - `Constraint` if the resulting state breaks an integrity rule
    ///
    /// Nothing is applied when an error is returned.
    async fn commit(&self, tx: &Transaction) -> Result<(), StoreError>;

    /// Discard all staged writes
    async fn rollback(&self, tx: &Transaction);

    /// Publish an event to subscribers
    fn publish(&self, event: DomainEvent);

    /// Subscribe to domain events
    fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent>;

    /// Whether the node exists and carries `aspect`
    async fn has_aspect(
        &self,
        tx: &Transaction,
        node_ref: &NodeRef,
        aspect: Aspect,
    ) -> Result<bool, StoreError> {
        Ok(self
            .get_node(tx, node_ref)
            .await?
            .map_or(false, |node| node.has_aspect(aspect)))
    }
}
