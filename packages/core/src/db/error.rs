//! Store Error Types
//!
//! This module defines error types for repository store operations, covering
//! permission checks, integrity rules and optimistic concurrency failures.

use crate::models::{Identity, NodeRef};
use thiserror::Error;
use uuid::Uuid;

/// Repository store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Identity is not allowed to modify the node
    #[error("Access denied: {identity} may not modify {node_ref}")]
    AccessDenied { node_ref: NodeRef, identity: Identity },

    /// An integrity rule rejected the change
    #[error("Integrity violation on {node_ref}: {reason}")]
    Constraint { node_ref: NodeRef, reason: String },

    /// Node was changed by another transaction since it was read
    #[error("Concurrency failure on {node_ref}: expected version {expected:?}, found {actual:?}")]
    ConcurrencyFailure {
        node_ref: NodeRef,
        expected: Option<i64>,
        actual: Option<i64>,
    },

    /// Transaction has already been committed or rolled back
    #[error("Transaction {transaction_id} is no longer active")]
    TransactionClosed { transaction_id: Uuid },
}

impl StoreError {
    /// Create an access denied error
    pub fn access_denied(node_ref: NodeRef, identity: Identity) -> Self {
        Self::AccessDenied { node_ref, identity }
    }

    /// Create an integrity violation error
    pub fn constraint(node_ref: NodeRef, reason: impl Into<String>) -> Self {
        Self::Constraint {
            node_ref,
            reason: reason.into(),
        }
    }

    /// Create a concurrency failure error
    pub fn concurrency_failure(node_ref: NodeRef, expected: Option<i64>, actual: Option<i64>) -> Self {
        Self::ConcurrencyFailure {
            node_ref,
            expected,
            actual,
        }
    }

    /// Create a closed transaction error
    pub fn transaction_closed(transaction_id: Uuid) -> Self {
        Self::TransactionClosed { transaction_id }
    }

    /// Whether retrying the whole transaction may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyFailure { .. })
    }
}
