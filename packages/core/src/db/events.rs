//! Domain Events
//!
//! Events published whenever repository state changes or a transaction
//! finishes abnormally. Other parts of the system (logging, the dev server,
//! tests) subscribe without coupling to the store implementation.
//!
//! # Event Flow
//!
//! 1. A transaction commits; the store publishes one event per changed node
//! 2. A transaction rolls back; the coordinator publishes `TransactionRolledBack`
//! 3. A rollback compensation finishes; it publishes `CompensationCompleted`
//!    or `CompensationFailed`

use crate::models::{Node, NodeRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain events broadcast by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// A node was created or updated by a committed transaction
    #[serde(rename = "node:updated")]
    NodeUpdated { node: Node },

    /// A node was deleted by a committed transaction
    #[serde(rename = "node:deleted")]
    NodeDeleted {
        #[serde(rename = "nodeRef")]
        node_ref: NodeRef,
    },

    /// A transaction's staged writes were discarded
    #[serde(rename = "transaction:rolledBack")]
    TransactionRolledBack {
        #[serde(rename = "transactionId")]
        transaction_id: Uuid,
    },

    /// Rollback compensation released a node
    #[serde(rename = "compensation:completed")]
    CompensationCompleted {
        #[serde(rename = "nodeRef")]
        node_ref: NodeRef,
        deleted: bool,
    },

    /// Rollback compensation gave up on a node
    #[serde(rename = "compensation:failed")]
    CompensationFailed {
        #[serde(rename = "nodeRef")]
        node_ref: NodeRef,
        reason: String,
    },
}

impl DomainEvent {
    /// String form of the event type, as used in logs
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::NodeUpdated { .. } => "node:updated",
            DomainEvent::NodeDeleted { .. } => "node:deleted",
            DomainEvent::TransactionRolledBack { .. } => "transaction:rolledBack",
            DomainEvent::CompensationCompleted { .. } => "compensation:completed",
            DomainEvent::CompensationFailed { .. } => "compensation:failed",
        }
    }

    /// Node the event concerns, if any
    pub fn node_ref(&self) -> Option<&NodeRef> {
        match self {
            DomainEvent::NodeUpdated { node } => Some(&node.node_ref),
            DomainEvent::NodeDeleted { node_ref }
            | DomainEvent::CompensationCompleted { node_ref, .. }
            | DomainEvent::CompensationFailed { node_ref, .. } => Some(node_ref),
            DomainEvent::TransactionRolledBack { .. } => None,
        }
    }
}
