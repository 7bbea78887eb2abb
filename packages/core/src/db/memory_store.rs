//! In-memory transactional repository
//!
//! `MemoryStore` keeps committed nodes in a map guarded by an `RwLock`.
//! Transactions stage their writes privately; `commit` validates every staged
//! write (optimistic version check, integrity rules) before applying any of
//! them, then publishes one domain event per changed node.
//!
//! # Integrity rules
//!
//! - A node still carrying `gd2:editingInGoogle` cannot be deleted
//! - A committed node carrying `gd2:editingInGoogle` must hold a lock

use crate::db::{DeleteResult, DomainEvent, NodeStore, StoreError};
use crate::models::{Aspect, Node, NodeRef};
use crate::transaction::{StagedWrite, Transaction, TransactionStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

/// Broadcast channel capacity for domain events.
///
/// Subscribers that lag simply miss old events; only current state matters.
const DOMAIN_EVENT_CHANNEL_CAPACITY: usize = 128;

pub struct MemoryStore {
    nodes: RwLock<HashMap<NodeRef, Node>>,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(DOMAIN_EVENT_CHANNEL_CAPACITY);
        Self {
            nodes: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Create a store pre-populated with committed nodes
    pub fn with_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let store = Self::new();
        for node in nodes {
            store.insert_node(node);
        }
        store
    }

    /// Insert or replace a committed node directly, bypassing transactions
    ///
    /// Intended for seeding; no events are published.
    pub fn insert_node(&self, node: Node) {
        self.write_nodes().insert(node.node_ref.clone(), node);
    }

    /// Committed state of a node, outside any transaction
    pub fn committed_node(&self, node_ref: &NodeRef) -> Option<Node> {
        self.read_nodes().get(node_ref).cloned()
    }

    /// Number of committed nodes
    pub fn len(&self) -> usize {
        self.read_nodes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_nodes().is_empty()
    }

    fn read_nodes(&self) -> RwLockReadGuard<'_, HashMap<NodeRef, Node>> {
        self.nodes.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_nodes(&self) -> RwLockWriteGuard<'_, HashMap<NodeRef, Node>> {
        self.nodes.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current view of a node for `tx`, plus the version its next write is based on
    fn view(&self, tx: &Transaction, node_ref: &NodeRef) -> (Option<Node>, Option<i64>) {
        match tx.staged(node_ref) {
            Some(StagedWrite::Put { node, base_version }) => (Some(node), base_version),
            Some(StagedWrite::Delete { base_version }) => (None, base_version),
            None => {
                let committed = self.committed_node(node_ref);
                let base_version = committed.as_ref().map(|node| node.version);
                (committed, base_version)
            }
        }
    }

    fn validate(node_ref: &NodeRef, write: &StagedWrite, current: Option<&Node>) -> Result<(), StoreError> {
        let actual = current.map(|node| node.version);
        if actual != write.base_version() {
            return Err(StoreError::concurrency_failure(
                node_ref.clone(),
                write.base_version(),
                actual,
            ));
        }

        if let StagedWrite::Put { node, .. } = write {
            if node.has_aspect(Aspect::EditingInGoogle) && !node.is_locked() {
                return Err(StoreError::constraint(
                    node_ref.clone(),
                    format!("{} requires the node to be locked", Aspect::EditingInGoogle),
                ));
            }
        }

        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn get_node(&self, tx: &Transaction, node_ref: &NodeRef) -> Result<Option<Node>, StoreError> {
        tx.ensure_active()?;
        Ok(self.view(tx, node_ref).0)
    }

    async fn save_node(&self, tx: &Transaction, mut node: Node) -> Result<(), StoreError> {
        tx.ensure_active()?;
        let node_ref = node.node_ref.clone();
        let (current, base_version) = self.view(tx, &node_ref);

        if let Some(current) = &current {
            if !current.can_write(tx.identity()) {
                return Err(StoreError::access_denied(node_ref, tx.identity().clone()));
            }
        }

        node.touch();
        tx.stage(node_ref, StagedWrite::Put { node, base_version });
        Ok(())
    }

    async fn delete_node(&self, tx: &Transaction, node_ref: &NodeRef) -> Result<DeleteResult, StoreError> {
        tx.ensure_active()?;
        let (current, base_version) = self.view(tx, node_ref);

        let Some(current) = current else {
            return Ok(DeleteResult::not_found());
        };

        if !current.can_write(tx.identity()) {
            return Err(StoreError::access_denied(node_ref.clone(), tx.identity().clone()));
        }

        if current.has_aspect(Aspect::EditingInGoogle) {
            return Err(StoreError::constraint(
                node_ref.clone(),
                format!("cannot delete a node carrying {}", Aspect::EditingInGoogle),
            ));
        }

        tx.stage(node_ref.clone(), StagedWrite::Delete { base_version });
        Ok(DeleteResult::existed())
    }

    #[instrument(skip(self, tx), fields(transaction_id = %tx.id()))]
    async fn commit(&self, tx: &Transaction) -> Result<(), StoreError> {
        tx.ensure_active()?;

        let mut events = Vec::new();
        {
            let mut nodes = self.write_nodes();
            let writes = tx.take_writes();

            for (node_ref, write) in &writes {
                if let Err(err) = Self::validate(node_ref, write, nodes.get(node_ref)) {
                    warn!("Commit rejected: {}", err);
                    return Err(err);
                }
            }

            for (node_ref, write) in writes {
                match write {
                    StagedWrite::Put { mut node, base_version } => {
                        node.version = base_version.map_or(1, |version| version + 1);
                        events.push(DomainEvent::NodeUpdated { node: node.clone() });
                        nodes.insert(node_ref, node);
                    }
                    StagedWrite::Delete { .. } => {
                        nodes.remove(&node_ref);
                        events.push(DomainEvent::NodeDeleted { node_ref });
                    }
                }
            }
        }

        tx.mark(TransactionStatus::Committed);
        debug!("Committed {} change(s)", events.len());

        for event in events {
            self.publish(event);
        }
        Ok(())
    }

    async fn rollback(&self, tx: &Transaction) {
        let discarded = tx.take_writes().len();
        tx.mark(TransactionStatus::RolledBack);
        debug!(
            transaction_id = %tx.id(),
            "Rolled back, discarded {} staged write(s)",
            discarded
        );
    }

    fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }
}

#[cfg(test)]
#[path = "memory_store_test.rs"]
mod memory_store_test;
