//! Transaction context
//!
//! A [`Transaction`] carries the identity a unit of work runs as, the writes it
//! has staged against the store, and the listeners to notify if it rolls back.

use crate::db::StoreError;
use crate::models::{Identity, Node, NodeRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Callback notified after a transaction has rolled back
///
/// Listeners run on a separate task once the rollback has been fully applied,
/// so reads inside `after_rollback` see the state from before the failed work.
/// Each bound listener is invoked at most once and never after a commit.
#[async_trait]
pub trait RollbackListener: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &str;

    async fn after_rollback(&self);
}

/// Lifecycle of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Active,
    Committed,
    RolledBack,
}

/// A write staged by a transaction, applied on commit
#[derive(Debug, Clone)]
pub(crate) enum StagedWrite {
    Put {
        node: Node,
        /// Committed version the write was based on (`None` for new nodes)
        base_version: Option<i64>,
    },
    Delete {
        base_version: Option<i64>,
    },
}

impl StagedWrite {
    pub(crate) fn base_version(&self) -> Option<i64> {
        match self {
            StagedWrite::Put { base_version, .. } | StagedWrite::Delete { base_version } => {
                *base_version
            }
        }
    }
}

/// Unit of work against the store
pub struct Transaction {
    id: Uuid,
    identity: Identity,
    started_at: DateTime<Utc>,
    status: Mutex<TransactionStatus>,
    writes: Mutex<BTreeMap<NodeRef, StagedWrite>>,
    listeners: Mutex<Vec<Box<dyn RollbackListener>>>,
}

impl Transaction {
    pub fn new(identity: Identity) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            started_at: Utc::now(),
            status: Mutex::new(TransactionStatus::Active),
            writes: Mutex::new(BTreeMap::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn status(&self) -> TransactionStatus {
        *lock(&self.status)
    }

    pub fn is_active(&self) -> bool {
        self.status() == TransactionStatus::Active
    }

    /// Fail with `TransactionClosed` unless the transaction is still active
    pub fn ensure_active(&self) -> Result<(), StoreError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(StoreError::transaction_closed(self.id))
        }
    }

    /// Register a listener to run after this transaction rolls back
    ///
    /// The listener is discarded without running if the transaction commits.
    pub fn bind_rollback_listener(
        &self,
        listener: Box<dyn RollbackListener>,
    ) -> Result<(), StoreError> {
        self.ensure_active()?;
        tracing::debug!(
            transaction_id = %self.id,
            listener = listener.name(),
            "Bound rollback listener"
        );
        lock(&self.listeners).push(listener);
        Ok(())
    }

    /// Number of listeners currently bound
    pub fn rollback_listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    pub(crate) fn take_rollback_listeners(&self) -> Vec<Box<dyn RollbackListener>> {
        std::mem::take(&mut *lock(&self.listeners))
    }

    pub(crate) fn staged(&self, node_ref: &NodeRef) -> Option<StagedWrite> {
        lock(&self.writes).get(node_ref).cloned()
    }

    pub(crate) fn stage(&self, node_ref: NodeRef, write: StagedWrite) {
        lock(&self.writes).insert(node_ref, write);
    }

    pub(crate) fn take_writes(&self) -> BTreeMap<NodeRef, StagedWrite> {
        std::mem::take(&mut *lock(&self.writes))
    }

    #[cfg(test)]
    pub(crate) fn has_writes(&self) -> bool {
        !lock(&self.writes).is_empty()
    }

    pub(crate) fn mark(&self, status: TransactionStatus) {
        *lock(&self.status) = status;
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("status", &self.status())
            .field("listeners", &self.rollback_listener_count())
            .finish()
    }
}

/// Poisoning only happens if a holder panicked; the guarded data stays usable
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
