//! Transaction Coordinator
//!
//! Runs units of work in fresh transactions against a [`NodeStore`]:
//!
//! - commits when the work succeeds, rolls back when it fails
//! - retries the whole unit of work when commit hits a concurrency failure,
//!   except under [`TransactionCoordinator::run_once`]
//! - after any rollback, takes the transaction's rollback listeners (exactly
//!   once) and runs them on a spawned task
//!
//! Spawned listener tasks are tracked so shutdown and tests can wait for them
//! with [`TransactionCoordinator::wait_for_compensations`].

use crate::config::TransactionConfig;
use crate::db::{DomainEvent, NodeStore, StoreError};
use crate::models::{Identity, SystemAuthority};
use crate::transaction::{Transaction, TransactionStatus};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct TransactionCoordinator {
    store: Arc<dyn NodeStore>,
    config: TransactionConfig,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl TransactionCoordinator {
    pub fn new(store: Arc<dyn NodeStore>, config: TransactionConfig) -> Self {
        Self {
            store,
            config,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Capability to run work as the system identity
    pub(crate) fn system_authority(&self) -> SystemAuthority {
        SystemAuthority::new()
    }

    /// Run `work` in a new transaction as `identity`
    ///
    /// The transaction commits if `work` returns `Ok` and rolls back otherwise.
    /// A commit that fails with a retryable [`StoreError`] rolls back and runs
    /// `work` again in another new transaction, up to `max_retries` times.
    pub async fn run_in_new_transaction<T, E, F, Fut>(
        &self,
        identity: Identity,
        work: F,
    ) -> Result<T, E>
    where
        F: FnMut(Arc<Transaction>) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<StoreError> + Send,
    {
        self.run_attempts(identity, self.config.max_retries, work)
            .await
    }

    /// Run `work` in a single new transaction as `identity`
    ///
    /// Like [`run_in_new_transaction`](Self::run_in_new_transaction) but a
    /// commit conflict is returned instead of retried. For work with side
    /// effects outside the store that must not be replayed.
    pub async fn run_once<T, E, F, Fut>(&self, identity: Identity, work: F) -> Result<T, E>
    where
        F: FnMut(Arc<Transaction>) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<StoreError> + Send,
    {
        self.run_attempts(identity, 0, work).await
    }

    async fn run_attempts<T, E, F, Fut>(
        &self,
        identity: Identity,
        max_retries: u32,
        mut work: F,
    ) -> Result<T, E>
    where
        F: FnMut(Arc<Transaction>) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<StoreError> + Send,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let tx = Arc::new(Transaction::new(identity.clone()));
            debug!(
                transaction_id = %tx.id(),
                identity = %identity,
                attempt,
                "Transaction started"
            );

            let value = match work(tx.clone()).await {
                Ok(value) => value,
                Err(err) => {
                    self.roll_back(&tx).await;
                    return Err(err);
                }
            };

            match self.store.commit(&tx).await {
                Ok(()) => {
                    self.discard_listeners(&tx);
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt <= max_retries => {
                    warn!(
                        transaction_id = %tx.id(),
                        attempt,
                        "Commit failed, retrying: {}",
                        err
                    );
                    self.roll_back(&tx).await;
                    tokio::time::sleep(self.config.retry_backoff() * attempt).await;
                }
                Err(err) => {
                    self.roll_back(&tx).await;
                    return Err(err.into());
                }
            }
        }
    }

    /// Run `work` in a new transaction as the system identity
    pub async fn run_as_system<T, E, F, Fut>(
        &self,
        authority: &SystemAuthority,
        work: F,
    ) -> Result<T, E>
    where
        F: FnMut(Arc<Transaction>) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<StoreError> + Send,
    {
        self.run_in_new_transaction(authority.identity(), work).await
    }

    /// Wait for every spawned rollback listener task to finish
    ///
    /// Listeners may roll back transactions of their own; this keeps waiting
    /// until no tracked tasks remain.
    pub async fn wait_for_compensations(&self) {
        loop {
            let handles = std::mem::take(&mut *self.lock_pending());
            if handles.is_empty() {
                return;
            }

            for result in futures::future::join_all(handles).await {
                if let Err(err) = result {
                    error!("Rollback listener task failed: {}", err);
                }
            }
        }
    }

    /// Number of listener tasks that have not finished yet
    pub fn pending_compensations(&self) -> usize {
        let mut pending = self.lock_pending();
        pending.retain(|handle| !handle.is_finished());
        pending.len()
    }

    async fn roll_back(&self, tx: &Arc<Transaction>) {
        self.store.rollback(tx).await;
        if tx.status() != TransactionStatus::RolledBack {
            tx.mark(TransactionStatus::RolledBack);
        }
        self.store.publish(DomainEvent::TransactionRolledBack {
            transaction_id: tx.id(),
        });

        let listeners = tx.take_rollback_listeners();
        if listeners.is_empty() {
            return;
        }

        info!(
            transaction_id = %tx.id(),
            "Transaction rolled back, running {} rollback listener(s)",
            listeners.len()
        );

        let transaction_id = tx.id();
        let handle = tokio::spawn(async move {
            for listener in listeners {
                debug!(
                    transaction_id = %transaction_id,
                    listener = listener.name(),
                    "Running rollback listener"
                );
                listener.after_rollback().await;
            }
        });

        let mut pending = self.lock_pending();
        pending.retain(|handle| !handle.is_finished());
        pending.push(handle);
    }

    fn discard_listeners(&self, tx: &Transaction) {
        let discarded = tx.take_rollback_listeners();
        if !discarded.is_empty() {
            debug!(
                transaction_id = %tx.id(),
                "Transaction committed, discarding {} rollback listener(s)",
                discarded.len()
            );
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod coordinator_test;
