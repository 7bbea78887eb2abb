//! Rollback compensation for failed removals
//!
//! When releasing a node is denied, the Drive copy may already be gone while
//! the repository rollback restores the node as "being edited". The
//! compensation bound to that rollback releases the node afterwards, as the
//! system identity, in a transaction of its own:
//!
//! 1. unlock the node
//! 2. remove the `gd2:editingInGoogle` aspect
//! 3. delete the node if it carries `sys:temporary`
//!
//! Each step is a no-op when its state is already absent. Failures are logged
//! and published as `CompensationFailed`; they never reach the failed request.

use crate::db::DomainEvent;
use crate::models::{Aspect, NodeRef, SystemAuthority};
use crate::services::document_service::DocumentService;
use crate::services::error::DocumentError;
use crate::transaction::{RollbackListener, TransactionCoordinator};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

/// What a compensation run did to the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationOutcome {
    /// Node unlocked and un-decorated, still present
    Released,

    /// Temporary node deleted
    Deleted,
}

pub struct RollbackCompensation {
    node_ref: NodeRef,
    documents: Arc<dyn DocumentService>,
    coordinator: TransactionCoordinator,
    authority: SystemAuthority,
}

impl RollbackCompensation {
    pub fn new(
        node_ref: NodeRef,
        documents: Arc<dyn DocumentService>,
        coordinator: TransactionCoordinator,
        authority: SystemAuthority,
    ) -> Self {
        Self {
            node_ref,
            documents,
            coordinator,
            authority,
        }
    }

    pub fn node_ref(&self) -> &NodeRef {
        &self.node_ref
    }

    /// Release the node in a new system transaction
    pub async fn run(&self) -> Result<CompensationOutcome, DocumentError> {
        let store = self.coordinator.store().clone();

        self.coordinator
            .run_as_system(&self.authority, |tx| {
                let documents = self.documents.clone();
                let store = store.clone();
                let node_ref = self.node_ref.clone();
                async move {
                    documents.unlock_node(&tx, &node_ref).await?;
                    documents.un_decorate_node(&tx, &node_ref).await?;

                    if store.has_aspect(&tx, &node_ref, Aspect::Temporary).await? {
                        store.delete_node(&tx, &node_ref).await?;
                        Ok(CompensationOutcome::Deleted)
                    } else {
                        Ok(CompensationOutcome::Released)
                    }
                }
            })
            .await
    }
}

#[async_trait]
impl RollbackListener for RollbackCompensation {
    fn name(&self) -> &str {
        "google-docs-removal-compensation"
    }

    async fn after_rollback(&self) {
        debug!(node_ref = %self.node_ref, "Compensating rolled back removal");
        let store = self.coordinator.store();

        match self.run().await {
            Ok(outcome) => {
                info!(node_ref = %self.node_ref, ?outcome, "Rollback compensation completed");
                store.publish(DomainEvent::CompensationCompleted {
                    node_ref: self.node_ref.clone(),
                    deleted: outcome == CompensationOutcome::Deleted,
                });
            }
            Err(err) => {
                error!(node_ref = %self.node_ref, "Rollback compensation failed: {}", err);
                store.publish(DomainEvent::CompensationFailed {
                    node_ref: self.node_ref.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "compensation_test.rs"]
mod compensation_test;
