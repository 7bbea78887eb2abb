//! Google Docs Document Service
//!
//! Operations that move a node between the repository and its Google Docs
//! editing session. [`GoogleDocsService`] implements them over a
//! [`DriveClient`] and a [`NodeStore`].
//!
//! # Removal
//!
//! `remove_content` deletes the Drive copy and releases the node (unlock,
//! remove the `gd2:editingInGoogle` aspect). Without `force` it refuses while
//! other users still have the document open in Google Docs.

use crate::db::NodeStore;
use crate::models::{Aspect, Identity, Node, NodeRef};
use crate::services::drive::{Credential, DriveClient, DriveFile};
use crate::services::error::DocumentError;
use crate::transaction::Transaction;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Status carried when other editors block a removal
pub const STATUS_CONCURRENT_EDITORS: u16 = 409;

/// Document service operations used by the remove-content endpoint
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Drive credential for the current user
    async fn get_credential(&self) -> Result<Credential, DocumentError>;

    /// Metadata of the Drive file a node is being edited through
    async fn get_drive_file(
        &self,
        tx: &Transaction,
        credential: &Credential,
        node_ref: &NodeRef,
    ) -> Result<DriveFile, DocumentError>;

    /// Delete the Drive copy and release the node
    async fn remove_content(
        &self,
        tx: &Transaction,
        credential: &Credential,
        node_ref: &NodeRef,
        file: &DriveFile,
        force: bool,
    ) -> Result<(), DocumentError>;

    /// Release the editing lock; no-op if the node is absent or unlocked
    async fn unlock_node(&self, tx: &Transaction, node_ref: &NodeRef) -> Result<(), DocumentError>;

    /// Remove the editing aspect and Drive link; no-op if already gone
    async fn un_decorate_node(&self, tx: &Transaction, node_ref: &NodeRef) -> Result<(), DocumentError>;
}

/// [`DocumentService`] backed by a Drive client and the node store
pub struct GoogleDocsService {
    drive: Arc<dyn DriveClient>,
    store: Arc<dyn NodeStore>,
}

impl GoogleDocsService {
    pub fn new(drive: Arc<dyn DriveClient>, store: Arc<dyn NodeStore>) -> Self {
        Self { drive, store }
    }

    async fn require_node(&self, tx: &Transaction, node_ref: &NodeRef) -> Result<Node, DocumentError> {
        self.store
            .get_node(tx, node_ref)
            .await?
            .ok_or_else(|| DocumentError::service(Some(404), format!("Node not found: {}", node_ref)))
    }
}

#[async_trait]
impl DocumentService for GoogleDocsService {
    async fn get_credential(&self) -> Result<Credential, DocumentError> {
        Ok(self.drive.credential().await?)
    }

    #[instrument(skip(self, tx, credential), fields(node_ref = %node_ref))]
    async fn get_drive_file(
        &self,
        tx: &Transaction,
        credential: &Credential,
        node_ref: &NodeRef,
    ) -> Result<DriveFile, DocumentError> {
        let node = self.require_node(tx, node_ref).await?;
        let resource_id = node.drive_resource_id.ok_or_else(|| {
            DocumentError::service(
                None,
                format!("Node {} is not linked to a Google Drive file", node_ref),
            )
        })?;

        Ok(self.drive.file_metadata(credential, &resource_id).await?)
    }

    #[instrument(skip(self, tx, credential, file), fields(node_ref = %node_ref, file_id = %file.id))]
    async fn remove_content(
        &self,
        tx: &Transaction,
        credential: &Credential,
        node_ref: &NodeRef,
        file: &DriveFile,
        force: bool,
    ) -> Result<(), DocumentError> {
        if !force {
            let user = match tx.identity() {
                Identity::User(name) => name.as_str(),
                Identity::System => "",
            };
            let others: Vec<&String> = file.other_editors(user).collect();
            if !others.is_empty() {
                return Err(DocumentError::service(
                    Some(STATUS_CONCURRENT_EDITORS),
                    format!(
                        "Node {} has {} concurrent editor(s) in Google Docs",
                        node_ref,
                        others.len()
                    ),
                ));
            }
        } else {
            debug!("Forced removal, skipping concurrent editor check");
        }

        self.drive.delete_file(credential, &file.id).await?;
        info!("Deleted Drive file {}", file.id);

        self.unlock_node(tx, node_ref).await?;
        self.un_decorate_node(tx, node_ref).await?;
        Ok(())
    }

    async fn unlock_node(&self, tx: &Transaction, node_ref: &NodeRef) -> Result<(), DocumentError> {
        let Some(mut node) = self.store.get_node(tx, node_ref).await? else {
            debug!(node_ref = %node_ref, "Unlock skipped, node absent");
            return Ok(());
        };

        if node.lock.take().is_none() {
            debug!(node_ref = %node_ref, "Unlock skipped, node not locked");
            return Ok(());
        }

        self.store.save_node(tx, node).await?;
        debug!(node_ref = %node_ref, "Node unlocked");
        Ok(())
    }

    async fn un_decorate_node(&self, tx: &Transaction, node_ref: &NodeRef) -> Result<(), DocumentError> {
        let Some(mut node) = self.store.get_node(tx, node_ref).await? else {
            debug!(node_ref = %node_ref, "Un-decorate skipped, node absent");
            return Ok(());
        };

        if !node.aspects.remove(&Aspect::EditingInGoogle) {
            debug!(node_ref = %node_ref, "Un-decorate skipped, aspect absent");
            return Ok(());
        }
        node.drive_resource_id = None;

        self.store.save_node(tx, node).await?;
        debug!(node_ref = %node_ref, "Removed {}", Aspect::EditingInGoogle);
        Ok(())
    }
}

#[cfg(test)]
#[path = "document_service_test.rs"]
mod document_service_test;
