//! Remove-content request handling
//!
//! [`RemovalRequestHandler::handle`] parses a raw JSON body, checks that the
//! node is checked out to Google Docs, and removes the Drive copy inside a new
//! transaction running as the caller.
//!
//! # Failure classification
//!
//! | Document service failure | Response |
//! |---|---|
//! | authentication / refresh token | `UpstreamUnavailable` (502) |
//! | service error with status | that status |
//! | service error without status | `ServiceFailure` (500) |
//! | constraint | `IntegrityViolation` (409) |
//! | access denied | `Forbidden` (403) + rollback compensation |
//! | anything else | `InternalError` (500) |
//!
//! Nodes without the editing aspect are left alone and reported as
//! `{"success": false}`.

use crate::models::{Aspect, Identity, NodeRef, RemovalRequest, RemovalResult};
use crate::services::compensation::RollbackCompensation;
use crate::services::document_service::DocumentService;
use crate::services::error::{DocumentError, RemovalError};
use crate::transaction::{Transaction, TransactionCoordinator};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

const JSON_KEY_NODE_REF: &str = "nodeRef";
const JSON_KEY_FORCE: &str = "force";

/// Parse a remove-content request body
///
/// Checks run in order and stop at the first failure:
/// empty body, invalid JSON, missing `nodeRef`, malformed `nodeRef`, invalid `force`.
pub fn parse_request(raw: &str) -> Result<RemovalRequest, RemovalError> {
    if raw.trim().is_empty() {
        return Err(RemovalError::invalid_request("No content sent with request."));
    }
    debug!("Parsed JSON: {}", raw);

    let unparseable = || RemovalError::invalid_request(format!("Unable to parse JSON: {}", raw));

    let json: Value = serde_json::from_str(raw).map_err(|_| unparseable())?;
    let object = json.as_object().ok_or_else(unparseable)?;

    let node_ref = match object.get(JSON_KEY_NODE_REF) {
        None => {
            return Err(RemovalError::invalid_request(format!(
                "Key {} is missing from JSON: {}",
                JSON_KEY_NODE_REF, raw
            )))
        }
        Some(Value::String(value)) => value.parse::<NodeRef>().map_err(|_| {
            RemovalError::invalid_request(format!("Unable to parse JSON '{}'.", raw))
        })?,
        Some(_) => return Err(unparseable()),
    };

    let force = match object.get(JSON_KEY_FORCE) {
        None => false,
        Some(value) => coerce_bool(value).ok_or_else(unparseable)?,
    };

    Ok(RemovalRequest::new(node_ref, force))
}

/// Booleans, or the strings "true"/"false" in any case
fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) if text.eq_ignore_ascii_case("true") => Some(true),
        Value::String(text) if text.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

pub struct RemovalRequestHandler {
    documents: Arc<dyn DocumentService>,
    coordinator: TransactionCoordinator,
}

impl RemovalRequestHandler {
    pub fn new(documents: Arc<dyn DocumentService>, coordinator: TransactionCoordinator) -> Self {
        Self {
            documents,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &TransactionCoordinator {
        &self.coordinator
    }

    /// Handle a raw request body on behalf of `identity`
    #[instrument(skip(self, identity, raw_body), fields(identity = %identity))]
    pub async fn handle(&self, identity: Identity, raw_body: &str) -> Result<RemovalResult, RemovalError> {
        let request = parse_request(raw_body)?;
        self.handle_request(identity, request).await
    }

    /// Handle an already parsed request in a new transaction
    ///
    /// The Drive delete cannot be undone, so a commit conflict is terminal
    /// rather than retried.
    #[instrument(skip(self, identity, request), fields(identity = %identity, node_ref = %request.node_ref, force = request.force))]
    pub async fn handle_request(
        &self,
        identity: Identity,
        request: RemovalRequest,
    ) -> Result<RemovalResult, RemovalError> {
        self.coordinator
            .run_once(identity, |tx| {
                let request = request.clone();
                async move { self.remove_in(&tx, &request).await }
            })
            .await
    }

    async fn remove_in(
        &self,
        tx: &Arc<Transaction>,
        request: &RemovalRequest,
    ) -> Result<RemovalResult, RemovalError> {
        let node_ref = &request.node_ref;

        // Only nodes checked out to Google Docs have anything to remove
        let checked_out = self
            .coordinator
            .store()
            .has_aspect(tx, node_ref, Aspect::EditingInGoogle)
            .await?;
        if !checked_out {
            info!("Node {} is not being edited in Google Docs, nothing to remove", node_ref);
            return Ok(RemovalResult::skipped());
        }

        match self.remove_content(tx, request).await {
            Ok(()) => {
                info!("Removed Google Docs content for {}", node_ref);
                Ok(RemovalResult::removed())
            }
            Err(err) => Err(self.classify(tx, node_ref, err)),
        }
    }

    async fn remove_content(&self, tx: &Transaction, request: &RemovalRequest) -> Result<(), DocumentError> {
        let credential = self.documents.get_credential().await?;
        let file = self
            .documents
            .get_drive_file(tx, &credential, &request.node_ref)
            .await?;
        self.documents
            .remove_content(tx, &credential, &request.node_ref, &file, request.force)
            .await
    }

    fn classify(&self, tx: &Transaction, node_ref: &NodeRef, err: DocumentError) -> RemovalError {
        match err {
            DocumentError::Authentication(message) | DocumentError::RefreshToken(message) => {
                warn!("Google authentication failed: {}", message);
                RemovalError::UpstreamUnavailable(message)
            }
            DocumentError::Service { status, message } => {
                warn!(?status, "Google Docs service error: {}", message);
                RemovalError::ServiceFailure { status, message }
            }
            DocumentError::Constraint(message) => RemovalError::IntegrityViolation(message),
            DocumentError::AccessDenied(message) => {
                self.register_compensation(tx, node_ref);
                RemovalError::Forbidden(message)
            }
            DocumentError::Other(source) => {
                error!("Unexpected failure removing {}: {:#}", node_ref, source);
                RemovalError::InternalError(source.to_string())
            }
        }
    }

    fn register_compensation(&self, tx: &Transaction, node_ref: &NodeRef) {
        let compensation = RollbackCompensation::new(
            node_ref.clone(),
            self.documents.clone(),
            self.coordinator.clone(),
            self.coordinator.system_authority(),
        );

        if let Err(err) = tx.bind_rollback_listener(Box::new(compensation)) {
            error!("Could not register rollback compensation for {}: {}", node_ref, err);
        }
    }
}

#[cfg(test)]
#[path = "removal_handler_test.rs"]
mod removal_handler_test;
