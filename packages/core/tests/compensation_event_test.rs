//! Rollback Compensation Event Tests
//!
//! Verifies the compensation lifecycle as seen on the domain-event channel:
//! the request transaction rolls back first, then exactly one compensation
//! outcome is published.

#[cfg(test)]
mod compensation_event_tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use drivelink_core::{
        Credential, DocumentError, DocumentService, DomainEvent, DriveFile, GoogleDocsService,
        Identity, InMemoryDrive, MemoryStore, Node, NodeRef, NodeStore, RemovalError,
        RemovalRequestHandler, Transaction, TransactionConfig, TransactionCoordinator,
    };
    use std::sync::Arc;
    use tokio::sync::broadcast;
    use tokio::time::{timeout, Duration};
    use tokio_test::{assert_err, assert_ok};

    const DOC_MIME: &str = "application/vnd.google-apps.document";

    fn node_ref(id: &str) -> NodeRef {
        NodeRef::spaces_store(id).unwrap()
    }

    /// Document service whose unlock always fails for the system identity
    struct StuckLocks {
        inner: GoogleDocsService,
    }

    #[async_trait]
    impl DocumentService for StuckLocks {
        async fn get_credential(&self) -> Result<Credential, DocumentError> {
            self.inner.get_credential().await
        }

        async fn get_drive_file(
            &self,
            tx: &Transaction,
            credential: &Credential,
            node_ref: &NodeRef,
        ) -> Result<DriveFile, DocumentError> {
            self.inner.get_drive_file(tx, credential, node_ref).await
        }

        async fn remove_content(
            &self,
            tx: &Transaction,
            credential: &Credential,
            node_ref: &NodeRef,
            file: &DriveFile,
            force: bool,
        ) -> Result<(), DocumentError> {
            self.inner
                .remove_content(tx, credential, node_ref, file, force)
                .await
        }

        async fn unlock_node(&self, tx: &Transaction, node_ref: &NodeRef) -> Result<(), DocumentError> {
            if tx.identity().is_system() {
                return Err(DocumentError::service(Some(503), "lock service unavailable"));
            }
            self.inner.unlock_node(tx, node_ref).await
        }

        async fn un_decorate_node(&self, tx: &Transaction, node_ref: &NodeRef) -> Result<(), DocumentError> {
            self.inner.un_decorate_node(tx, node_ref).await
        }
    }

    /// Helper to wire a handler over `documents`
    fn create_handler(store: Arc<MemoryStore>, documents: Arc<dyn DocumentService>) -> RemovalRequestHandler {
        let coordinator = TransactionCoordinator::new(store, TransactionConfig::default());
        RemovalRequestHandler::new(documents, coordinator)
    }

    fn restricted_node(id: &str) -> (Node, DriveFile) {
        (
            Node::checked_out(node_ref(id), format!("{}.docx", id), "alice", format!("drive-{}", id))
                .with_writers(["alice"]),
            DriveFile::new(format!("drive-{}", id), id, DOC_MIME),
        )
    }

    /// Collect events until the channel stays quiet
    async fn drain(rx: &mut broadcast::Receiver<DomainEvent>) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        while let Ok(Ok(event)) = timeout(Duration::from_millis(200), rx.recv()).await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_compensation_completes_after_rollback() -> Result<()> {
        let (node, file) = restricted_node("a");
        let store = Arc::new(MemoryStore::with_nodes([node]));
        let drive = Arc::new(InMemoryDrive::with_files([file]));
        let documents = Arc::new(GoogleDocsService::new(drive, store.clone()));
        let handler = create_handler(store.clone(), documents);
        let mut rx = store.subscribe_to_events();

        let err = assert_err!(
            handler
                .handle(Identity::user("bob"), r#"{"nodeRef":"workspace://SpacesStore/a"}"#)
                .await
        );
        assert!(matches!(err, RemovalError::Forbidden(_)));

        handler.coordinator().wait_for_compensations().await;
        let events = drain(&mut rx).await;

        let event_types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            event_types,
            vec!["transaction:rolledBack", "node:updated", "compensation:completed"]
        );

        match &events[2] {
            DomainEvent::CompensationCompleted { node_ref: released, deleted } => {
                assert_eq!(released, &node_ref("a"));
                assert!(!deleted);
            }
            other => panic!("Expected CompensationCompleted, got {:?}", other),
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_compensation_is_published_not_raised() -> Result<()> {
        let (node, file) = restricted_node("b");
        let store = Arc::new(MemoryStore::with_nodes([node]));
        let drive = Arc::new(InMemoryDrive::with_files([file]));
        let documents = Arc::new(StuckLocks {
            inner: GoogleDocsService::new(drive, store.clone()),
        });
        let handler = create_handler(store.clone(), documents);
        let mut rx = store.subscribe_to_events();

        let err = assert_err!(
            handler
                .handle(Identity::user("bob"), r#"{"nodeRef":"workspace://SpacesStore/b"}"#)
                .await
        );
        assert_eq!(err.status_code(), 403);

        handler.coordinator().wait_for_compensations().await;
        let events = drain(&mut rx).await;

        let failure = events.iter().find_map(|event| match event {
            DomainEvent::CompensationFailed { node_ref, reason } => Some((node_ref, reason)),
            _ => None,
        });
        let (failed_ref, reason) = failure.expect("CompensationFailed should be published");
        assert_eq!(failed_ref, &node_ref("b"));
        assert!(reason.contains("lock service unavailable"));

        // Node remains as the rollback left it
        let node = store.committed_node(&node_ref("b")).expect("node kept");
        assert!(node.is_locked());

        Ok(())
    }

    #[tokio::test]
    async fn test_successful_removal_runs_no_compensation() -> Result<()> {
        let (node, file) = restricted_node("c");
        let store = Arc::new(MemoryStore::with_nodes([node]));
        let drive = Arc::new(InMemoryDrive::with_files([file]));
        let documents = Arc::new(GoogleDocsService::new(drive, store.clone()));
        let handler = create_handler(store.clone(), documents);
        let mut rx = store.subscribe_to_events();

        let result = assert_ok!(
            handler
                .handle(Identity::user("alice"), r#"{"nodeRef":"workspace://SpacesStore/c"}"#)
                .await
        );
        assert!(result.success);

        handler.coordinator().wait_for_compensations().await;
        assert_eq!(handler.coordinator().pending_compensations(), 0);

        let events = drain(&mut rx).await;
        assert!(events
            .iter()
            .all(|event| matches!(event, DomainEvent::NodeUpdated { .. })));
        assert_eq!(events.len(), 1);

        Ok(())
    }
}
