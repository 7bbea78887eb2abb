//! Tests for TransactionCoordinator commit, rollback, listeners and retries

use super::*;
use crate::db::MemoryStore;
use crate::models::{Node, NodeRef};
use crate::transaction::RollbackListener;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};

fn node_ref(id: &str) -> NodeRef {
    NodeRef::spaces_store(id).unwrap()
}

fn coordinator_with(nodes: Vec<Node>) -> (Arc<MemoryStore>, TransactionCoordinator) {
    let store = Arc::new(MemoryStore::with_nodes(nodes));
    let config = TransactionConfig {
        max_retries: 2,
        retry_backoff_ms: 1,
    };
    let coordinator = TransactionCoordinator::new(store.clone(), config);
    (store, coordinator)
}

/// Records how often it ran and whether the store had already discarded the failed write
struct RecordingListener {
    runs: Arc<AtomicU32>,
    store: Arc<MemoryStore>,
    saw_original_name: Arc<AtomicU32>,
}

#[async_trait]
impl RollbackListener for RecordingListener {
    fn name(&self) -> &str {
        "recording"
    }

    async fn after_rollback(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(node) = self.store.committed_node(&node_ref("a")) {
            if node.name == "a" {
                self.saw_original_name.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

async fn rename(store: &MemoryStore, tx: &Transaction, name: &str) -> Result<(), StoreError> {
    let mut node = store
        .get_node(tx, &node_ref("a"))
        .await?
        .expect("seeded node");
    node.name = name.to_string();
    store.save_node(tx, node).await
}

#[tokio::test]
async fn test_successful_work_commits() {
    let (store, coordinator) = coordinator_with(vec![Node::new(node_ref("a"), "a")]);

    let value: Result<u8, StoreError> = coordinator
        .run_in_new_transaction(Identity::user("alice"), |tx| {
            let store = store.clone();
            async move {
                rename(&store, &tx, "renamed").await?;
                Ok(7)
            }
        })
        .await;

    assert_eq!(value.unwrap(), 7);
    assert_eq!(store.committed_node(&node_ref("a")).unwrap().name, "renamed");
}

#[tokio::test]
async fn test_failed_work_rolls_back_and_runs_listener_once() {
    let (store, coordinator) = coordinator_with(vec![Node::new(node_ref("a"), "a")]);
    let runs = Arc::new(AtomicU32::new(0));
    let saw_original_name = Arc::new(AtomicU32::new(0));

    let result: Result<(), StoreError> = coordinator
        .run_in_new_transaction(Identity::user("alice"), |tx| {
            let store = store.clone();
            let listener = RecordingListener {
                runs: runs.clone(),
                store: store.clone(),
                saw_original_name: saw_original_name.clone(),
            };
            async move {
                rename(&store, &tx, "half-done").await?;
                tx.bind_rollback_listener(Box::new(listener))?;
                Err(StoreError::constraint(node_ref("a"), "boom"))
            }
        })
        .await;

    assert!(matches!(result, Err(StoreError::Constraint { .. })));
    coordinator.wait_for_compensations().await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(saw_original_name.load(Ordering::SeqCst), 1);
    assert_eq!(store.committed_node(&node_ref("a")).unwrap().name, "a");
    assert_eq!(coordinator.pending_compensations(), 0);
}

#[tokio::test]
async fn test_listener_is_discarded_on_commit() {
    let (store, coordinator) = coordinator_with(vec![Node::new(node_ref("a"), "a")]);
    let runs = Arc::new(AtomicU32::new(0));

    let result: Result<(), StoreError> = coordinator
        .run_in_new_transaction(Identity::user("alice"), |tx| {
            let listener = RecordingListener {
                runs: runs.clone(),
                store: store.clone(),
                saw_original_name: Arc::new(AtomicU32::new(0)),
            };
            async move {
                tx.bind_rollback_listener(Box::new(listener))?;
                Ok(())
            }
        })
        .await;

    assert!(result.is_ok());
    coordinator.wait_for_compensations().await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_commit_conflict_is_retried() {
    let (store, coordinator) = coordinator_with(vec![Node::new(node_ref("a"), "a")]);
    let attempts = Arc::new(AtomicU32::new(0));

    let result: Result<(), StoreError> = coordinator
        .run_in_new_transaction(Identity::user("alice"), |tx| {
            let store = store.clone();
            let attempts = attempts.clone();
            async move {
                rename(&store, &tx, "mine").await?;

                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    // Another writer commits between our read and our commit
                    let other = Transaction::new(Identity::System);
                    rename(&store, &other, "theirs").await?;
                    store.commit(&other).await?;
                }
                Ok(())
            }
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    let node = store.committed_node(&node_ref("a")).unwrap();
    assert_eq!(node.name, "mine");
    assert_eq!(node.version, 3);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let (store, coordinator) = coordinator_with(vec![Node::new(node_ref("a"), "a")]);
    let attempts = Arc::new(AtomicU32::new(0));

    let result: Result<(), StoreError> = coordinator
        .run_in_new_transaction(Identity::user("alice"), |tx| {
            let store = store.clone();
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                rename(&store, &tx, "mine").await?;

                let other = Transaction::new(Identity::System);
                rename(&store, &other, "theirs").await?;
                store.commit(&other).await?;
                Ok(())
            }
        })
        .await;

    assert!(matches!(result, Err(StoreError::ConcurrencyFailure { .. })));
    // First attempt plus max_retries
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_run_once_does_not_retry_conflicts() {
    let (store, coordinator) = coordinator_with(vec![Node::new(node_ref("a"), "a")]);
    let attempts = Arc::new(AtomicU32::new(0));

    let result: Result<(), StoreError> = coordinator
        .run_once(Identity::user("alice"), |tx| {
            let store = store.clone();
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                rename(&store, &tx, "mine").await?;

                let other = Transaction::new(Identity::System);
                rename(&store, &other, "theirs").await?;
                store.commit(&other).await?;
                Ok(())
            }
        })
        .await;

    assert!(matches!(result, Err(StoreError::ConcurrencyFailure { .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(store.committed_node(&node_ref("a")).unwrap().name, "theirs");
}

#[tokio::test]
async fn test_run_as_system_bypasses_permissions() {
    let restricted = Node::new(node_ref("a"), "a").with_writers(["alice"]);
    let (store, coordinator) = coordinator_with(vec![restricted]);

    let denied: Result<(), StoreError> = coordinator
        .run_in_new_transaction(Identity::user("bob"), |tx| {
            let store = store.clone();
            async move { rename(&store, &tx, "bob-was-here").await }
        })
        .await;
    assert!(matches!(denied, Err(StoreError::AccessDenied { .. })));

    let authority = coordinator.system_authority();
    let allowed: Result<(), StoreError> = coordinator
        .run_as_system(&authority, |tx| {
            let store = store.clone();
            async move {
                assert!(tx.identity().is_system());
                rename(&store, &tx, "system").await
            }
        })
        .await;
    assert!(allowed.is_ok());
    assert_eq!(store.committed_node(&node_ref("a")).unwrap().name, "system");
}
