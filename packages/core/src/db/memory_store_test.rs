//! Tests for MemoryStore staging, commit validation and event publication

use super::*;
use crate::models::Identity;
use tokio::time::{timeout, Duration};

fn node_ref(id: &str) -> NodeRef {
    NodeRef::spaces_store(id).unwrap()
}

fn checked_out(id: &str) -> Node {
    Node::checked_out(node_ref(id), format!("{}.docx", id), "alice", format!("file-{}", id))
}

#[tokio::test]
async fn test_staged_writes_are_private_until_commit() {
    let store = MemoryStore::with_nodes([checked_out("a")]);
    let tx = Transaction::new(Identity::user("alice"));

    let mut node = store.get_node(&tx, &node_ref("a")).await.unwrap().unwrap();
    node.name = "renamed.docx".to_string();
    store.save_node(&tx, node).await.unwrap();

    // Visible inside the transaction only
    let inside = store.get_node(&tx, &node_ref("a")).await.unwrap().unwrap();
    assert_eq!(inside.name, "renamed.docx");
    assert_eq!(store.committed_node(&node_ref("a")).unwrap().name, "a.docx");

    store.commit(&tx).await.unwrap();

    let committed = store.committed_node(&node_ref("a")).unwrap();
    assert_eq!(committed.name, "renamed.docx");
    assert_eq!(committed.version, 2);
    assert_eq!(tx.status(), TransactionStatus::Committed);
}

#[tokio::test]
async fn test_rollback_discards_staged_writes() {
    let store = MemoryStore::with_nodes([checked_out("a")]);
    let tx = Transaction::new(Identity::user("alice"));

    let mut node = store.get_node(&tx, &node_ref("a")).await.unwrap().unwrap();
    node.lock = None;
    node.aspects.clear();
    store.save_node(&tx, node).await.unwrap();
    store.rollback(&tx).await;

    let committed = store.committed_node(&node_ref("a")).unwrap();
    assert!(committed.is_locked());
    assert!(committed.has_aspect(Aspect::EditingInGoogle));
    assert_eq!(tx.status(), TransactionStatus::RolledBack);

    // Closed transactions reject further work
    assert!(matches!(
        store.get_node(&tx, &node_ref("a")).await,
        Err(StoreError::TransactionClosed { .. })
    ));
}

#[tokio::test]
async fn test_write_without_permission_is_denied() {
    let store = MemoryStore::with_nodes([checked_out("a").with_writers(["alice"])]);

    let tx = Transaction::new(Identity::user("bob"));
    let node = store.get_node(&tx, &node_ref("a")).await.unwrap().unwrap();
    let err = store.save_node(&tx, node).await.unwrap_err();
    assert!(matches!(err, StoreError::AccessDenied { .. }));

    let system = Transaction::new(Identity::System);
    let node = store.get_node(&system, &node_ref("a")).await.unwrap().unwrap();
    store.save_node(&system, node).await.unwrap();
    store.commit(&system).await.unwrap();
}

#[tokio::test]
async fn test_cannot_delete_node_being_edited() {
    let store = MemoryStore::with_nodes([checked_out("a")]);
    let tx = Transaction::new(Identity::System);

    let err = store.delete_node(&tx, &node_ref("a")).await.unwrap_err();
    assert!(matches!(err, StoreError::Constraint { .. }));
}

#[tokio::test]
async fn test_delete_missing_node_is_not_an_error() {
    let store = MemoryStore::new();
    let tx = Transaction::new(Identity::System);

    let result = store.delete_node(&tx, &node_ref("ghost")).await.unwrap();
    assert!(!result.existed);
    store.commit(&tx).await.unwrap();
}

#[tokio::test]
async fn test_commit_rejects_unlocked_editing_node() {
    let store = MemoryStore::with_nodes([checked_out("a")]);
    let tx = Transaction::new(Identity::System);

    let mut node = store.get_node(&tx, &node_ref("a")).await.unwrap().unwrap();
    node.lock = None;
    store.save_node(&tx, node).await.unwrap();

    let err = store.commit(&tx).await.unwrap_err();
    assert!(matches!(err, StoreError::Constraint { .. }));
    assert!(store.committed_node(&node_ref("a")).unwrap().is_locked());
}

#[tokio::test]
async fn test_commit_detects_concurrent_modification() {
    let store = MemoryStore::with_nodes([checked_out("a")]);

    let first = Transaction::new(Identity::System);
    let second = Transaction::new(Identity::System);

    let node_first = store.get_node(&first, &node_ref("a")).await.unwrap().unwrap();
    let node_second = store.get_node(&second, &node_ref("a")).await.unwrap().unwrap();

    store.save_node(&first, node_first).await.unwrap();
    store.save_node(&second, node_second).await.unwrap();

    store.commit(&first).await.unwrap();
    let err = store.commit(&second).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(store.committed_node(&node_ref("a")).unwrap().version, 2);
}

#[tokio::test]
async fn test_commit_publishes_events() {
    let store = MemoryStore::with_nodes([Node::new(node_ref("temp"), "temp.docx")]);
    let mut rx = store.subscribe_to_events();

    let tx = Transaction::new(Identity::System);
    store.delete_node(&tx, &node_ref("temp")).await.unwrap();
    store.commit(&tx).await.unwrap();

    let event = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Event should be emitted within 1 second")
        .expect("Should receive event");

    match event {
        DomainEvent::NodeDeleted { node_ref: deleted } => assert_eq!(deleted, node_ref("temp")),
        other => panic!("Expected NodeDeleted event, got {:?}", other),
    }
    assert!(store.is_empty());
}
