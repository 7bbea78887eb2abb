//! Development HTTP Server Binary
//!
//! Standalone binary serving the DriveLink API over an in-memory repository
//! and an in-memory Google Drive, seeded with demo nodes.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (127.0.0.1:3001, user "guest")
//! cargo run --bin dev-server
//!
//! # Custom port
//! DRIVELINK_PORT=3002 cargo run --bin dev-server
//! ```
//!
//! # Environment Variables
//!
//! - `DRIVELINK_PORT`, `DRIVELINK_BIND_ADDR`: Listen address
//! - `DRIVELINK_DEFAULT_USER`: User for requests without `X-Remote-User`
//! - `DRIVELINK_TX_MAX_RETRIES`, `DRIVELINK_TX_RETRY_BACKOFF_MS`: Commit retry policy
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")
//!
//! # Demo nodes
//!
//! | Node | Notes |
//! |---|---|
//! | `workspace://SpacesStore/proposal` | checked out, writable by everyone |
//! | `workspace://SpacesStore/draft` | checked out, temporary, writable by `alice` only |
//! | `workspace://SpacesStore/handbook` | checked out, writable by `alice` only |
//!
//! Removing `handbook` as `guest` needs `"force": true` (alice is still
//! editing). The release is then denied after the Drive copy is deleted, so the
//! rollback compensation releases the node; `draft` is deleted the same way.

use std::sync::Arc;

use drivelink_core::api::{self, AppState};
use drivelink_core::{
    Aspect, DriveFile, GoogleDocsService, InMemoryDrive, MemoryStore, Node, NodeRef,
    RemovalRequestHandler, ServerConfig, TransactionCoordinator,
};

const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🚀 DriveLink HTTP Dev Server");
    tracing::info!("==================================");

    let config = ServerConfig::from_env()?;
    tracing::info!("📡 Listening on {}", config.listen_addr());
    tracing::info!("👤 Default user: {}", config.default_user);

    tracing::info!("🔧 Initializing services...");
    let (nodes, files) = demo_content()?;
    tracing::info!("📦 Seeding {} demo node(s)", nodes.len());

    let store = Arc::new(MemoryStore::with_nodes(nodes));
    let drive = Arc::new(InMemoryDrive::with_files(files));
    let documents = Arc::new(GoogleDocsService::new(drive, store.clone()));
    let coordinator = TransactionCoordinator::new(store, config.transaction.clone());
    let handler = RemovalRequestHandler::new(documents, coordinator);
    tracing::info!("✅ Services initialized");

    let state = AppState::new(handler, config);
    api::start_server(state, shutdown_signal()).await?;

    Ok(())
}

/// Demo nodes and the Drive files they are linked to
fn demo_content() -> anyhow::Result<(Vec<Node>, Vec<DriveFile>)> {
    let proposal = NodeRef::spaces_store("proposal")?;
    let draft = NodeRef::spaces_store("draft")?;
    let handbook = NodeRef::spaces_store("handbook")?;

    let nodes = vec![
        Node::checked_out(proposal, "Proposal.docx", "guest", "drive-proposal"),
        Node::checked_out(draft, "Draft.docx", "alice", "drive-draft")
            .with_aspect(Aspect::Temporary)
            .with_writers(["alice"]),
        Node::checked_out(handbook, "Handbook.docx", "alice", "drive-handbook")
            .with_writers(["alice"]),
    ];

    let files = vec![
        DriveFile::new("drive-proposal", "Proposal", GOOGLE_DOC_MIME),
        DriveFile::new("drive-draft", "Draft", GOOGLE_DOC_MIME),
        DriveFile::new("drive-handbook", "Handbook", GOOGLE_DOC_MIME)
            .with_active_editors(["alice"]),
    ];

    Ok((nodes, files))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("🛑 Shutdown requested"),
        Err(err) => {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    }
}
