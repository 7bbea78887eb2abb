//! Business Services
//!
//! This module contains the Google Docs removal logic:
//!
//! - `DriveClient` - Google Drive access (credentials, file metadata, deletion)
//! - `DocumentService` - Drive file lookup, content removal, node release
//! - `RemovalRequestHandler` - Parses remove-content requests and classifies failures
//! - `RollbackCompensation` - Releases a node after a denied removal rolled back
//!
//! Services coordinate between the repository layer and the HTTP surface,
//! implementing the checkout rules and the failure taxonomy.

pub mod compensation;
pub mod document_service;
pub mod drive;
pub mod error;
pub mod removal_handler;

pub use compensation::{CompensationOutcome, RollbackCompensation};
pub use document_service::{DocumentService, GoogleDocsService, STATUS_CONCURRENT_EDITORS};
pub use drive::{Credential, DriveClient, DriveError, DriveFile, InMemoryDrive};
pub use error::{DocumentError, RemovalError, STATUS_INTEGRITY_VIOLATION};
pub use removal_handler::{parse_request, RemovalRequestHandler};
