//! Google Drive client seam
//!
//! [`DriveClient`] is the narrow slice of the Drive API the integration needs.
//! [`InMemoryDrive`] implements it without network access for the dev server
//! and tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

/// OAuth access credential for Drive calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: Utc::now() + lifetime,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Drive file metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub title: String,
    pub mime_type: String,
    pub modified_time: DateTime<Utc>,
    /// Users currently editing the file in Google Docs
    #[serde(default)]
    pub active_editors: Vec<String>,
}

impl DriveFile {
    pub fn new(id: impl Into<String>, title: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            mime_type: mime_type.into(),
            modified_time: Utc::now(),
            active_editors: Vec::new(),
        }
    }

    pub fn with_active_editors<I, S>(mut self, editors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_editors = editors.into_iter().map(Into::into).collect();
        self
    }

    /// Editors other than `user`
    pub fn other_editors<'a>(&'a self, user: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.active_editors.iter().filter(move |editor| editor.as_str() != user)
    }
}

/// Errors reported by a Drive client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriveError {
    /// The OAuth grant was rejected
    #[error("Drive authentication failed: {0}")]
    Authentication(String),

    /// The stored refresh token could not be exchanged
    #[error("Drive refresh token rejected: {0}")]
    RefreshToken(String),

    /// The Drive API returned an error
    #[error("Drive API error: {message}")]
    Api { status: Option<u16>, message: String },
}

impl DriveError {
    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

/// Remote Drive operations
#[async_trait]
pub trait DriveClient: Send + Sync {
    /// Credential for the current user
    async fn credential(&self) -> Result<Credential, DriveError>;

    /// Metadata of a Drive file
    async fn file_metadata(&self, credential: &Credential, resource_id: &str) -> Result<DriveFile, DriveError>;

    /// Permanently delete a Drive file
    async fn delete_file(&self, credential: &Credential, resource_id: &str) -> Result<(), DriveError>;
}

/// Drive backed by a local map
#[derive(Default)]
pub struct InMemoryDrive {
    files: RwLock<HashMap<String, DriveFile>>,
    credential_failure: RwLock<Option<DriveError>>,
    api_failure: RwLock<Option<DriveError>>,
}

impl InMemoryDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: impl IntoIterator<Item = DriveFile>) -> Self {
        let drive = Self::new();
        for file in files {
            drive.add_file(file);
        }
        drive
    }

    pub fn add_file(&self, file: DriveFile) {
        write(&self.files).insert(file.id.clone(), file);
    }

    pub fn has_file(&self, resource_id: &str) -> bool {
        read(&self.files).contains_key(resource_id)
    }

    /// Make `credential()` fail with `error` until cleared
    pub fn fail_credentials_with(&self, error: Option<DriveError>) {
        *write(&self.credential_failure) = error;
    }

    /// Make `delete_file()` fail with `error` until cleared
    pub fn fail_deletes_with(&self, error: Option<DriveError>) {
        *write(&self.api_failure) = error;
    }

    fn check(credential: &Credential) -> Result<(), DriveError> {
        if credential.is_expired() {
            return Err(DriveError::Authentication("access token expired".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DriveClient for InMemoryDrive {
    async fn credential(&self) -> Result<Credential, DriveError> {
        if let Some(error) = read(&self.credential_failure).clone() {
            return Err(error);
        }
        Ok(Credential::new(
            format!("in-memory-{}", Uuid::new_v4()),
            Duration::hours(1),
        ))
    }

    async fn file_metadata(&self, credential: &Credential, resource_id: &str) -> Result<DriveFile, DriveError> {
        Self::check(credential)?;
        read(&self.files)
            .get(resource_id)
            .cloned()
            .ok_or_else(|| DriveError::api(Some(404), format!("File not found: {}", resource_id)))
    }

    async fn delete_file(&self, credential: &Credential, resource_id: &str) -> Result<(), DriveError> {
        Self::check(credential)?;
        if let Some(error) = read(&self.api_failure).clone() {
            return Err(error);
        }
        write(&self.files)
            .remove(resource_id)
            .map(|_| ())
            .ok_or_else(|| DriveError::api(Some(404), format!("File not found: {}", resource_id)))
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
