//! Node Data Structures
//!
//! A repository node as seen by the Google Docs integration: its reference,
//! the aspects (marker flags) applied to it, its lock state, and the link to
//! the Drive file it is being edited through.
//!
//! # Examples
//!
//! ```rust
//! use drivelink_core::models::{Aspect, Node, NodeRef};
//!
//! let node_ref = NodeRef::spaces_store("123").unwrap();
//! let node = Node::new(node_ref, "Quarterly report.docx")
//!     .with_aspect(Aspect::EditingInGoogle)
//!     .with_drive_resource_id("drive-file-1");
//!
//! assert!(node.has_aspect(Aspect::EditingInGoogle));
//! assert!(!node.has_aspect(Aspect::Temporary));
//! ```

use crate::models::{Identity, NodeRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Marker aspects understood by the integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Aspect {
    /// The node is checked out to Google Docs for editing
    #[serde(rename = "gd2:editingInGoogle")]
    EditingInGoogle,

    /// The node only exists for an in-flight editing session
    #[serde(rename = "sys:temporary")]
    Temporary,
}

impl Aspect {
    /// Qualified name of the aspect
    pub fn qname(&self) -> &'static str {
        match self {
            Aspect::EditingInGoogle => "gd2:editingInGoogle",
            Aspect::Temporary => "sys:temporary",
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.qname())
    }
}

/// Lock held on a node while it is being edited externally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lock {
    /// Who took the lock
    pub owner: String,

    /// When the lock was taken
    pub acquired_at: DateTime<Utc>,
}

impl Lock {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            acquired_at: Utc::now(),
        }
    }
}

/// Repository node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Address of the node
    pub node_ref: NodeRef,

    /// Display name (`cm:name`)
    pub name: String,

    /// Applied marker aspects
    #[serde(default)]
    pub aspects: BTreeSet<Aspect>,

    /// Current lock, if any
    #[serde(default)]
    pub lock: Option<Lock>,

    /// Users allowed to write the node (`None` means anyone)
    #[serde(default)]
    pub writers: Option<BTreeSet<String>>,

    /// Id of the Drive file the node is being edited through
    #[serde(default)]
    pub drive_resource_id: Option<String>,

    /// Optimistic concurrency control version (incremented on each commit)
    pub version: i64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,
}

impl Node {
    /// Create an undecorated, unlocked node writable by anyone
    pub fn new(node_ref: NodeRef, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            node_ref,
            name: name.into(),
            aspects: BTreeSet::new(),
            lock: None,
            writers: None,
            drive_resource_id: None,
            version: 1,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_aspect(mut self, aspect: Aspect) -> Self {
        self.aspects.insert(aspect);
        self
    }

    pub fn with_lock(mut self, owner: impl Into<String>) -> Self {
        self.lock = Some(Lock::new(owner));
        self
    }

    /// Restrict writes to the given users
    pub fn with_writers<I, S>(mut self, writers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.writers = Some(writers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_drive_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.drive_resource_id = Some(resource_id.into());
        self
    }

    /// Node checked out to Google Docs: decorated, locked and linked to a Drive file
    pub fn checked_out(
        node_ref: NodeRef,
        name: impl Into<String>,
        owner: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self::new(node_ref, name)
            .with_aspect(Aspect::EditingInGoogle)
            .with_lock(owner)
            .with_drive_resource_id(resource_id)
    }

    pub fn has_aspect(&self, aspect: Aspect) -> bool {
        self.aspects.contains(&aspect)
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Whether `identity` may modify this node
    pub fn can_write(&self, identity: &Identity) -> bool {
        match identity {
            Identity::System => true,
            Identity::User(user) => self
                .writers
                .as_ref()
                .map_or(true, |writers| writers.contains(user)),
        }
    }

    /// Bump modification timestamp
    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}
