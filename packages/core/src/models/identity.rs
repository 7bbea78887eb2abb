//! Acting identities
//!
//! Every transaction runs as an [`Identity`]. Requests run as the calling user;
//! rollback compensation runs as [`Identity::System`], which can only be
//! obtained through a [`SystemAuthority`] handed out by the transaction
//! coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity a unit of work runs as
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Identity {
    /// An authenticated repository user
    User(String),

    /// The repository itself; bypasses permission checks
    System,
}

impl Identity {
    pub fn user(name: impl Into<String>) -> Self {
        Identity::User(name.into())
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Identity::System)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::User(name) => f.write_str(name),
            Identity::System => f.write_str("System"),
        }
    }
}

/// Capability to run work as [`Identity::System`]
///
/// Not constructible outside this crate; the coordinator issues it to the
/// services that are allowed to escalate.
#[derive(Debug, Clone)]
pub struct SystemAuthority {
    _private: (),
}

impl SystemAuthority {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }

    /// Identity granted by this authority
    pub fn identity(&self) -> Identity {
        Identity::System
    }
}
