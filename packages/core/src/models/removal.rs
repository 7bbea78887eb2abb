//! Removal request and result payloads

use crate::models::NodeRef;
use serde::{Deserialize, Serialize};

/// Parsed body of a remove-content request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalRequest {
    /// Node whose Google Docs editing session should be removed
    pub node_ref: NodeRef,

    /// Skip the concurrent-editor safety check
    pub force: bool,
}

impl RemovalRequest {
    pub fn new(node_ref: NodeRef, force: bool) -> Self {
        Self { node_ref, force }
    }
}

/// Response model: `{ "success": bool }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalResult {
    pub success: bool,
}

impl RemovalResult {
    /// Content was removed from Drive and the node released
    pub fn removed() -> Self {
        Self { success: true }
    }

    /// Node was not checked out; nothing was done
    pub fn skipped() -> Self {
        Self { success: false }
    }
}
