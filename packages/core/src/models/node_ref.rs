//! Node References
//!
//! A `NodeRef` addresses a single node in a repository store using the
//! `<protocol>://<identifier>/<id>` form, e.g. `workspace://SpacesStore/123`.
//! The id is everything after the last `/`, so store identifiers may contain
//! `/` but ids may not.
//!
//! # Examples
//!
//! ```rust
//! use drivelink_core::models::NodeRef;
//!
//! let node_ref: NodeRef = "workspace://SpacesStore/123".parse().unwrap();
//! assert_eq!(node_ref.protocol(), "workspace");
//! assert_eq!(node_ref.identifier(), "SpacesStore");
//! assert_eq!(node_ref.id(), "123");
//! assert_eq!(node_ref.to_string(), "workspace://SpacesStore/123");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const URI_FILLER: &str = "://";

/// Raised when a string does not have the `<protocol>://<identifier>/<id>` shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed node reference: '{0}'")]
pub struct MalformedNodeRef(pub String);

/// Reference to a node within a store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    protocol: String,
    identifier: String,
    id: String,
}

impl NodeRef {
    /// Build a reference from its parts
    ///
    /// Parts are validated with the same rules as [`NodeRef::from_str`].
    pub fn new(
        protocol: impl Into<String>,
        identifier: impl Into<String>,
        id: impl Into<String>,
    ) -> Result<Self, MalformedNodeRef> {
        let node_ref = Self {
            protocol: protocol.into(),
            identifier: identifier.into(),
            id: id.into(),
        };

        let valid = [&node_ref.protocol, &node_ref.identifier, &node_ref.id]
            .iter()
            .all(|part| !part.is_empty() && part.trim() == part.as_str());

        if valid && !node_ref.protocol.contains([':', '/']) && !node_ref.id.contains('/') {
            Ok(node_ref)
        } else {
            Err(MalformedNodeRef(format!(
                "{}{}{}/{}",
                node_ref.protocol, URI_FILLER, node_ref.identifier, node_ref.id
            )))
        }
    }

    /// Convenience constructor for the default `workspace://SpacesStore` store
    pub fn spaces_store(id: impl Into<String>) -> Result<Self, MalformedNodeRef> {
        Self::new("workspace", "SpacesStore", id)
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl FromStr for NodeRef {
    type Err = MalformedNodeRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MalformedNodeRef(s.to_string());

        let (protocol, rest) = s.split_once(URI_FILLER).ok_or_else(malformed)?;
        let (identifier, id) = rest.rsplit_once('/').ok_or_else(malformed)?;

        NodeRef::new(protocol, identifier, id).map_err(|_| malformed())
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}/{}",
            self.protocol, URI_FILLER, self.identifier, self.id
        )
    }
}

impl Serialize for NodeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
