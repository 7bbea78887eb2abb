//! Data Models
//!
//! This module contains the core data structures used throughout DriveLink:
//!
//! - `NodeRef` - `<protocol>://<identifier>/<id>` node addressing
//! - `Node` - Repository node with aspects, lock and Drive link
//! - `Identity` / `SystemAuthority` - Who a unit of work runs as
//! - `RemovalRequest` / `RemovalResult` - Remove-content endpoint payloads

mod identity;
mod node;
mod node_ref;
mod removal;

pub use identity::{Identity, SystemAuthority};
pub use node::{Aspect, Lock, Node};
pub use node_ref::{MalformedNodeRef, NodeRef};
pub use removal::{RemovalRequest, RemovalResult};
