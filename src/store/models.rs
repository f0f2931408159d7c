/*!
 * Backing store records.
 *
 * Plain data carried across the `BackingStore` boundary. No business logic.
 */

use serde::{Deserialize, Serialize};

/// Identifier of a node (language definition or translation group)
pub type NodeId = u64;

/// Identifier of a content object
pub type ObjectId = u64;

/// A labeled node stored in one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier
    pub id: NodeId,
    /// Namespace the node belongs to
    pub namespace: String,
    /// Slug, unique per namespace by convention of the callers
    pub slug: String,
    /// Display name
    pub name: String,
    /// Sort order, not unique
    pub order: i64,
    /// Opaque serialized payload
    pub payload: String,
    /// Denormalized number of linked objects, refreshed explicitly
    pub count: u64,
}

/// Fields written when creating or updating a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNode {
    pub slug: String,
    pub name: String,
    pub order: i64,
    pub payload: String,
}

impl NewNode {
    /// Create a node definition with the given slug and name
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            order: 0,
            payload: String::new(),
        }
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }
}

impl From<&Node> for NewNode {
    fn from(node: &Node) -> Self {
        Self {
            slug: node.slug.clone(),
            name: node.name.clone(),
            order: node.order,
            payload: node.payload.clone(),
        }
    }
}

/// A link between an object and a node, returned by batch reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLink {
    /// Linked object
    pub object_id: ObjectId,
    /// The node the object is linked to, with its namespace
    pub node: Node,
}
