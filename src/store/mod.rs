/*!
 * Backing store adapter.
 *
 * Durable records used by the engine:
 * - labeled nodes (slug, name, order, opaque payload) grouped in namespaces
 * - a link table attaching content objects to nodes, at most one link per
 *   object and namespace
 * - the universe of content objects, per kind
 *
 * Every multi-row operation is a batch primitive here, so callers never
 * need raw queries. Adapters carry no business logic.
 */

pub mod codec;
pub mod connection;
pub mod memory;
pub mod models;
pub mod schema;
pub mod sqlite;

use anyhow::Result;

pub use codec::{GroupCodec, GroupPayload, JsonGroupCodec, PayloadValue, members};
pub use connection::DatabaseConnection;
pub use memory::MemoryStore;
pub use models::{NewNode, Node, NodeId, ObjectId, ObjectLink};
pub use sqlite::SqliteStore;

/// Storage operations the registry and the object managers rely on
///
/// Each call is one round trip to the underlying storage.
pub trait BackingStore: Send + Sync {
    /// Create a node and return its id
    fn insert_node(&self, namespace: &str, node: &NewNode) -> Result<NodeId>;

    /// Create several nodes at once, ids are returned in input order
    fn insert_nodes(&self, namespace: &str, nodes: &[NewNode]) -> Result<Vec<NodeId>>;

    /// Overwrite slug, name, order and payload of a node
    fn update_node(&self, namespace: &str, id: NodeId, node: &NewNode) -> Result<()>;

    /// Delete a node together with all of its links
    fn delete_node(&self, namespace: &str, id: NodeId) -> Result<()>;

    fn get_node(&self, namespace: &str, id: NodeId) -> Result<Option<Node>>;

    /// All nodes of a namespace, ordered by id
    fn nodes(&self, namespace: &str) -> Result<Vec<Node>>;

    /// Ids of all nodes of a namespace, ordered; the cheap existential check
    fn node_ids(&self, namespace: &str) -> Result<Vec<NodeId>>;

    /// Register a new content object of the given kind
    fn insert_object(&self, kind: &str) -> Result<ObjectId>;

    /// Attach an object to a node, replacing its previous link in the
    /// namespace; `None` removes the link
    fn set_link(&self, object_id: ObjectId, namespace: &str, node: Option<NodeId>) -> Result<()>;

    /// Batch variant of `set_link` for attaching
    fn link_objects(&self, namespace: &str, links: &[(ObjectId, NodeId)]) -> Result<()>;

    /// Remove the namespace link of every given object
    fn unlink_objects(&self, namespace: &str, objects: &[ObjectId]) -> Result<()>;

    /// Links of the given objects in the given namespaces, with their nodes
    fn object_links(&self, objects: &[ObjectId], namespaces: &[&str]) -> Result<Vec<ObjectLink>>;

    /// Objects linked to a node
    fn linked_objects(&self, namespace: &str, node: NodeId) -> Result<Vec<ObjectId>>;

    /// Live number of objects linked to a node
    fn count_links(&self, namespace: &str, node: NodeId) -> Result<u64>;

    /// Recount the links of a node and persist the denormalized count
    fn refresh_count(&self, namespace: &str, node: NodeId) -> Result<u64>;

    /// Objects of `kind` linked to none of `nodes` in `namespace`, ordered by
    /// id; `limit == 0` means no limit
    fn objects_without_link(
        &self,
        kind: &str,
        namespace: &str,
        nodes: &[NodeId],
        limit: usize,
    ) -> Result<Vec<ObjectId>>;

    /// Number of round trips served so far
    fn round_trips(&self) -> u64;
}
