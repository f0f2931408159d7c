/*!
 * In-memory backing store.
 *
 * Used by tests and by callers that keep languages in process only. All
 * state sits behind one `RwLock`, every trait call counts as a round trip.
 */

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Result, anyhow};
use parking_lot::RwLock;

use super::BackingStore;
use super::models::{NewNode, Node, NodeId, ObjectId, ObjectLink};

#[derive(Default)]
struct MemoryState {
    next_node_id: NodeId,
    next_object_id: ObjectId,
    nodes: BTreeMap<NodeId, Node>,
    objects: BTreeMap<ObjectId, String>,
    /// (object, namespace) -> node
    links: HashMap<(ObjectId, String), NodeId>,
}

impl MemoryState {
    fn node_in(&self, namespace: &str, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(&id)
            .filter(|n| n.namespace == namespace)
            .ok_or_else(|| anyhow!("Node {} not found in namespace '{}'", id, namespace))
    }

    fn live_count(&self, namespace: &str, node: NodeId) -> u64 {
        self.links
            .iter()
            .filter(|((_, ns), n)| ns == namespace && **n == node)
            .count() as u64
    }
}

/// Backing store kept entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    round_trips: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&self) {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
    }
}

impl BackingStore for MemoryStore {
    fn insert_node(&self, namespace: &str, node: &NewNode) -> Result<NodeId> {
        self.tick();
        let mut state = self.state.write();
        state.next_node_id += 1;
        let id = state.next_node_id;
        state.nodes.insert(
            id,
            Node {
                id,
                namespace: namespace.to_string(),
                slug: node.slug.clone(),
                name: node.name.clone(),
                order: node.order,
                payload: node.payload.clone(),
                count: 0,
            },
        );
        Ok(id)
    }

    fn insert_nodes(&self, namespace: &str, nodes: &[NewNode]) -> Result<Vec<NodeId>> {
        self.tick();
        let mut state = self.state.write();
        let mut ids = Vec::with_capacity(nodes.len());
        for node in nodes {
            state.next_node_id += 1;
            let id = state.next_node_id;
            state.nodes.insert(
                id,
                Node {
                    id,
                    namespace: namespace.to_string(),
                    slug: node.slug.clone(),
                    name: node.name.clone(),
                    order: node.order,
                    payload: node.payload.clone(),
                    count: 0,
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    fn update_node(&self, namespace: &str, id: NodeId, node: &NewNode) -> Result<()> {
        self.tick();
        let mut state = self.state.write();
        state.node_in(namespace, id)?;
        if let Some(existing) = state.nodes.get_mut(&id) {
            existing.slug = node.slug.clone();
            existing.name = node.name.clone();
            existing.order = node.order;
            existing.payload = node.payload.clone();
        }
        Ok(())
    }

    fn delete_node(&self, namespace: &str, id: NodeId) -> Result<()> {
        self.tick();
        let mut state = self.state.write();
        if state.nodes.get(&id).is_some_and(|n| n.namespace == namespace) {
            state.nodes.remove(&id);
            state
                .links
                .retain(|(_, ns), node| !(ns == namespace && *node == id));
        }
        Ok(())
    }

    fn get_node(&self, namespace: &str, id: NodeId) -> Result<Option<Node>> {
        self.tick();
        let state = self.state.read();
        Ok(state
            .nodes
            .get(&id)
            .filter(|n| n.namespace == namespace)
            .cloned())
    }

    fn nodes(&self, namespace: &str) -> Result<Vec<Node>> {
        self.tick();
        let state = self.state.read();
        Ok(state
            .nodes
            .values()
            .filter(|n| n.namespace == namespace)
            .cloned()
            .collect())
    }

    fn node_ids(&self, namespace: &str) -> Result<Vec<NodeId>> {
        self.tick();
        let state = self.state.read();
        Ok(state
            .nodes
            .values()
            .filter(|n| n.namespace == namespace)
            .map(|n| n.id)
            .collect())
    }

    fn insert_object(&self, kind: &str) -> Result<ObjectId> {
        self.tick();
        let mut state = self.state.write();
        state.next_object_id += 1;
        let id = state.next_object_id;
        state.objects.insert(id, kind.to_string());
        Ok(id)
    }

    fn set_link(&self, object_id: ObjectId, namespace: &str, node: Option<NodeId>) -> Result<()> {
        self.tick();
        let mut state = self.state.write();
        let key = (object_id, namespace.to_string());
        match node {
            Some(node) => {
                state.node_in(namespace, node)?;
                state.links.insert(key, node);
            }
            None => {
                state.links.remove(&key);
            }
        }
        Ok(())
    }

    fn link_objects(&self, namespace: &str, links: &[(ObjectId, NodeId)]) -> Result<()> {
        self.tick();
        let mut state = self.state.write();
        for (object_id, node) in links {
            state.node_in(namespace, *node)?;
            state.links.insert((*object_id, namespace.to_string()), *node);
        }
        Ok(())
    }

    fn unlink_objects(&self, namespace: &str, objects: &[ObjectId]) -> Result<()> {
        self.tick();
        let mut state = self.state.write();
        for object_id in objects {
            state.links.remove(&(*object_id, namespace.to_string()));
        }
        Ok(())
    }

    fn object_links(&self, objects: &[ObjectId], namespaces: &[&str]) -> Result<Vec<ObjectLink>> {
        self.tick();
        let state = self.state.read();
        let mut links = Vec::new();
        for object_id in objects {
            for namespace in namespaces {
                let key = (*object_id, namespace.to_string());
                if let Some(node) = state.links.get(&key).and_then(|id| state.nodes.get(id)) {
                    links.push(ObjectLink {
                        object_id: *object_id,
                        node: node.clone(),
                    });
                }
            }
        }
        Ok(links)
    }

    fn linked_objects(&self, namespace: &str, node: NodeId) -> Result<Vec<ObjectId>> {
        self.tick();
        let state = self.state.read();
        let mut objects: Vec<ObjectId> = state
            .links
            .iter()
            .filter(|((_, ns), n)| ns == namespace && **n == node)
            .map(|((object_id, _), _)| *object_id)
            .collect();
        objects.sort_unstable();
        Ok(objects)
    }

    fn count_links(&self, namespace: &str, node: NodeId) -> Result<u64> {
        self.tick();
        Ok(self.state.read().live_count(namespace, node))
    }

    fn refresh_count(&self, namespace: &str, node: NodeId) -> Result<u64> {
        self.tick();
        let mut state = self.state.write();
        let count = state.live_count(namespace, node);
        if let Some(existing) = state.nodes.get_mut(&node) {
            existing.count = count;
        }
        Ok(count)
    }

    fn objects_without_link(
        &self,
        kind: &str,
        namespace: &str,
        nodes: &[NodeId],
        limit: usize,
    ) -> Result<Vec<ObjectId>> {
        self.tick();
        let state = self.state.read();
        let nodes: HashSet<NodeId> = nodes.iter().copied().collect();
        let untagged = state
            .objects
            .iter()
            .filter(|(_, k)| k.as_str() == kind)
            .map(|(id, _)| *id)
            .filter(|id| {
                state
                    .links
                    .get(&(*id, namespace.to_string()))
                    .is_none_or(|node| !nodes.contains(node))
            });
        Ok(if limit == 0 {
            untagged.collect()
        } else {
            untagged.take(limit).collect()
        })
    }

    fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }
}
