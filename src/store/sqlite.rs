/*!
 * SQLite backing store.
 *
 * Implements the `BackingStore` primitives over the `nodes`, `links` and
 * `objects` tables, and the persistent cache tier over `cache_entries`.
 * Batch primitives run inside a single transaction.
 */

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, anyhow};
use log::debug;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use super::BackingStore;
use super::connection::DatabaseConnection;
use super::models::{NewNode, Node, NodeId, ObjectId, ObjectLink};
use crate::cache::PersistentCache;
use crate::objects::query::LanguageClause;

/// Store backed by a SQLite database
#[derive(Clone)]
pub struct SqliteStore {
    /// Database connection
    db: DatabaseConnection,
    round_trips: std::sync::Arc<AtomicU64>,
}

/// `?,?,?` placeholder list for an `IN (...)` clause
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

fn parse_node_row(row: &rusqlite::Row) -> rusqlite::Result<Node> {
    Ok(Node {
        id: row.get::<_, i64>(0)? as NodeId,
        namespace: row.get(1)?,
        slug: row.get(2)?,
        name: row.get(3)?,
        order: row.get(4)?,
        payload: row.get(5)?,
        count: row.get::<_, i64>(6)? as u64,
    })
}

const NODE_COLUMNS: &str = "id, namespace, slug, name, sort_order, payload, link_count";

fn insert_node_row(conn: &Connection, namespace: &str, node: &NewNode) -> Result<NodeId> {
    conn.execute(
        "INSERT INTO nodes (namespace, slug, name, sort_order, payload) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![namespace, node.slug, node.name, node.order, node.payload],
    )?;
    Ok(conn.last_insert_rowid() as NodeId)
}

fn ensure_node_in(conn: &Connection, namespace: &str, id: NodeId) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM nodes WHERE id = ?1 AND namespace = ?2",
        params![id as i64, namespace],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(anyhow!("Node {} not found in namespace '{}'", id, namespace))
    }
}

impl SqliteStore {
    /// Create a store over the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            round_trips: Default::default(),
        }
    }

    /// Create a store with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    /// Underlying database connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        self.db.execute(f)
    }

    fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T>,
    {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        self.db.transaction(f)
    }

    /// Objects of `kind` narrowed by a language clause, ordered by id
    pub fn select_objects(&self, kind: &str, clause: &LanguageClause) -> Result<Vec<ObjectId>> {
        let sql = format!(
            "SELECT o.id FROM objects AS o {} WHERE o.kind = ?1 {} ORDER BY o.id",
            clause.join_clause("o"),
            clause.where_clause()
        );
        debug!("Selecting objects: {}", sql);

        self.execute(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([kind], |row| row.get::<_, i64>(0))?;
            Ok(rows.filter_map(|r| r.ok()).map(|id| id as ObjectId).collect())
        })
    }
}

impl BackingStore for SqliteStore {
    fn insert_node(&self, namespace: &str, node: &NewNode) -> Result<NodeId> {
        self.execute(|conn| insert_node_row(conn, namespace, node))
            .with_context(|| format!("Failed to insert node '{}' in '{}'", node.slug, namespace))
    }

    fn insert_nodes(&self, namespace: &str, nodes: &[NewNode]) -> Result<Vec<NodeId>> {
        self.transaction(|tx| {
            nodes
                .iter()
                .map(|node| insert_node_row(tx, namespace, node))
                .collect()
        })
        .with_context(|| format!("Failed to insert {} nodes in '{}'", nodes.len(), namespace))
    }

    fn update_node(&self, namespace: &str, id: NodeId, node: &NewNode) -> Result<()> {
        self.execute(|conn| {
            let updated = conn.execute(
                r#"
                UPDATE nodes SET slug = ?1, name = ?2, sort_order = ?3, payload = ?4
                WHERE id = ?5 AND namespace = ?6
                "#,
                params![node.slug, node.name, node.order, node.payload, id as i64, namespace],
            )?;
            if updated == 0 {
                return Err(anyhow!("Node {} not found in namespace '{}'", id, namespace));
            }
            Ok(())
        })
    }

    fn delete_node(&self, namespace: &str, id: NodeId) -> Result<()> {
        self.execute(|conn| {
            // Links go with the node through ON DELETE CASCADE
            conn.execute(
                "DELETE FROM nodes WHERE id = ?1 AND namespace = ?2",
                params![id as i64, namespace],
            )?;
            Ok(())
        })
    }

    fn get_node(&self, namespace: &str, id: NodeId) -> Result<Option<Node>> {
        self.execute(|conn| {
            let node = conn
                .query_row(
                    &format!("SELECT {} FROM nodes WHERE id = ?1 AND namespace = ?2", NODE_COLUMNS),
                    params![id as i64, namespace],
                    parse_node_row,
                )
                .optional()?;
            Ok(node)
        })
    }

    fn nodes(&self, namespace: &str) -> Result<Vec<Node>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM nodes WHERE namespace = ?1 ORDER BY id",
                NODE_COLUMNS
            ))?;
            let nodes = stmt
                .query_map([namespace], parse_node_row)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(nodes)
        })
    }

    fn node_ids(&self, namespace: &str) -> Result<Vec<NodeId>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM nodes WHERE namespace = ?1 ORDER BY id")?;
            let ids = stmt
                .query_map([namespace], |row| row.get::<_, i64>(0))?
                .filter_map(|r| r.ok())
                .map(|id| id as NodeId)
                .collect();
            Ok(ids)
        })
    }

    fn insert_object(&self, kind: &str) -> Result<ObjectId> {
        self.execute(|conn| {
            conn.execute("INSERT INTO objects (kind) VALUES (?1)", [kind])?;
            Ok(conn.last_insert_rowid() as ObjectId)
        })
    }

    fn set_link(&self, object_id: ObjectId, namespace: &str, node: Option<NodeId>) -> Result<()> {
        self.execute(|conn| {
            match node {
                Some(node) => {
                    ensure_node_in(conn, namespace, node)?;
                    conn.execute(
                        "INSERT OR REPLACE INTO links (object_id, namespace, node_id) VALUES (?1, ?2, ?3)",
                        params![object_id as i64, namespace, node as i64],
                    )?;
                }
                None => {
                    conn.execute(
                        "DELETE FROM links WHERE object_id = ?1 AND namespace = ?2",
                        params![object_id as i64, namespace],
                    )?;
                }
            }
            Ok(())
        })
    }

    fn link_objects(&self, namespace: &str, links: &[(ObjectId, NodeId)]) -> Result<()> {
        self.transaction(|tx| {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO links (object_id, namespace, node_id) VALUES (?1, ?2, ?3)",
            )?;
            for (object_id, node) in links {
                stmt.execute(params![*object_id as i64, namespace, *node as i64])?;
            }
            Ok(())
        })
        .with_context(|| format!("Failed to link {} objects in '{}'", links.len(), namespace))
    }

    fn unlink_objects(&self, namespace: &str, objects: &[ObjectId]) -> Result<()> {
        self.transaction(|tx| {
            let mut stmt =
                tx.prepare("DELETE FROM links WHERE object_id = ?1 AND namespace = ?2")?;
            for object_id in objects {
                stmt.execute(params![*object_id as i64, namespace])?;
            }
            Ok(())
        })
    }

    fn object_links(&self, objects: &[ObjectId], namespaces: &[&str]) -> Result<Vec<ObjectLink>> {
        if objects.is_empty() || namespaces.is_empty() {
            return Ok(Vec::new());
        }

        self.execute(|conn| {
            let sql = format!(
                r#"
                SELECT l.object_id, n.id, n.namespace, n.slug, n.name, n.sort_order, n.payload, n.link_count
                FROM links AS l
                INNER JOIN nodes AS n ON n.id = l.node_id
                WHERE l.object_id IN ({}) AND l.namespace IN ({})
                ORDER BY l.object_id
                "#,
                placeholders(objects.len()),
                placeholders(namespaces.len())
            );
            let values: Vec<rusqlite::types::Value> = objects
                .iter()
                .map(|id| rusqlite::types::Value::Integer(*id as i64))
                .chain(
                    namespaces
                        .iter()
                        .map(|ns| rusqlite::types::Value::Text(ns.to_string())),
                )
                .collect();

            let mut stmt = conn.prepare(&sql)?;
            let links = stmt
                .query_map(params_from_iter(values), |row| {
                    Ok(ObjectLink {
                        object_id: row.get::<_, i64>(0)? as ObjectId,
                        node: Node {
                            id: row.get::<_, i64>(1)? as NodeId,
                            namespace: row.get(2)?,
                            slug: row.get(3)?,
                            name: row.get(4)?,
                            order: row.get(5)?,
                            payload: row.get(6)?,
                            count: row.get::<_, i64>(7)? as u64,
                        },
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();
            Ok(links)
        })
    }

    fn linked_objects(&self, namespace: &str, node: NodeId) -> Result<Vec<ObjectId>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT object_id FROM links WHERE namespace = ?1 AND node_id = ?2 ORDER BY object_id",
            )?;
            let objects = stmt
                .query_map(params![namespace, node as i64], |row| row.get::<_, i64>(0))?
                .filter_map(|r| r.ok())
                .map(|id| id as ObjectId)
                .collect();
            Ok(objects)
        })
    }

    fn count_links(&self, namespace: &str, node: NodeId) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM links WHERE namespace = ?1 AND node_id = ?2",
                params![namespace, node as i64],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    fn refresh_count(&self, namespace: &str, node: NodeId) -> Result<u64> {
        self.execute(|conn| {
            conn.execute(
                r#"
                UPDATE nodes SET link_count = (
                    SELECT COUNT(*) FROM links WHERE namespace = ?1 AND node_id = ?2
                )
                WHERE id = ?2 AND namespace = ?1
                "#,
                params![namespace, node as i64],
            )?;
            let count: i64 = conn
                .query_row(
                    "SELECT link_count FROM nodes WHERE id = ?1",
                    [node as i64],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or(0);
            Ok(count as u64)
        })
    }

    fn objects_without_link(
        &self,
        kind: &str,
        namespace: &str,
        nodes: &[NodeId],
        limit: usize,
    ) -> Result<Vec<ObjectId>> {
        self.execute(|conn| {
            let limit_sql = if limit == 0 {
                String::new()
            } else {
                format!("LIMIT {}", limit)
            };
            let sql = format!(
                r#"
                SELECT o.id FROM objects AS o
                WHERE o.kind = ?
                  AND o.id NOT IN (
                      SELECT l.object_id FROM links AS l
                      WHERE l.namespace = ? AND l.node_id IN ({})
                  )
                ORDER BY o.id
                {}
                "#,
                placeholders(nodes.len().max(1)),
                limit_sql
            );

            let mut values = vec![
                rusqlite::types::Value::Text(kind.to_string()),
                rusqlite::types::Value::Text(namespace.to_string()),
            ];
            if nodes.is_empty() {
                // No language at all: nothing can match, every object is untagged
                values.push(rusqlite::types::Value::Null);
            } else {
                values.extend(nodes.iter().map(|n| rusqlite::types::Value::Integer(*n as i64)));
            }

            let mut stmt = conn.prepare(&sql)?;
            let objects = stmt
                .query_map(params_from_iter(values), |row| row.get::<_, i64>(0))?
                .filter_map(|r| r.ok())
                .map(|id| id as ObjectId)
                .collect();
            Ok(objects)
        })
    }

    fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }
}

impl PersistentCache for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.db.execute(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM cache_entries WHERE cache_key = ?1",
                    [key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.db.execute(|conn| {
            conn.execute(
                r#"
                INSERT INTO cache_entries (cache_key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(cache_key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
                params![key, value, now],
            )?;
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.db.execute(|conn| {
            conn.execute("DELETE FROM cache_entries WHERE cache_key = ?1", [key])?;
            Ok(())
        })
    }
}
