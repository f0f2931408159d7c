/*!
 * Language-scoped SQL fragments.
 *
 * A clause joins the object table to the link table for one namespace and
 * restricts the linked node to a set of language node ids. Node ids are
 * integers and namespaces are reduced to `[a-z_]`, so both render inline.
 */

use log::warn;

use crate::store::NodeId;

/// Alias of the joined link table
const LINK_ALIAS: &str = "pll_tr";

/// Join and filter restricting objects to some languages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageClause {
    namespace: String,
    node_ids: Vec<NodeId>,
}

impl LanguageClause {
    pub fn new(namespace: impl Into<String>, node_ids: Vec<NodeId>) -> Self {
        let raw = namespace.into();
        let namespace: String = raw
            .chars()
            .filter(|c| c.is_ascii_lowercase() || *c == '_')
            .collect();
        if namespace != raw {
            warn!("Namespace '{}' sanitized to '{}' in language clause", raw, namespace);
        }
        Self { namespace, node_ids }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    /// Inner join of the link table onto `alias.id`
    pub fn join_clause(&self, alias: &str) -> String {
        format!(
            "INNER JOIN links AS {link} ON {link}.object_id = {alias}.id AND {link}.namespace = '{ns}'",
            link = LINK_ALIAS,
            alias = alias,
            ns = self.namespace
        )
    }

    /// Filter to append after a `WHERE`; matches nothing without languages
    pub fn where_clause(&self) -> String {
        if self.node_ids.is_empty() {
            return " AND 1 = 0".to_string();
        }
        let ids: Vec<String> = self.node_ids.iter().map(|id| id.to_string()).collect();
        format!(" AND {}.node_id IN ({})", LINK_ALIAS, ids.join(","))
    }
}
