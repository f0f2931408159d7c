/*!
 * Translation group payload codec.
 *
 * Business logic only ever sees the typed `GroupPayload`; the serialized
 * form stored in the node payload is produced and parsed here.
 */

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::models::ObjectId;

/// One value of a group payload
///
/// Member entries map a language slug to an object id. Foreign code may store
/// other values under non-slug keys; they are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    /// Object id of a group member
    Id(ObjectId),
    /// Anything else, preserved as-is
    Other(serde_json::Value),
}

impl PayloadValue {
    /// Object id carried by this value, if it is a positive id
    pub fn as_id(&self) -> Option<ObjectId> {
        match self {
            Self::Id(id) if *id > 0 => Some(*id),
            _ => None,
        }
    }
}

/// Decoded payload of a translation group node
pub type GroupPayload = BTreeMap<String, PayloadValue>;

/// Member entries of a payload: keys naming one of `slugs` with a positive id
pub fn members<'a>(
    payload: &'a GroupPayload,
    slugs: &'a BTreeSet<String>,
) -> impl Iterator<Item = (&'a str, ObjectId)> + 'a {
    payload
        .iter()
        .filter(|(key, _)| slugs.contains(*key))
        .filter_map(|(key, value)| value.as_id().map(|id| (key.as_str(), id)))
}

/// Converts group payloads to and from their stored form
pub trait GroupCodec: Send + Sync {
    fn encode(&self, payload: &GroupPayload) -> Result<String>;
    fn decode(&self, raw: &str) -> Result<GroupPayload>;
}

/// JSON object codec, the default
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGroupCodec;

impl GroupCodec for JsonGroupCodec {
    fn encode(&self, payload: &GroupPayload) -> Result<String> {
        serde_json::to_string(payload).context("Failed to encode translation group payload")
    }

    fn decode(&self, raw: &str) -> Result<GroupPayload> {
        if raw.trim().is_empty() {
            return Ok(GroupPayload::new());
        }
        serde_json::from_str(raw).context("Failed to decode translation group payload")
    }
}
