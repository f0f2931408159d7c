/*!
 * Language value object.
 *
 * A `Language` is one logical aggregate over several backing nodes: the
 * primary node in the `language` namespace plus one mirrored node per
 * secondary namespace, all sharing slug and name.
 */

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::language_utils;
use crate::store::NodeId;

/// Metadata stored in the payload of a primary language node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageMeta {
    pub locale: String,
    #[serde(default)]
    pub rtl: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_code: Option<String>,
}

/// A configured language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Id of the primary node
    pub id: NodeId,
    pub slug: String,
    pub locale: String,
    pub name: String,
    /// Right-to-left script
    pub rtl: bool,
    /// Sort order, not unique
    pub order: i64,
    /// Flag code, e.g. `us`
    pub flag_code: Option<String>,
    /// Derived from the options' default language
    pub is_default: bool,
    /// namespace -> node id, primary namespace included
    pub node_ids: BTreeMap<String, NodeId>,
    /// namespace -> denormalized number of tagged objects
    pub counts: BTreeMap<String, u64>,
}

impl Language {
    /// Node id of this language in a namespace
    pub fn node_id(&self, namespace: &str) -> Option<NodeId> {
        self.node_ids.get(namespace).copied()
    }

    /// Number of objects tagged in a namespace, as of the last count refresh
    pub fn count(&self, namespace: &str) -> u64 {
        self.counts.get(namespace).copied().unwrap_or(0)
    }

    /// Total tagged objects over every namespace
    pub fn total_count(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Locale in W3C form, e.g. `pt-BR`
    pub fn w3c(&self) -> String {
        language_utils::locale_to_w3c(&self.locale)
    }

    /// Metadata as persisted in the primary node payload
    pub fn meta(&self) -> LanguageMeta {
        LanguageMeta {
            locale: self.locale.clone(),
            rtl: self.rtl,
            flag_code: self.flag_code.clone(),
        }
    }

    /// Project one field as a string
    pub fn field(&self, field: LanguageField) -> String {
        match field {
            LanguageField::Id => self.id.to_string(),
            LanguageField::Slug => self.slug.clone(),
            LanguageField::Locale => self.locale.clone(),
            LanguageField::Name => self.name.clone(),
            LanguageField::W3c => self.w3c(),
            LanguageField::Order => self.order.to_string(),
            LanguageField::Flag => self.flag_code.clone().unwrap_or_default(),
            LanguageField::Rtl => self.rtl.to_string(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.slug, self.locale)
    }
}

/// Field a language list can be projected to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageField {
    Id,
    Slug,
    Locale,
    Name,
    W3c,
    Order,
    Flag,
    Rtl,
}

impl std::str::FromStr for LanguageField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" | "term_id" => Ok(Self::Id),
            "slug" => Ok(Self::Slug),
            "locale" => Ok(Self::Locale),
            "name" => Ok(Self::Name),
            "w3c" => Ok(Self::W3c),
            "order" | "term_group" => Ok(Self::Order),
            "flag" | "flag_code" => Ok(Self::Flag),
            "rtl" | "is_rtl" => Ok(Self::Rtl),
            _ => Err(anyhow::anyhow!("Invalid language field: {}", s)),
        }
    }
}

/// Identifier accepted by `Registry::get`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageKey {
    /// Primary node id
    Id(NodeId),
    /// Slug or locale
    Code(String),
    /// Node id in a given namespace
    Node { namespace: String, id: NodeId },
}

impl LanguageKey {
    /// Key under which the registry's reverse index stores this identifier
    pub fn index_key(&self) -> String {
        match self {
            Self::Id(id) => id.to_string(),
            Self::Code(code) => code.clone(),
            Self::Node { namespace, id } => format!("{}:{}", namespace, id),
        }
    }
}

impl From<NodeId> for LanguageKey {
    fn from(id: NodeId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for LanguageKey {
    fn from(code: &str) -> Self {
        Self::Code(code.to_string())
    }
}

impl From<&String> for LanguageKey {
    fn from(code: &String) -> Self {
        Self::Code(code.clone())
    }
}

impl From<String> for LanguageKey {
    fn from(code: String) -> Self {
        Self::Code(code)
    }
}

impl From<&Language> for LanguageKey {
    fn from(language: &Language) -> Self {
        Self::Id(language.id)
    }
}

/// Arguments of `Registry::add` and `Registry::update`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageArgs {
    pub name: String,
    pub slug: String,
    pub locale: String,
    #[serde(default)]
    pub rtl: bool,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub flag_code: Option<String>,
}

impl LanguageArgs {
    pub fn new(slug: impl Into<String>, locale: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            locale: locale.into(),
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_rtl(mut self, rtl: bool) -> Self {
        self.rtl = rtl;
        self
    }

    pub fn with_flag(mut self, flag_code: impl Into<String>) -> Self {
        self.flag_code = Some(flag_code.into());
        self
    }

    /// Prefill arguments from the predefined catalogue, falling back to
    /// ISO 639 names for unknown locales
    pub fn from_locale(locale: &str) -> Self {
        if let Some(entry) = catalog::find(locale) {
            return Self {
                name: entry.name.to_string(),
                slug: entry.slug.to_string(),
                locale: entry.locale.to_string(),
                rtl: entry.rtl,
                order: 0,
                flag_code: Some(entry.flag.to_string()),
            };
        }

        let name = language_utils::get_native_name(locale)
            .or_else(|| language_utils::get_language_name(locale).ok())
            .unwrap_or_default();
        Self::new(language_utils::language_part(locale).to_lowercase(), locale, name)
    }

    /// Arguments that recreate an existing language
    pub fn from_language(language: &Language) -> Self {
        Self {
            name: language.name.clone(),
            slug: language.slug.clone(),
            locale: language.locale.clone(),
            rtl: language.rtl,
            order: language.order,
            flag_code: language.flag_code.clone(),
        }
    }
}
