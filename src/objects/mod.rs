/*!
 * Content objects carrying languages.
 *
 * - `translatable`: attaches one language to an object
 * - `translated`: links objects of different languages into translation groups
 * - `query`: language-scoped query fragments
 */

pub mod query;
pub mod translatable;
pub mod translated;

use serde::{Deserialize, Serialize};

pub use query::LanguageClause;
pub use translatable::TranslatableObject;
pub use translated::{
    AllowAllPermissions, MassReport, Permissions, SyncCheck, TranslatedObject, Translations,
};

/// Namespace of the primary language nodes
pub const LANGUAGE_NAMESPACE: &str = "language";

/// Secondary language namespace used by terms
pub const TERM_LANGUAGE_NAMESPACE: &str = "term_language";

/// A kind of content object and the namespaces it uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectType {
    /// Object kind, e.g. `post`
    pub kind: String,
    /// Namespace linking objects to their language node
    pub language_namespace: String,
    /// Namespace linking objects to their translation group node
    pub translations_namespace: String,
}

impl ObjectType {
    pub fn new(
        kind: impl Into<String>,
        language_namespace: impl Into<String>,
        translations_namespace: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            language_namespace: language_namespace.into(),
            translations_namespace: translations_namespace.into(),
        }
    }

    /// Posts: primary language namespace
    pub fn post() -> Self {
        Self::new("post", LANGUAGE_NAMESPACE, "post_translations")
    }

    /// Terms: secondary language namespace
    pub fn term() -> Self {
        Self::new("term", TERM_LANGUAGE_NAMESPACE, "term_translations")
    }

    /// Object types registered when none are configured
    pub fn defaults() -> Vec<Self> {
        vec![Self::post(), Self::term()]
    }

    /// Staleness token group of batched reads for this kind
    pub fn cache_group(&self) -> String {
        format!("objects:{}", self.kind)
    }
}
