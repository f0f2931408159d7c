/*!
 * Error types for the polylink engine.
 *
 * Store, options and configuration boundaries return `anyhow::Result`.
 * The domain taxonomy lives here: validation errors are structured and
 * collected, not-found is expressed as `Option::None` by the callers.
 */

use std::fmt;

use thiserror::Error;

use crate::store::ObjectId;

/// A single blocking rule violated by language arguments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Locale is empty or does not follow the locale grammar
    #[error("Enter a valid WordPress-style locale (got '{0}')")]
    InvalidLocale(String),

    /// Slug is empty or does not follow the slug grammar
    #[error("The language code contains invalid characters (got '{0}')")]
    InvalidSlug(String),

    /// Name is empty once trimmed
    #[error("The language must have a name")]
    EmptyName,

    /// Another language already owns this exact (slug, locale) pair
    #[error("The language code must be unique ('{slug}' / '{locale}')")]
    NonUniqueSlug {
        /// Conflicting slug
        slug: String,
        /// Conflicting locale
        locale: String,
    },

    /// Flag code resolves neither to a bundled nor to a custom asset
    #[error("The flag does not exist ('{0}')")]
    InvalidFlag(String),
}

impl ValidationError {
    /// Stable machine-readable code for the violated rule
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidLocale(_) => "invalid_locale",
            Self::InvalidSlug(_) => "invalid_slug",
            Self::EmptyName => "invalid_name",
            Self::NonUniqueSlug { .. } => "non_unique_slug",
            Self::InvalidFlag(_) => "invalid_flag",
        }
    }
}

/// Every rule violated by one add/update call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the collected errors in detection order
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Whether a rule with the given code was violated
    pub fn contains_code(&self, code: &str) -> bool {
        self.0.iter().any(|e| e.code() == code)
    }

    /// Turn the collection into a `Result`, `Ok` when nothing was collected
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Errors raised by the language registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Arguments rejected, nothing was persisted
    #[error("Invalid language: {0}")]
    Validation(#[from] ValidationErrors),

    /// The language identifier did not resolve
    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    /// Failure reported by the backing store or the options store
    #[error("Storage error: {0}")]
    Store(#[from] anyhow::Error),
}

impl RegistryError {
    /// Validation errors carried by this error, if any
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Errors raised by translatable and translated objects
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The object carries no language, it cannot join a translation group
    #[error("Object {0} has no language")]
    NoLanguage(ObjectId),

    /// Error from the language registry
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Failure reported by the backing store
    #[error("Storage error: {0}")]
    Store(#[from] anyhow::Error),
}
