/*!
 * # polylink - language registry and translation linking
 *
 * Answers "what language is this object in?" and "what are its
 * counterparts in other languages?" for a multilingual content store,
 * staying consistent under concurrent edits and cheap to query many times
 * per request.
 *
 * ## Features
 *
 * - Language registry with add/update/delete/default and a two-tier cache
 * - Staleness detection against the backing store on every list read
 * - Composable language list filters (proxy chain)
 * - Per-object language attachment with batched, token-invalidated reads
 * - Translation groups with validate-on-read self-healing
 * - Mass assignment of languages and translation groups
 * - In-memory and SQLite backing stores
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `registry`: the language registry:
 *   - `registry::state`: list cache state machine
 *   - `registry::validation`: language argument validation
 *   - `registry::proxy`: named list filters
 *   - `registry::collaborators`: routing, user preferences and flags
 * - `objects`: translatable and translated objects, query fragments
 * - `store`: backing store trait, group codec, memory and SQLite adapters
 * - `cache`: process-local cache, persistent tier and staleness tokens
 * - `options`: options store consumed by the registry
 * - `language`: the `Language` value object and its arguments
 * - `language_utils`: slug/locale grammar and ISO language names
 * - `catalog`: predefined languages and bundled flags
 * - `app_config`: configuration of the admin binary
 * - `errors`: custom error types
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod cache;
pub mod catalog;
pub mod errors;
pub mod language;
pub mod language_utils;
pub mod objects;
pub mod options;
pub mod registry;
pub mod store;

// Re-export main types for easier usage
pub use app_config::Config;
pub use cache::{CacheLayer, LocalCache, MemoryPersistentCache, PersistentCache};
pub use errors::{RegistryError, TranslationError, ValidationError, ValidationErrors};
pub use language::{Language, LanguageArgs, LanguageField, LanguageKey};
pub use objects::{MassReport, ObjectType, TranslatableObject, TranslatedObject, Translations};
pub use options::{JsonOptionsStore, MemoryOptionsStore, Options, OptionsStore};
pub use registry::{ListArgs, Registry};
pub use store::{BackingStore, MemoryStore, SqliteStore};
