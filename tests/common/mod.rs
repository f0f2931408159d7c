/*!
 * Common test utilities for the polylink test suite
 */

use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use polylink::cache::{CacheLayer, MemoryPersistentCache};
use polylink::language::LanguageArgs;
use polylink::objects::{ObjectType, TranslatedObject};
use polylink::options::{MemoryOptionsStore, Options};
use polylink::registry::Registry;
use polylink::store::{BackingStore, DatabaseConnection, MemoryStore, ObjectId, SqliteStore};
use polylink::{JsonOptionsStore, Language};

/// Enables log output for a test run when RUST_LOG is set
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// In-memory store, options and persistent tier shared by any number of
/// registries, each registry playing one request
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub options: Arc<MemoryOptionsStore>,
    pub persistent: MemoryPersistentCache,
    pub registry: Arc<Registry>,
}

impl Fixture {
    pub fn new() -> Self {
        init_logging();
        let store = Arc::new(MemoryStore::new());
        let options = Arc::new(MemoryOptionsStore::new(Options::default()));
        let persistent = MemoryPersistentCache::new();
        let registry = Arc::new(Registry::new(
            store.clone(),
            options.clone(),
            CacheLayer::new(Arc::new(persistent.clone())),
        ));
        Self {
            store,
            options,
            persistent,
            registry,
        }
    }

    /// Fixture with English (default), French and German
    pub fn with_languages() -> Self {
        let fixture = Self::new();
        fixture.add("en", "en_US", "English");
        fixture.add("fr", "fr_FR", "Français");
        fixture.add("de", "de_DE", "Deutsch");
        fixture
    }

    pub fn add(&self, slug: &str, locale: &str, name: &str) -> Language {
        self.registry
            .add(LanguageArgs::new(slug, locale, name))
            .expect("language should be added")
    }

    /// A fresh registry over the same store, options and persistent tier
    pub fn next_request(&self) -> Arc<Registry> {
        self.next_request_with(|registry| registry)
    }

    /// Like `next_request`, with collaborators swapped by `configure`
    pub fn next_request_with(&self, configure: impl FnOnce(Registry) -> Registry) -> Arc<Registry> {
        Arc::new(configure(Registry::new(
            self.store.clone(),
            self.options.clone(),
            CacheLayer::new(Arc::new(self.persistent.clone())),
        )))
    }

    pub fn posts(&self) -> TranslatedObject {
        TranslatedObject::new(self.registry.clone(), ObjectType::post())
    }

    pub fn terms(&self) -> TranslatedObject {
        TranslatedObject::new(self.registry.clone(), ObjectType::term())
    }

    /// Create an object of `kind`, optionally tagged with a language
    pub fn new_object(&self, objects: &TranslatedObject, language: Option<&str>) -> ObjectId {
        let id = self
            .store
            .insert_object(&objects.object_type().kind)
            .expect("object should be created");
        objects
            .translatable()
            .invalidate()
            .expect("caches should be invalidated");
        if let Some(slug) = language {
            objects
                .set_language(id, Some(slug.into()))
                .expect("language should be set");
        }
        id
    }
}

/// Registry over a SQLite database and a JSON options file in a temp dir
pub struct SqliteFixture {
    pub dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub registry: Arc<Registry>,
}

impl SqliteFixture {
    pub fn new() -> Result<Self> {
        init_logging();
        let dir = TempDir::new()?;
        let store = Arc::new(SqliteStore::new(DatabaseConnection::new(
            dir.path().join("polylink.db"),
        )?));
        let registry = Arc::new(Registry::new(
            store.clone(),
            Arc::new(JsonOptionsStore::new(dir.path().join("options.json"))),
            CacheLayer::new(store.clone()),
        ));
        Ok(Self {
            dir,
            store,
            registry,
        })
    }

    /// A fresh registry over the same database and options file
    pub fn next_request(&self) -> Arc<Registry> {
        Arc::new(Registry::new(
            self.store.clone(),
            Arc::new(JsonOptionsStore::new(self.dir.path().join("options.json"))),
            CacheLayer::new(self.store.clone()),
        ))
    }
}
