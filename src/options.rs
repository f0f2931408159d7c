/*!
 * Options store consumed by the registry.
 *
 * Holds the settings keyed by language slug that must follow language
 * renames and deletions: the default language, navigation menu locations,
 * the domain map and per-widget language filters.
 */

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Menu ids per language slug, for one navigation location
pub type MenuBySlug = BTreeMap<String, u64>;

/// Persisted engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Options {
    /// Slug of the default language, empty when none
    #[serde(default)]
    pub default_lang: String,

    /// Whether the language list is kept in the persistent cache tier
    #[serde(default = "default_true")]
    pub cache_languages: bool,

    /// Whether the default language is hidden from public URLs
    #[serde(default)]
    pub hide_default: bool,

    /// theme -> location -> slug -> menu id
    #[serde(default)]
    pub nav_menus: BTreeMap<String, BTreeMap<String, MenuBySlug>>,

    /// theme -> location -> menu id shown for the default language
    #[serde(default)]
    pub theme_locations: BTreeMap<String, BTreeMap<String, u64>>,

    /// slug -> home URL for the language
    #[serde(default)]
    pub domains: BTreeMap<String, String>,

    /// widget id -> slug of the only language the widget shows in
    #[serde(default)]
    pub widget_languages: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl Default for Options {
    fn default() -> Self {
        Self {
            default_lang: String::new(),
            cache_languages: true,
            hide_default: false,
            nav_menus: BTreeMap::new(),
            theme_locations: BTreeMap::new(),
            domains: BTreeMap::new(),
            widget_languages: BTreeMap::new(),
        }
    }
}

impl Options {
    /// Default language slug, if one is set
    pub fn default_language(&self) -> Option<&str> {
        if self.default_lang.is_empty() {
            None
        } else {
            Some(&self.default_lang)
        }
    }

    /// Move every slug-keyed setting from `old` to `new`
    pub fn rename_language(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }

        for locations in self.nav_menus.values_mut() {
            for menus in locations.values_mut() {
                if let Some(menu) = menus.remove(old) {
                    menus.insert(new.to_string(), menu);
                }
            }
        }

        if let Some(url) = self.domains.remove(old) {
            self.domains.insert(new.to_string(), url);
        }

        for slug in self.widget_languages.values_mut() {
            if slug == old {
                *slug = new.to_string();
            }
        }

        if self.default_lang == old {
            self.default_lang = new.to_string();
        }
    }

    /// Drop every slug-keyed setting of a deleted language
    pub fn remove_language(&mut self, slug: &str) {
        for locations in self.nav_menus.values_mut() {
            for menus in locations.values_mut() {
                menus.remove(slug);
            }
        }
        self.domains.remove(slug);
        self.widget_languages.retain(|_, s| s != slug);
        if self.default_lang == slug {
            self.default_lang.clear();
        }
    }

    /// Point every theme location at the menu assigned to `slug`
    pub fn remap_theme_locations(&mut self, slug: &str) {
        for (theme, locations) in &self.nav_menus {
            let theme_locations = self.theme_locations.entry(theme.clone()).or_default();
            for (location, menus) in locations {
                match menus.get(slug) {
                    Some(menu) => {
                        theme_locations.insert(location.clone(), *menu);
                    }
                    None => {
                        theme_locations.remove(location);
                    }
                }
            }
        }
    }
}

/// Read/write access to the persisted options
pub trait OptionsStore: Send + Sync {
    fn load(&self) -> Result<Options>;
    fn save(&self, options: &Options) -> Result<()>;

    /// Load, apply `f`, save
    fn update(&self, f: &mut dyn FnMut(&mut Options)) -> Result<Options> {
        let mut options = self.load()?;
        f(&mut options);
        self.save(&options)?;
        Ok(options)
    }
}

/// Options kept in memory
#[derive(Default)]
pub struct MemoryOptionsStore {
    options: RwLock<Options>,
}

impl MemoryOptionsStore {
    pub fn new(options: Options) -> Self {
        Self {
            options: RwLock::new(options),
        }
    }
}

impl OptionsStore for MemoryOptionsStore {
    fn load(&self) -> Result<Options> {
        Ok(self.options.read().clone())
    }

    fn save(&self, options: &Options) -> Result<()> {
        *self.options.write() = options.clone();
        Ok(())
    }
}

/// Options persisted as a pretty-printed JSON file
pub struct JsonOptionsStore {
    path: PathBuf,
}

impl JsonOptionsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OptionsStore for JsonOptionsStore {
    fn load(&self) -> Result<Options> {
        if !self.path.exists() {
            debug!("Options file {:?} not found, using defaults", self.path);
            return Ok(Options::default());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open options file: {:?}", self.path))?;
        let options = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse options file: {:?}", self.path))?;
        Ok(options)
    }

    fn save(&self, options: &Options) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
        }

        let json = serde_json::to_string_pretty(options).context("Failed to serialize options")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write options file: {:?}", self.path))
    }
}
