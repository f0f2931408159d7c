use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::objects::{LANGUAGE_NAMESPACE, ObjectType};

/// Application configuration module
/// This module handles the configuration of the admin binary: where the
/// store and the options live, custom flags and the registered object types.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// SQLite database holding languages, objects and links
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// JSON options file (default language, menus, domains)
    #[serde(default = "default_options_path")]
    pub options_path: PathBuf,

    /// Directory of custom flag images
    #[serde(default)]
    pub flags_dir: Option<PathBuf>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Object kinds carrying languages
    #[serde(default = "ObjectType::defaults")]
    pub object_types: Vec<ObjectType>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("polylink")
}

fn default_database_path() -> PathBuf {
    data_dir().join("polylink.db")
}

fn default_options_path() -> PathBuf {
    data_dir().join("options.json")
}

impl Config {
    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(anyhow!("Database path must not be empty"));
        }
        if self.options_path.as_os_str().is_empty() {
            return Err(anyhow!("Options path must not be empty"));
        }

        if let Some(dir) = &self.flags_dir {
            if !dir.is_dir() {
                return Err(anyhow!("Flags directory does not exist: {}", dir.display()));
            }
        }

        if self.object_types.is_empty() {
            return Err(anyhow!("At least one object type is required"));
        }

        let mut kinds = HashSet::new();
        for object_type in &self.object_types {
            if !kinds.insert(object_type.kind.as_str()) {
                return Err(anyhow!("Duplicate object type: {}", object_type.kind));
            }
            if object_type.language_namespace == object_type.translations_namespace {
                return Err(anyhow!(
                    "Object type {} uses one namespace for languages and translations",
                    object_type.kind
                ));
            }
        }

        if self.object_types[0].language_namespace != LANGUAGE_NAMESPACE {
            return Err(anyhow!(
                "The first object type must use the '{}' namespace",
                LANGUAGE_NAMESPACE
            ));
        }

        Ok(())
    }

    /// Object type of a kind
    pub fn object_type(&self, kind: &str) -> Result<&ObjectType> {
        self.object_types
            .iter()
            .find(|t| t.kind == kind)
            .ok_or_else(|| anyhow!("Unknown object type: {}", kind))
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: default_database_path(),
            options_path: default_options_path(),
            flags_dir: None,
            log_level: LogLevel::default(),
            object_types: ObjectType::defaults(),
        }
    }
}
