// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use polylink::app_config::{Config, LogLevel};
use polylink::language::{LanguageArgs, LanguageField};
use polylink::objects::{TranslatedObject, Translations};
use polylink::registry::{DefaultFlagResolver, ListArgs, Registry};
use polylink::store::{BackingStore, DatabaseConnection, ObjectId, SqliteStore};
use polylink::{CacheLayer, JsonOptionsStore, Language};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured languages
    Languages {
        /// Hide languages without content
        #[arg(long)]
        hide_empty: bool,

        /// Hide the default language
        #[arg(long)]
        hide_default: bool,

        /// Print one field per language (id, slug, locale, name, w3c, flag, order)
        #[arg(long)]
        field: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Add a language, filling defaults from the catalogue
    Add {
        /// Locale, e.g. 'fr_FR'
        locale: String,

        /// Language code used in URLs
        #[arg(long)]
        slug: Option<String>,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Right-to-left script
        #[arg(long)]
        rtl: bool,

        /// Position in the language list
        #[arg(long, default_value_t = 0)]
        order: i64,

        /// Flag code
        #[arg(long)]
        flag: Option<String>,
    },

    /// Update a language
    Update {
        /// Language id, slug or locale
        language: String,

        #[arg(long)]
        slug: Option<String>,

        #[arg(long)]
        locale: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        rtl: Option<bool>,

        #[arg(long)]
        order: Option<i64>,

        /// Flag code, empty to remove
        #[arg(long)]
        flag: Option<String>,
    },

    /// Delete a language
    Delete {
        /// Language id, slug or locale
        language: String,
    },

    /// Set the default language
    SetDefault {
        /// Language slug
        slug: String,
    },

    /// Attach a language to objects
    Assign {
        /// Language id, slug or locale
        language: String,

        /// Object ids
        ids: Vec<ObjectId>,

        /// Object kind
        #[arg(short, long, default_value = "post")]
        kind: String,

        /// Create this many new objects and assign them too
        #[arg(long, default_value_t = 0)]
        create: usize,
    },

    /// Link an object with its translations
    Link {
        /// Object id
        id: ObjectId,

        /// Translations as slug=id pairs
        #[arg(value_name = "SLUG=ID")]
        translations: Vec<String>,

        /// Object kind
        #[arg(short, long, default_value = "post")]
        kind: String,
    },

    /// Show the translations of an object
    Translations {
        /// Object id
        id: ObjectId,

        /// Object kind
        #[arg(short, long, default_value = "post")]
        kind: String,
    },

    /// List objects without a language
    Untranslated {
        /// Object kind
        #[arg(short, long, default_value = "post")]
        kind: String,

        /// Maximum number of ids, 0 for all
        #[arg(short, long, default_value_t = 0)]
        limit: usize,
    },

    /// Generate shell completions for polylink
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// polylink - language registry and translation linking
///
/// Manages the languages of a content store and links objects to their
/// translations.
#[derive(Parser, Debug)]
#[command(name = "polylink")]
#[command(version)]
#[command(about = "Language registry and translation linking")]
#[command(long_about = "polylink manages the languages of a multilingual content store and the translation groups linking its objects.

EXAMPLES:
    polylink add fr_FR                          # Add French from the catalogue
    polylink add en_GB --slug en --name British # Slug taken by en_US: stored as en_gb
    polylink languages --hide-empty             # Languages with content
    polylink assign fr 12 13 14                 # Tag posts 12-14 as French
    polylink link 12 en=7                       # Post 12 translates post 7
    polylink translations 12                    # Show the group of post 12
    polylink untranslated --limit 20            # Posts without a language
    polylink completions bash > polylink.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in polylink.json by default. If the file doesn't
    exist, a default one is created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "polylink.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// Writes timestamped, coloured lines to stderr
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} [{}] {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Verbosity is lowered or raised once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "polylink", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = load_or_create_config(&cli.config_path)?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone().into();
    }
    log::set_max_level(config.log_level.to_level_filter());

    config.validate().context("Configuration validation failed")?;

    let store = Arc::new(SqliteStore::new(DatabaseConnection::new(&config.database_path)?));
    let registry = Arc::new(
        Registry::new(
            store.clone(),
            Arc::new(JsonOptionsStore::new(&config.options_path)),
            CacheLayer::new(store.clone()),
        )
        .with_object_types(config.object_types.clone())
        .with_flag_resolver(Arc::new(DefaultFlagResolver::new(config.flags_dir.clone()))),
    );

    match cli.command {
        Commands::Languages {
            hide_empty,
            hide_default,
            field,
            json,
        } => {
            let args = ListArgs {
                hide_empty,
                hide_default,
            };
            if let Some(field) = field {
                let field: LanguageField = field.parse()?;
                for value in registry.get_field_list(&args, field)? {
                    println!("{}", value);
                }
            } else {
                let languages = registry.get_list(&args)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&languages)?);
                } else {
                    print_languages(&languages);
                }
            }
        }
        Commands::Add {
            locale,
            slug,
            name,
            rtl,
            order,
            flag,
        } => {
            let mut args = LanguageArgs::from_locale(&locale).with_order(order);
            if let Some(slug) = slug {
                args.slug = slug;
            }
            if let Some(name) = name {
                args.name = name;
            }
            if rtl {
                args.rtl = true;
            }
            if flag.is_some() {
                args.flag_code = flag;
            }
            let language = registry.add(args)?;
            info!("Added {} (id {})", language, language.id);
        }
        Commands::Update {
            language,
            slug,
            locale,
            name,
            rtl,
            order,
            flag,
        } => {
            let current = registry
                .get(language.as_str())?
                .ok_or_else(|| anyhow!("Unknown language: {}", language))?;
            let mut args = LanguageArgs::from_language(&current);
            if let Some(slug) = slug {
                args.slug = slug;
            }
            if let Some(locale) = locale {
                args.locale = locale;
            }
            if let Some(name) = name {
                args.name = name;
            }
            if let Some(rtl) = rtl {
                args.rtl = rtl;
            }
            if let Some(order) = order {
                args.order = order;
            }
            if let Some(flag) = flag {
                args.flag_code = Some(flag).filter(|f| !f.is_empty());
            }
            let updated = registry.update(current.id, args)?;
            info!("Updated {}", updated);
        }
        Commands::Delete { language } => {
            let current = registry
                .get(language.as_str())?
                .ok_or_else(|| anyhow!("Unknown language: {}", language))?;
            registry.delete(current.id)?;
        }
        Commands::SetDefault { slug } => {
            registry.update_default(&slug)?;
        }
        Commands::Assign {
            language,
            mut ids,
            kind,
            create,
        } => {
            let object_type = config.object_type(&kind)?.clone();
            for _ in 0..create {
                ids.push(store.insert_object(&kind)?);
            }
            if ids.is_empty() {
                warn!("No objects to assign");
                return Ok(());
            }
            let objects = TranslatedObject::new(registry.clone(), object_type);
            objects
                .translatable()
                .set_language_in_mass(&ids, language.as_str())?;
            println!("{}", join_ids(&ids));
        }
        Commands::Link {
            id,
            translations,
            kind,
        } => {
            let object_type = config.object_type(&kind)?.clone();
            let objects = TranslatedObject::new(registry.clone(), object_type);
            let wanted = parse_translations(&translations)?;
            let saved = objects.save_translations(id, &wanted)?;
            for (slug, oid) in &wanted {
                if saved.get(slug) != Some(oid) {
                    warn!("Ignored {}={}: object language does not match", slug, oid);
                }
            }
            print_translations(&saved);
        }
        Commands::Translations { id, kind } => {
            let object_type = config.object_type(&kind)?.clone();
            let objects = TranslatedObject::new(registry.clone(), object_type);
            match objects.get_language(id)? {
                Some(language) => info!("{} {} is in {}", kind, id, language),
                None => warn!("{} {} has no language", kind, id),
            }
            print_translations(&objects.get_translations(id)?);
        }
        Commands::Untranslated { kind, limit } => {
            let object_type = config.object_type(&kind)?.clone();
            let objects = TranslatedObject::new(registry.clone(), object_type);
            let ids = objects.translatable().get_objects_with_no_lang(limit)?;
            println!("{}", join_ids(&ids));
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        return Config::load(config_path);
    }

    warn!("Config file not found at '{}', creating default config.", config_path);
    let config = Config::default();
    config.save(config_path)?;
    Ok(config)
}

fn parse_translations(pairs: &[String]) -> Result<Translations> {
    let mut translations = Translations::new();
    for pair in pairs {
        let (slug, id) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected SLUG=ID, got '{}'", pair))?;
        let id: ObjectId = id
            .parse()
            .with_context(|| format!("Invalid object id in '{}'", pair))?;
        translations.insert(slug.to_string(), id);
    }
    Ok(translations)
}

fn print_languages(languages: &[Language]) {
    println!(
        "{:>4}  {:<8} {:<8} {:<24} {:>5}  {:>7}",
        "ID", "SLUG", "LOCALE", "NAME", "ORDER", "OBJECTS"
    );
    for language in languages {
        println!(
            "{:>4}  {:<8} {:<8} {:<24} {:>5}  {:>7}{}",
            language.id,
            language.slug,
            language.locale,
            language.name,
            language.order,
            language.total_count(),
            if language.is_default { "  (default)" } else { "" }
        );
    }
}

fn print_translations(translations: &Translations) {
    for (slug, id) in translations {
        println!("{}={}", slug, id);
    }
}

fn join_ids(ids: &[ObjectId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
