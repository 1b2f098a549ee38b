//! Configuration for warcdb.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags (applied by the CLI)
//! 2. Environment variables (WARCDB_DB)
//! 3. Project config file (.warcdb/config.yaml)
//! 4. User config file (<config dir>/warcdb/config.yaml)
//! 5. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .warcdb/config.yaml
//! - Paths in a project config file are relative to the project root
//!   (the parent of .warcdb/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::engine::IngestOptions;
use crate::store::{StoreSettings, SynchronousMode};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Environment variable naming the database file
pub const DB_ENV: &str = "WARCDB_DB";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    /// Database file (relative to the project root)
    pub database: Option<String>,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub sqlite: SqliteConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportConfig {
    pub allow_existing: Option<bool>,
    pub vacuum: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqliteConfig {
    pub busy_timeout_seconds: Option<u64>,
    pub synchronous: Option<SynchronousMode>,
    pub page_size: Option<u32>,
    pub cache_size_kib: Option<u32>,
    pub mmap_size_bytes: Option<u64>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Database file, if configured anywhere
    pub database: Option<PathBuf>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub ingest: IngestOptions,
    pub store: StoreSettings,
}

impl ResolvedConfig {
    /// Pick the database: explicit flag first, then configuration
    pub fn database_or(&self, flag: Option<PathBuf>) -> Result<PathBuf> {
        flag.or_else(|| self.database.clone()).with_context(|| {
            format!(
                "No database given. Use --db <path>, set {}, or add `database:` to .warcdb/config.yaml",
                DB_ENV
            )
        })
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".warcdb").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let user_config = dirs::config_dir()?.join("warcdb").join("config.yaml");
    user_config.exists().then_some(user_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Merge a parsed config file over the defaults
fn resolve(config: Option<(&Path, ConfigFile)>, env_db: Option<String>) -> ResolvedConfig {
    let defaults = StoreSettings::default();
    let ingest_defaults = IngestOptions::default();

    let (config_file, file) = match config {
        Some((path, file)) => (Some(path.to_path_buf()), Some(file)),
        None => (None, None),
    };

    let file_database = match (&config_file, &file) {
        (Some(path), Some(file)) => file.database.as_deref().map(|db| {
            // Project root is the parent of .warcdb/ (grandparent of config.yaml)
            let base_dir = path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(Path::new("."));
            resolve_path(base_dir, db)
        }),
        _ => None,
    };

    let database = env_db.map(PathBuf::from).or(file_database);

    let import = file.as_ref().map(|f| f.import.clone()).unwrap_or_default();
    let sqlite = file.map(|f| f.sqlite).unwrap_or_default();

    ResolvedConfig {
        database,
        config_file,
        ingest: IngestOptions {
            skip_existing: import.allow_existing.unwrap_or(ingest_defaults.skip_existing),
            vacuum: import.vacuum.unwrap_or(ingest_defaults.vacuum),
        },
        store: StoreSettings {
            busy_timeout: sqlite
                .busy_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.busy_timeout),
            synchronous: sqlite.synchronous.unwrap_or(defaults.synchronous),
            page_size: sqlite.page_size.unwrap_or(defaults.page_size),
            cache_size_kib: sqlite.cache_size_kib.unwrap_or(defaults.cache_size_kib),
            mmap_size_bytes: sqlite.mmap_size_bytes.unwrap_or(defaults.mmap_size_bytes),
        },
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let env_db = std::env::var(DB_ENV).ok().filter(|v| !v.is_empty());

    match find_config_file() {
        Some(path) => {
            let file = load_config_file(&path)?;
            Ok(resolve(Some((&path, file)), env_db))
        }
        None => Ok(resolve(None, env_db)),
    }
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
