//! Configuration for questmap.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (QUESTMAP_HOME, QUESTMAP_SOURCE_URL, QUESTMAP_SOURCE_KEY)
//! 2. Config file (.questmap/config.yaml)
//! 3. Defaults (~/.questmap, one hour max age, English fallback)
//!
//! Config file discovery:
//! - Searches current directory and parents for .questmap/config.yaml
//! - A relative `home` is resolved against the config file's directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::RestConfig;
use crate::core::cache::{
    CacheSettings, DEFAULT_FALLBACK_LANGUAGE, DEFAULT_MAX_AGE, DEFAULT_STORAGE_KEY,
};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    /// State directory (relative to the config file's directory)
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub source: Option<SourceConfig>,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    pub max_age_seconds: Option<u64>,
    pub fallback_language: Option<String>,
    pub storage_key: Option<String>,
    pub default_language: Option<String>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to questmap home (durable cache lives here)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Remote source settings
    pub source: SourceSettings,
    /// Cache settings
    pub cache: CacheSettings,
    /// Language used when a command doesn't name one
    pub default_language: String,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ResolvedConfig {
    /// Directory holding durable snapshots
    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    /// REST source settings; fails if no URL is configured
    pub fn rest_config(&self) -> Result<RestConfig> {
        let url = self.source.url.clone().context(
            "No content source URL configured (set QUESTMAP_SOURCE_URL or source.url)",
        )?;

        Ok(RestConfig {
            url,
            api_key: self.source.api_key.clone(),
            request_timeout: self.source.request_timeout,
        })
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".questmap").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge file contents and environment overrides over the defaults
fn resolve(
    file: Option<(&Path, ConfigFile)>,
    env: impl Fn(&str) -> Option<String>,
    default_home: PathBuf,
) -> ResolvedConfig {
    let (config_file, parsed) = match file {
        Some((path, parsed)) => (Some(path.to_path_buf()), Some(parsed)),
        None => (None, None),
    };

    let home = if let Some(env_home) = env("QUESTMAP_HOME") {
        PathBuf::from(env_home)
    } else if let (Some(path), Some(home)) = (
        config_file.as_deref(),
        parsed.as_ref().and_then(|c| c.home.as_deref()),
    ) {
        let dir = path.parent().unwrap_or(Path::new("."));
        resolve_path(dir, home)
    } else {
        default_home
    };

    let source_file = parsed
        .as_ref()
        .and_then(|c| c.source.clone())
        .unwrap_or_default();
    let cache_file = parsed
        .as_ref()
        .and_then(|c| c.cache.clone())
        .unwrap_or_default();

    let source = SourceSettings {
        url: env("QUESTMAP_SOURCE_URL").or(source_file.url),
        api_key: env("QUESTMAP_SOURCE_KEY").or(source_file.api_key),
        request_timeout: source_file
            .request_timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or_else(|| SourceSettings::default().request_timeout),
    };

    let cache = CacheSettings {
        max_age: cache_file
            .max_age_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_MAX_AGE),
        fallback_language: cache_file
            .fallback_language
            .unwrap_or_else(|| DEFAULT_FALLBACK_LANGUAGE.to_string()),
        storage_key: cache_file
            .storage_key
            .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
    };

    let default_language = cache_file
        .default_language
        .unwrap_or_else(|| cache.fallback_language.clone());

    ResolvedConfig {
        home,
        config_file,
        source,
        cache,
        default_language,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".questmap");

    let config_path = find_config_file();
    let parsed = match &config_path {
        Some(path) => Some((path.as_path(), load_config_file(path)?)),
        None => None,
    };

    Ok(resolve(parsed, |key| std::env::var(key).ok(), default_home))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
