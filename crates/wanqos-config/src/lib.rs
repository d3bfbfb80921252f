//! Shared configuration for the wanqos command-line front end.
//!
//! A TOML file layered with `WANQOS_*` environment variables, and the
//! translation to `wanqos_core::RegistryConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wanqos_core::{MAX_CLASS_EXT_ID, RegistryConfig, StoreBackend};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub allocator: AllocatorSection,

    #[serde(default)]
    pub liveness: LivenessSection,

    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreSection {
    /// `"sqlite"` or `"memory"`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Database file. Falls back to [`default_db_path`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AllocatorSection {
    /// High-water mark used when no class has been persisted yet.
    #[serde(default = "default_floor")]
    pub floor: u32,
}

impl Default for AllocatorSection {
    fn default() -> Self {
        Self {
            floor: default_floor(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LivenessSection {
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl Default for LivenessSection {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_backend() -> String {
    "sqlite".into()
}
fn default_floor() -> u32 {
    wanqos_core::DEFAULT_EXT_ID_FLOOR
}
fn default_stale_after_secs() -> u64 {
    wanqos_core::DEFAULT_STALE_AFTER.as_secs()
}
fn default_output() -> String {
    "table".into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "wanqos", "wanqos")
}

fn home_fallback(leaf: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(leaf);
    p.push("wanqos");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the SQLite database lives when `[store] path` is unset.
pub fn default_db_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share").join("wanqos.db"),
        |dirs| dirs.data_dir().join("wanqos.db"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load the full Config: defaults, then the TOML file (`path` or
/// [`config_path`]), then `WANQOS_*` environment variables.
///
/// Nested keys use a double underscore: `WANQOS_STORE__BACKEND=memory`.
/// A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("WANQOS_").split("__"));

    Ok(figment.extract()?)
}

/// Render a config as pretty TOML.
pub fn render_config(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

// ── Translation ─────────────────────────────────────────────────────

/// Validate `cfg` and build the core's `RegistryConfig`.
///
/// `db_override` wins over `[store] path` for the SQLite backend.
pub fn to_registry_config(
    cfg: &Config,
    db_override: Option<PathBuf>,
) -> Result<RegistryConfig, ConfigError> {
    let backend = match cfg.store.backend.to_ascii_lowercase().as_str() {
        "memory" => StoreBackend::Memory,
        "sqlite" => StoreBackend::Sqlite(
            db_override
                .or_else(|| cfg.store.path.clone())
                .unwrap_or_else(default_db_path),
        ),
        other => {
            return Err(invalid(
                "store.backend",
                format!("expected 'sqlite' or 'memory', got '{other}'"),
            ));
        }
    };

    let floor = cfg.allocator.floor;
    if floor <= 1 || floor >= MAX_CLASS_EXT_ID {
        return Err(invalid(
            "allocator.floor",
            format!("must be between 2 and {}, got {floor}", MAX_CLASS_EXT_ID - 1),
        ));
    }

    if cfg.liveness.stale_after_secs == 0 {
        return Err(invalid("liveness.stale_after_secs", "must be positive"));
    }

    Ok(RegistryConfig {
        backend,
        ext_id_floor: floor,
        stale_after: Duration::from_secs(cfg.liveness.stale_after_secs),
    })
}
