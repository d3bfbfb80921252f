//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use wanqos_config::ConfigError;
use wanqos_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const UNKNOWN_DEVICE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(wanqos::not_found),
        help("Run: wanqos {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(
        code(wanqos::conflict),
        help("Another writer got there first. Re-read the registry and retry if needed.")
    )]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    #[error("Device '{host}' has not connected")]
    #[diagnostic(
        code(wanqos::unknown_device),
        help(
            "A device must connect before it can heartbeat.\n\
             Run: wanqos devices connect --host {host} --lan-port <PORT> --wan-port <PORT>"
        )
    )]
    UnknownDevice { host: String },

    #[error("Class id space exhausted (limit {limit})")]
    #[diagnostic(
        code(wanqos::exhausted),
        help("Ids are never reused. Start a fresh database or lower [allocator] floor.")
    )]
    Exhausted { limit: u32 },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wanqos::validation))]
    Validation { field: String, reason: String },

    // ── Storage & configuration ──────────────────────────────────────

    #[error("Store error: {message}")]
    #[diagnostic(
        code(wanqos::store),
        help("Check that the database path is writable, or pass --db <PATH>.")
    )]
    Store { message: String },

    #[error(transparent)]
    #[diagnostic(
        code(wanqos::config),
        help("Run: wanqos config path to locate the file being read.")
    )]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(wanqos::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Agent ────────────────────────────────────────────────────────

    #[error("Agent task failed: {message}")]
    #[diagnostic(code(wanqos::agent))]
    Agent { message: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    #[diagnostic(code(wanqos::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML encoding failed: {0}")]
    #[diagnostic(code(wanqos::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::UnknownDevice { .. } => exit_code::UNKNOWN_DEVICE,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: match entity_type.as_str() {
                    "device" => "devices list".into(),
                    "class" => "classes list".into(),
                    other => format!("{other}s list"),
                },
                resource_type: entity_type,
                identifier,
            },

            CoreError::Conflict {
                entity_type,
                identifier,
            } => CliError::Conflict {
                resource_type: entity_type,
                identifier,
            },

            CoreError::UnknownDevice { host } => CliError::UnknownDevice { host },

            CoreError::InvalidArgument { field, reason } => CliError::Validation { field, reason },

            CoreError::Exhausted { limit } => CliError::Exhausted { limit },

            CoreError::Store(e) => CliError::Store {
                message: e.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}
