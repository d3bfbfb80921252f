// ── Core error types ──
//
// The kinds the translation layer maps onto request failures. Storage
// failures are wrapped, never retried here.

use thiserror::Error;

use crate::store::StoreError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Unknown device: no connect notification seen for host {host}")]
    UnknownDevice { host: String },

    // ── Request errors ───────────────────────────────────────────────
    #[error("Invalid {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("Conflict: {entity_type} {identifier} already exists")]
    Conflict {
        entity_type: String,
        identifier: String,
    },

    // ── Allocation errors ────────────────────────────────────────────
    #[error("Class id space exhausted (limit {limit})")]
    Exhausted { limit: u32 },

    // ── Storage errors ───────────────────────────────────────────────
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl CoreError {
    pub(crate) fn not_found(entity_type: &str, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── Conversion from storage errors ───────────────────────────────────

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { entity, detail } => CoreError::Conflict {
                entity_type: entity,
                identifier: detail,
            },
            other => CoreError::Store(other),
        }
    }
}
