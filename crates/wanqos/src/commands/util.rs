//! Shared helpers for command handlers.

use std::io::IsTerminal;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal on stdin there is nobody to ask, so the operation
/// fails instead of hanging.
pub fn confirm(action: &str, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Parse a device id argument.
pub fn parse_device_id(raw: &str) -> Result<Uuid, CliError> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| CliError::validation("device id", format!("'{raw}' is not a UUID: {e}")))
}

/// `"3m 12s ago"`, rounded to whole seconds. Future timestamps read as
/// `"just now"`.
pub fn ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    match now.signed_duration_since(then).to_std() {
        Ok(d) if d.as_secs() > 0 => {
            let rounded = std::time::Duration::from_secs(d.as_secs());
            format!("{} ago", humantime::format_duration(rounded))
        }
        _ => "just now".into(),
    }
}
