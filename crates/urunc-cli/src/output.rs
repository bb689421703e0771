//! Output helpers for CLI commands.

use serde::Serialize;

/// Renders `value` as indented JSON.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
