//! Container name sanitization and lifetime validation.
//!
//! Container names are derived from caller-supplied identifying strings and
//! must be safe to hand to the engine; lifetimes are bounded so a mistyped
//! request cannot pin a container for years.

use std::sync::LazyLock;

use regex::Regex;

use super::{OrchestratorError, Result};

/// Maximum permitted container lifetime in seconds (roughly six months).
pub const MAX_TIME_ALIVE_SECS: i64 = 15_552_000;

/// Everything outside the engine-safe name alphabet.
static UNSAFE_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("valid literal pattern"));

/// Sanitize a string for use as a container name.
///
/// Every character outside `[A-Za-z0-9_-]` is replaced with an underscore;
/// length is preserved. Two requests with identical identifying strings
/// therefore derive the same name and will clash at the engine, which is the
/// intended arbitration point.
///
/// # Errors
///
/// Returns [`OrchestratorError::InvalidInput`] if the input is empty.
pub fn sanitize_container_name(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(OrchestratorError::InvalidInput(
            "container name cannot be empty".to_string(),
        ));
    }

    Ok(UNSAFE_NAME_CHARS.replace_all(raw, "_").into_owned())
}

/// Validate a requested container lifetime in seconds.
///
/// Pure validation: the value is returned unchanged, never clamped.
///
/// # Errors
///
/// Returns [`OrchestratorError::InvalidInput`] if `requested` is not positive
/// or exceeds `max`.
pub fn validate_time_alive(requested: i64, max: i64) -> Result<i64> {
    if requested <= 0 || requested > max {
        return Err(OrchestratorError::InvalidInput(format!(
            "time_alive must be between 1 and {max} seconds, got {requested}"
        )));
    }

    Ok(requested)
}
