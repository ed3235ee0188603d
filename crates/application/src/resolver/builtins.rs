//! Dynamic built-in variables
//!
//! References prefixed with `$` resolve without a store entry and
//! produce a fresh value on every reference.

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

/// Resolves a built-in reference name (including its `$` prefix) to a
/// freshly generated value. Returns `None` for unknown names, which are
/// then treated like any other undefined variable.
#[must_use]
pub fn resolve_builtin(name: &str) -> Option<String> {
    match name {
        "$guid" => Some(Uuid::new_v4().to_string()),
        "$timestamp" => Some(Utc::now().timestamp().to_string()),
        "$isoTimestamp" => Some(Utc::now().to_rfc3339()),
        "$randomInt" => {
            let mut rng = rand::rng();
            Some(rng.random_range(0..=1000).to_string())
        }
        _ => None,
    }
}

/// Returns true if the name (with `$` prefix) is a known built-in.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    matches!(name, "$guid" | "$timestamp" | "$isoTimestamp" | "$randomInt")
}
