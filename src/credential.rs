//! Credential normalization.
//!
//! Callers hand over either a bare session token or an already-formed cookie
//! header fragment. Everything downstream works with the fragment form, so the
//! normalization happens exactly once at the pipeline entry.

/// Cookie name the remote API expects the session token under.
pub const SESSION_COOKIE: &str = "sessionKey";

/// Number of leading characters surfaced by [`redact`].
const REDACT_PREFIX_LEN: usize = 8;

/// Normalize a raw credential into a cookie header fragment.
///
/// A bare token (no `;`, at most one `=`, not already prefixed with
/// `sessionKey=`) is wrapped as `sessionKey=<token>`. Anything else is assumed
/// to be a complete fragment and passed through trimmed. Idempotent.
pub fn format_cookie(raw: &str) -> String {
    let trimmed = raw.trim();
    let looks_bare = !trimmed.contains(';')
        && trimmed.matches('=').count() <= 1
        && !trimmed.starts_with("sessionKey=");

    if looks_bare {
        format!("{SESSION_COOKIE}={trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// Bounded credential prefix for diagnostics. Never logs the full secret.
pub fn redact(credential: &str) -> String {
    let trimmed = credential.trim();
    if trimmed.chars().count() <= REDACT_PREFIX_LEN {
        return "…".to_string();
    }
    let prefix: String = trimmed.chars().take(REDACT_PREFIX_LEN).collect();
    format!("{prefix}…")
}
