//! Tracing conventions for fairdisk.
//!
//! The crate emits structured `tracing` events but never installs a
//! subscriber; consumers bring their own. This module centralises the event
//! targets and log-level plumbing so subscribers, dashboards, and tests can
//! filter fairdisk output consistently.
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=fairdisk=debug
//! ```

use tracing::Level;

/// Target prefix used by all fairdisk tracing events.
pub const TARGET_PREFIX: &str = "fairdisk";

/// Canonical event targets used across the crate.
///
/// Using fixed targets lets consumers filter one subsystem (for example the
/// lock protocol alone) without string matching on messages.
pub mod targets {
    /// Lock protocol: grants, rejects, releases, cancels, shutdown.
    pub const LOCK: &str = "fairdisk.lock";
    /// Store I/O: bounds and alignment rejects.
    pub const STORE: &str = "fairdisk.store";
    /// Registry and session lifecycle.
    pub const REGISTRY: &str = "fairdisk.registry";
}

/// Parse a log level string (case-insensitive).
///
/// Recognized values: `trace`, `debug`, `info`, `warn`, `error`.
/// Returns `None` for unrecognized strings.
#[must_use]
pub fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Returns the recommended `tracing::Level` for the given environment.
///
/// Checks `FAIRDISK_LOG_LEVEL` first, then falls back to the provided
/// default.
#[must_use]
pub fn level_from_env(default: Level) -> Level {
    std::env::var("FAIRDISK_LOG_LEVEL")
        .ok()
        .and_then(|s| parse_level(&s))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_prefix_is_fairdisk() {
        assert_eq!(TARGET_PREFIX, "fairdisk");
    }

    #[test]
    fn all_targets_start_with_prefix() {
        for target in [targets::LOCK, targets::STORE, targets::REGISTRY] {
            assert!(
                target.starts_with(&format!("{TARGET_PREFIX}.")),
                "target {target:?} must start with \"{TARGET_PREFIX}.\"",
            );
        }
    }

    #[test]
    fn parse_level_recognizes_valid_levels() {
        assert_eq!(parse_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level("info"), Some(Level::INFO));
        assert_eq!(parse_level("warn"), Some(Level::WARN));
        assert_eq!(parse_level("error"), Some(Level::ERROR));
    }

    #[test]
    fn parse_level_case_insensitive() {
        assert_eq!(parse_level("TRACE"), Some(Level::TRACE));
        assert_eq!(parse_level("Debug"), Some(Level::DEBUG));
        assert_eq!(parse_level("WARN"), Some(Level::WARN));
    }

    #[test]
    fn parse_level_returns_none_for_invalid() {
        assert_eq!(parse_level("nonsense"), None);
        assert_eq!(parse_level(""), None);
        assert_eq!(parse_level(" info"), None);
    }

    #[test]
    fn level_from_env_uses_default_when_var_unset() {
        // A key that is never set validates the fallback path without
        // mutating the process environment.
        fn level_from_custom_key(key: &str, default: Level) -> Level {
            std::env::var(key)
                .ok()
                .and_then(|s| parse_level(&s))
                .unwrap_or(default)
        }
        let level = level_from_custom_key("FAIRDISK_NEVER_SET_54321", Level::WARN);
        assert_eq!(level, Level::WARN);
    }
}
