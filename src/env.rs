//! Environment variable names used by this crate for convenient
//! configuration from services.
//!
//! These are purely helpers; the core types never read the environment
//! on their own, only through explicit `from_env` constructors.

/// Enable user pseudonymization (`1`, `true`, `yes`, `on`).
pub const LOG_ENRICH_PSEUDONYMIZE_ENV: &str = "LOG_ENRICH_PSEUDONYMIZE";

/// Enable IP obfuscation (`1`, `true`, `yes`, `on`).
pub const LOG_ENRICH_OBFUSCATE_ENV: &str = "LOG_ENRICH_OBFUSCATE";

/// Sink DSN, e.g. `elasticcloud://host:9243/logs`.
pub const LOG_ENRICH_SINK_DSN_ENV: &str = "LOG_ENRICH_SINK_DSN";

/// Optional user for Elastic sinks.
pub const LOG_ENRICH_ELASTIC_USER_ENV: &str = "LOG_ENRICH_ELASTIC_USER";

/// Optional password for Elastic sinks.
pub const LOG_ENRICH_ELASTIC_PASSWORD_ENV: &str = "LOG_ENRICH_ELASTIC_PASSWORD";

/// Read an optional, non-empty environment variable.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Read a boolean switch; unset or unrecognised values are `false`.
pub fn env_flag(key: &str) -> bool {
    std::env::var(key).map(|v| parse_flag(&v)).unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        for on in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(parse_flag(on), "{on:?}");
        }
        for off in ["", "0", "false", "off", "enabled"] {
            assert!(!parse_flag(off), "{off:?}");
        }
    }

    #[test]
    fn test_env_opt_skips_empty() {
        let key = "LOG_ENRICH_TEST_ENV_OPT";
        std::env::set_var(key, "");
        assert_eq!(env_opt(key), None);
        std::env::set_var(key, "file:///tmp/x.jsonl");
        assert_eq!(env_opt(key).as_deref(), Some("file:///tmp/x.jsonl"));
        std::env::remove_var(key);
        assert_eq!(env_opt(key), None);
    }
}
