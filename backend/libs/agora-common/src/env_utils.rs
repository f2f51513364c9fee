//! Environment variable parsing helpers
//!
//! Missing variables fall back to a default. Present but unparsable values
//! are configuration mistakes and surface as errors naming the variable.

use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Read `key` and parse it, or return `default` when the variable is unset or blank.
///
/// # Example
/// ```ignore
/// let timeout_ms: u64 = env_or("CACHE_OP_TIMEOUT_MS", 500)?;
/// ```
pub fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid {}: {:?}", key, raw)),
        _ => Ok(default),
    }
}

/// Read `key` as a string, or `default` when unset.
pub fn env_string_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read `key` as a string, `None` when unset or blank.
pub fn env_optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Boolean flag accepting `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn env_flag(key: &str, default: bool) -> Result<bool> {
    match env_optional(key) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(anyhow!("Invalid {}: {:?} (expected a boolean)", key, raw)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_or_falls_back_when_unset() {
        std::env::remove_var("AGORA_TEST_PORT");
        let port: u16 = env_or("AGORA_TEST_PORT", 3000).unwrap();
        assert_eq!(port, 3000);
    }

    #[test]
    #[serial]
    fn env_or_parses_and_rejects() {
        std::env::set_var("AGORA_TEST_PORT", "8080");
        assert_eq!(env_or::<u16>("AGORA_TEST_PORT", 3000).unwrap(), 8080);

        std::env::set_var("AGORA_TEST_PORT", "eighty");
        let err = env_or::<u16>("AGORA_TEST_PORT", 3000).unwrap_err();
        assert!(err.to_string().contains("AGORA_TEST_PORT"));

        std::env::remove_var("AGORA_TEST_PORT");
    }

    #[test]
    #[serial]
    fn env_flag_accepts_common_spellings() {
        std::env::set_var("AGORA_TEST_FLAG", "Yes");
        assert!(env_flag("AGORA_TEST_FLAG", false).unwrap());
        std::env::set_var("AGORA_TEST_FLAG", "0");
        assert!(!env_flag("AGORA_TEST_FLAG", true).unwrap());
        std::env::set_var("AGORA_TEST_FLAG", "maybe");
        assert!(env_flag("AGORA_TEST_FLAG", true).is_err());
        std::env::remove_var("AGORA_TEST_FLAG");
        assert!(env_flag("AGORA_TEST_FLAG", true).unwrap());
    }

    #[test]
    #[serial]
    fn env_optional_ignores_blank() {
        std::env::set_var("AGORA_TEST_OPT", "   ");
        assert_eq!(env_optional("AGORA_TEST_OPT"), None);
        std::env::remove_var("AGORA_TEST_OPT");
    }
}
