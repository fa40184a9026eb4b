//! Runtime configuration

use crate::observability::LogFormat;

pub const ENV_COMPLETION_BUFFER: &str = "OPTIMIST_COMPLETION_BUFFER";
pub const ENV_REVALIDATE: &str = "OPTIMIST_REVALIDATE";
pub const ENV_LOG_FORMAT: &str = "OPTIMIST_LOG_FORMAT";

/// Session configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Capacity of the completion channel
    pub completion_buffer: usize,
    /// Fetch a fresh snapshot before advancing a settled handle
    pub revalidate_on_settle: bool,
    /// Log output format for binaries built on the runtime
    pub log_format: LogFormat,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            completion_buffer: 64,
            revalidate_on_settle: true,
            log_format: LogFormat::Pretty,
        }
    }
}

impl RuntimeConfig {
    /// Settle handles without refetching; snapshots arrive only through
    /// explicit refreshes.
    pub fn manual_refresh() -> Self {
        RuntimeConfig {
            revalidate_on_settle: false,
            ..Default::default()
        }
    }

    /// Defaults overridden by `OPTIMIST_*` environment variables.
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = RuntimeConfig::default();

        if let Some(raw) = lookup(ENV_COMPLETION_BUFFER) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.completion_buffer = n,
                _ => tracing::warn!(key = ENV_COMPLETION_BUFFER, value = %raw, "ignoring invalid value"),
            }
        }

        if let Some(raw) = lookup(ENV_REVALIDATE) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.revalidate_on_settle = true,
                "0" | "false" | "no" | "off" => config.revalidate_on_settle = false,
                _ => tracing::warn!(key = ENV_REVALIDATE, value = %raw, "ignoring invalid value"),
            }
        }

        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            match raw.parse::<LogFormat>() {
                Ok(format) => config.log_format = format,
                Err(_) => tracing::warn!(key = ENV_LOG_FORMAT, value = %raw, "ignoring invalid value"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.completion_buffer, 64);
        assert!(config.revalidate_on_settle);
        assert!(!RuntimeConfig::manual_refresh().revalidate_on_settle);
    }

    #[test]
    fn test_lookup_overrides() {
        let config = RuntimeConfig::from_lookup(lookup_from(&[
            (ENV_COMPLETION_BUFFER, "8"),
            (ENV_REVALIDATE, "off"),
            (ENV_LOG_FORMAT, "json"),
        ]));

        assert_eq!(config.completion_buffer, 8);
        assert!(!config.revalidate_on_settle);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_lookup_ignores_garbage() {
        let config = RuntimeConfig::from_lookup(lookup_from(&[
            (ENV_COMPLETION_BUFFER, "0"),
            (ENV_REVALIDATE, "maybe"),
            (ENV_LOG_FORMAT, "xml"),
        ]));

        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(ENV_COMPLETION_BUFFER, "3");
        let config = RuntimeConfig::from_env();
        std::env::remove_var(ENV_COMPLETION_BUFFER);

        assert_eq!(config.completion_buffer, 3);
    }
}
