//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the audit proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Environment definitions mapping path prefixes to upstreams.
    pub environments: Vec<EnvironmentConfig>,

    /// Body capture policy settings.
    pub capture: CaptureConfig,

    /// Audit log sink settings.
    pub log: LogConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// One routable environment: a path-prefix key bound to an upstream base URL.
///
/// The environment set is closed and immutable for the process lifetime;
/// changing it requires a restart.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnvironmentConfig {
    /// Environment key, matched against the first path segment (e.g. "dev").
    pub name: String,

    /// Upstream base URL (e.g. "https://api.dev.example.com").
    pub upstream_url: String,
}

/// Body capture policy settings.
///
/// Responses are captured by declared size: a body whose `content-length`
/// is at most `max_body_bytes` is recorded in full (after decoding);
/// anything larger or of unknown length is recorded metadata-only.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Largest declared response body, in bytes, that is captured.
    pub max_body_bytes: u64,

    /// Character budget for request body excerpts.
    pub excerpt_chars: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024,
            excerpt_chars: 2000,
        }
    }
}

/// Audit log sink settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Root directory for per-environment log files.
    pub directory: String,

    /// Interval between buffer flushes, in milliseconds.
    pub flush_interval_ms: u64,

    /// Echo each enqueued entry through the tracing layer.
    pub echo: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: "./logs".to_string(),
            flush_interval_ms: 1500,
            echo: true,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_runnable() {
        let config = ProxyConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8000");
        assert!(config.environments.is_empty());
        assert_eq!(config.capture.max_body_bytes, 64 * 1024);
        assert_eq!(config.log.flush_interval_ms, 1500);
    }

    #[test]
    fn test_minimal_toml() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [[environments]]
            name = "dev"
            upstream_url = "https://api.dev.example.com"

            [capture]
            max_body_bytes = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.environments.len(), 1);
        assert_eq!(config.environments[0].name, "dev");
        assert_eq!(config.capture.max_body_bytes, 100);
        // Unspecified sections fall back to defaults.
        assert_eq!(config.capture.excerpt_chars, 2000);
        assert_eq!(config.log.directory, "./logs");
    }
}
