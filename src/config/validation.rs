//! Semantic configuration checks.
//!
//! Serde catches syntactic problems; this pass catches configurations that
//! parse but cannot run (no environments, unparseable upstream URLs, zero
//! intervals).

use std::collections::HashSet;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Validate a parsed configuration. Returns every failure, not just the first.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(err(
            "listener.bind_address",
            format!("not a valid socket address: {}", config.listener.bind_address),
        ));
    }

    if config.environments.is_empty() {
        errors.push(err("environments", "at least one environment is required"));
    }

    let mut seen = HashSet::new();
    for env in &config.environments {
        if env.name.is_empty() {
            errors.push(err("environments.name", "environment name must not be empty"));
            continue;
        }
        if env.name.contains('/') {
            errors.push(err(
                "environments.name",
                format!("environment name must not contain '/': {}", env.name),
            ));
        }
        if !seen.insert(env.name.clone()) {
            errors.push(err(
                "environments.name",
                format!("duplicate environment: {}", env.name),
            ));
        }
        match Url::parse(&env.upstream_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(err(
                "environments.upstream_url",
                format!("unsupported scheme '{}' for {}", url.scheme(), env.name),
            )),
            Err(e) => errors.push(err(
                "environments.upstream_url",
                format!("invalid URL for {}: {}", env.name, e),
            )),
        }
    }

    if config.capture.max_body_bytes == 0 {
        errors.push(err("capture.max_body_bytes", "must be greater than zero"));
    }
    if config.capture.excerpt_chars == 0 {
        errors.push(err("capture.excerpt_chars", "must be greater than zero"));
    }
    if config.log.flush_interval_ms == 0 {
        errors.push(err("log.flush_interval_ms", "must be greater than zero"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(err("timeouts.request_secs", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::EnvironmentConfig;

    fn valid_config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.environments.push(EnvironmentConfig {
            name: "dev".into(),
            upstream_url: "https://api.dev.example.com".into(),
        });
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_no_environments_rejected() {
        let config = ProxyConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "environments"));
    }

    #[test]
    fn test_duplicate_environment_rejected() {
        let mut config = valid_config();
        config.environments.push(EnvironmentConfig {
            name: "dev".into(),
            upstream_url: "https://other.example.com".into(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("duplicate")));
    }

    #[test]
    fn test_bad_upstream_url_rejected() {
        let mut config = valid_config();
        config.environments[0].upstream_url = "not a url".into();
        assert!(validate_config(&config).is_err());

        config.environments[0].upstream_url = "ftp://example.com".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("unsupported scheme")));
    }

    #[test]
    fn test_slash_in_name_rejected() {
        let mut config = valid_config();
        config.environments[0].name = "dev/extra".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_flush_interval_rejected() {
        let mut config = valid_config();
        config.log.flush_interval_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "log.flush_interval_ms"));
    }
}
