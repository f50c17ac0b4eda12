//! Environment lookup and path rewriting.
//!
//! # Responsibilities
//! - Map the first path segment of a request to a configured environment
//! - Strip the environment prefix from the forwarded path
//! - Return an explicit no-match for unknown prefixes
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) environment lookup via HashMap
//! - Empty path segments are discarded, so `//dev//x` routes like `/dev/x`

use std::collections::HashMap;

use url::Url;

/// A deployment target: a symbolic name bound to one upstream base URL.
#[derive(Debug, Clone)]
pub struct Environment {
    pub name: String,
    pub upstream: Url,
}

/// The outcome of resolving a request path.
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    /// The matched environment.
    pub environment: &'a Environment,
    /// Upstream path with the environment prefix removed. Always starts
    /// with `/`; `/{env}` alone resolves to `/`.
    pub rewritten_path: String,
}

/// Maps first path segments to environments.
pub struct EnvironmentRouter {
    environments: HashMap<String, Environment>,
}

impl EnvironmentRouter {
    /// Build a router from validated environment configuration.
    ///
    /// Upstream URLs must already have passed config validation; an
    /// unparseable URL here is a programming error.
    pub fn from_config(configs: &[crate::config::EnvironmentConfig]) -> Result<Self, url::ParseError> {
        let mut environments = HashMap::with_capacity(configs.len());
        for cfg in configs {
            let upstream = Url::parse(&cfg.upstream_url)?;
            environments.insert(
                cfg.name.clone(),
                Environment {
                    name: cfg.name.clone(),
                    upstream,
                },
            );
        }
        Ok(Self { environments })
    }

    /// Resolve a raw request path to an environment and rewritten path.
    ///
    /// Returns `None` when the first segment names no configured
    /// environment; the caller rejects the request without contacting any
    /// upstream.
    pub fn resolve(&self, path: &str) -> Option<Resolved<'_>> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let key = segments.next()?;
        let environment = self.environments.get(key)?;

        let rest: Vec<&str> = segments.collect();
        let rewritten_path = format!("/{}", rest.join("/"));

        Some(Resolved {
            environment,
            rewritten_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvironmentConfig;

    fn router() -> EnvironmentRouter {
        EnvironmentRouter::from_config(&[
            EnvironmentConfig {
                name: "dev".into(),
                upstream_url: "https://api.dev.example.com".into(),
            },
            EnvironmentConfig {
                name: "prod".into(),
                upstream_url: "https://api.example.com".into(),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_resolves_known_environment() {
        let router = router();
        let resolved = router.resolve("/dev/foo/bar").unwrap();
        assert_eq!(resolved.environment.name, "dev");
        assert_eq!(resolved.rewritten_path, "/foo/bar");
    }

    #[test]
    fn test_prefix_alone_rewrites_to_root() {
        let router = router();
        let resolved = router.resolve("/prod").unwrap();
        assert_eq!(resolved.rewritten_path, "/");

        let resolved = router.resolve("/prod/").unwrap();
        assert_eq!(resolved.rewritten_path, "/");
    }

    #[test]
    fn test_unknown_prefix_is_no_match() {
        let router = router();
        assert!(router.resolve("/staging/foo").is_none());
        assert!(router.resolve("/").is_none());
        assert!(router.resolve("").is_none());
    }

    #[test]
    fn test_empty_segments_discarded() {
        let router = router();
        let resolved = router.resolve("//dev//foo///bar").unwrap();
        assert_eq!(resolved.environment.name, "dev");
        assert_eq!(resolved.rewritten_path, "/foo/bar");
    }

    #[test]
    fn test_prefix_never_forwarded() {
        // A path whose second segment repeats the key keeps that segment.
        let router = router();
        let resolved = router.resolve("/dev/dev/x").unwrap();
        assert_eq!(resolved.rewritten_path, "/dev/x");
    }
}
