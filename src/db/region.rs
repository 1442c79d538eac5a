//! Region resolution.
//!
//! The region is read from `AWS_REGION`, falling back to `AWS_DEFAULT_REGION`,
//! and cached for the lifetime of the resolver.

use crate::config::{ENV_DEFAULT_REGION, ENV_REGION, EnvSource};
use crate::error::{DbError, DbResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Cloud region identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region(String);

impl Region {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves the region once and returns the cached value afterwards.
///
/// A failed resolution is not cached.
#[derive(Debug)]
pub struct RegionResolver {
    env: Arc<dyn EnvSource>,
    cached: OnceLock<Region>,
}

impl RegionResolver {
    pub fn new(env: Arc<dyn EnvSource>) -> Self {
        Self {
            env,
            cached: OnceLock::new(),
        }
    }

    /// Resolver with a fixed region, bypassing the environment.
    pub fn fixed(region: impl Into<String>) -> DbResult<Self> {
        let region = region.into();
        if region.is_empty() {
            return Err(DbError::configuration("Region must not be empty"));
        }
        let resolver = Self::new(Arc::new(HashMap::<String, String>::new()));
        let _ = resolver.cached.set(Region(region));
        Ok(resolver)
    }

    pub fn resolve(&self) -> DbResult<Region> {
        if let Some(region) = self.cached.get() {
            return Ok(region.clone());
        }

        let value = self
            .env
            .var(ENV_REGION)
            .or_else(|| self.env.var(ENV_DEFAULT_REGION))
            .ok_or_else(|| {
                DbError::configuration(format!(
                    "Region is not set: define {} or {}",
                    ENV_REGION, ENV_DEFAULT_REGION
                ))
            })?;

        debug!(region = %value, "Resolved region");
        // Concurrent first calls may race; the first stored value wins.
        Ok(self.cached.get_or_init(|| Region(value)).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Environment whose contents can change between calls.
    #[derive(Debug, Default)]
    struct MutableEnv(Mutex<HashMap<String, String>>);

    impl MutableEnv {
        fn set(&self, key: &str, value: &str) {
            self.0
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
        }
    }

    impl EnvSource for MutableEnv {
        fn var(&self, key: &str) -> Option<String> {
            self.0.lock().unwrap().var(key)
        }
    }

    #[test]
    fn test_primary_variable_wins() {
        let env = MutableEnv::default();
        env.set(ENV_REGION, "eu-west-1");
        env.set(ENV_DEFAULT_REGION, "us-east-1");
        let resolver = RegionResolver::new(Arc::new(env));
        assert_eq!(resolver.resolve().unwrap().as_str(), "eu-west-1");
    }

    #[test]
    fn test_fallback_variable() {
        let env = MutableEnv::default();
        env.set(ENV_DEFAULT_REGION, "us-east-2");
        let resolver = RegionResolver::new(Arc::new(env));
        assert_eq!(resolver.resolve().unwrap().as_str(), "us-east-2");
    }

    #[test]
    fn test_missing_region_is_configuration_error() {
        let resolver = RegionResolver::new(Arc::new(MutableEnv::default()));
        let err = resolver.resolve().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_empty_region_is_unset() {
        let env = MutableEnv::default();
        env.set(ENV_REGION, "");
        let resolver = RegionResolver::new(Arc::new(env));
        assert!(resolver.resolve().is_err());
    }

    #[test]
    fn test_resolution_is_cached() {
        let env = Arc::new(MutableEnv::default());
        env.set(ENV_REGION, "ap-southeast-2");
        let resolver = RegionResolver::new(env.clone());

        let first = resolver.resolve().unwrap();
        env.set(ENV_REGION, "sa-east-1");
        let second = resolver.resolve().unwrap();

        assert_eq!(first, second);
        assert_eq!(second.as_str(), "ap-southeast-2");
    }

    #[test]
    fn test_failure_is_not_cached() {
        let env = Arc::new(MutableEnv::default());
        let resolver = RegionResolver::new(env.clone());
        assert!(resolver.resolve().is_err());

        env.set(ENV_DEFAULT_REGION, "ca-central-1");
        assert_eq!(resolver.resolve().unwrap().as_str(), "ca-central-1");
    }

    #[test]
    fn test_fixed_region() {
        let resolver = RegionResolver::fixed("us-west-2").unwrap();
        assert_eq!(resolver.resolve().unwrap().to_string(), "us-west-2");
        assert!(RegionResolver::fixed("").is_err());
    }
}
