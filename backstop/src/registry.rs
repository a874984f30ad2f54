//! Service key derivation and the per-service breaker registry.
//!
//! Call targets are normalized to a logical service key through an
//! ordered prefix table; the registry owns one circuit breaker per key,
//! created lazily and never evicted. Construct one registry at startup
//! and share it (`Arc`) with every caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;
use url::Url;

use crate::breaker::{CircuitBreaker, CircuitBreakerConfig};

/// Service key used when no route prefix matches a target.
pub const DEFAULT_SERVICE: &str = "default";

/// Normalized logical name a call target resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceKey(String);

impl ServiceKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the ordered prefix table; first match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRoute {
    /// Path prefix to match, e.g. `/api/upload`.
    pub prefix: String,
    /// Service name targets with this prefix resolve to.
    pub service: String,
}

impl ServiceRoute {
    pub fn new(prefix: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            service: service.into(),
        }
    }
}

/// Process-wide owner of one [`CircuitBreaker`] per service key.
#[derive(Debug)]
pub struct ServiceRegistry {
    routes: Vec<ServiceRoute>,
    breaker_config: CircuitBreakerConfig,
    breakers: RwLock<HashMap<ServiceKey, Arc<CircuitBreaker>>>,
}

impl ServiceRegistry {
    pub fn new(routes: Vec<ServiceRoute>, breaker_config: CircuitBreakerConfig) -> Self {
        Self {
            routes,
            breaker_config,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Derive the service key for a call target.
    ///
    /// Absolute-URL targets are reduced to their path first, so
    /// `https://host/api/upload/x` and `/api/upload/x` resolve alike.
    pub fn service_key(&self, target: &str) -> ServiceKey {
        let parsed = Url::parse(target).ok();
        let path = parsed.as_ref().map(Url::path).unwrap_or(target);
        self.routes
            .iter()
            .find(|route| path.starts_with(&route.prefix))
            .map(|route| ServiceKey::new(&route.service))
            .unwrap_or_else(|| ServiceKey::new(DEFAULT_SERVICE))
    }

    /// The breaker gating calls to `target`, creating it on first use.
    pub fn breaker_for(&self, target: &str) -> Arc<CircuitBreaker> {
        self.breaker(self.service_key(target))
    }

    /// The breaker for an already-derived service key.
    pub fn breaker(&self, key: ServiceKey) -> Arc<CircuitBreaker> {
        if let Some(existing) = self
            .breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(existing);
        }
        let mut breakers = self
            .breakers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(breakers.entry(key.clone()).or_insert_with(|| {
            debug!(service = %key, "created circuit breaker");
            Arc::new(CircuitBreaker::new(key.clone(), self.breaker_config.clone()))
        }))
    }

    /// Keys with a live breaker, for display surfaces.
    pub fn known_services(&self) -> Vec<ServiceKey> {
        let mut keys: Vec<ServiceKey> = self
            .breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}
