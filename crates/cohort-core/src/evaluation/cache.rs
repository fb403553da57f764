//! Cache strategies and the best-effort caching protocol.
//!
//! A definition variant opts into caching through [`Caching::Strategy`] on
//! its descriptor. The strategy derives a key from a *configured* definition
//! (parameters already bound), so two distinct clones with the same resolved
//! configuration share a cache entry.
//!
//! Cache failures never abort an evaluation: they are logged and the result
//! is computed directly.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::cohort::Cohort;
use crate::domain::definition::{Caching, Definition};
use crate::domain::digest::fingerprint;
use crate::domain::error::{CacheAccessError, CohortResult};
use crate::obs;

/// Derives cache keys for configured definitions.
pub trait CacheStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` disables caching for this particular evaluation.
    fn derive_key(&self, definition: &dyn Definition) -> Result<Option<String>, CacheAccessError>;
}

/// Keys on the variant type plus a SHA-256 fingerprint of the configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigurationDigestStrategy;

impl CacheStrategy for ConfigurationDigestStrategy {
    fn name(&self) -> &'static str {
        "configuration_digest"
    }

    fn derive_key(&self, definition: &dyn Definition) -> Result<Option<String>, CacheAccessError> {
        let configuration = definition
            .configuration()
            .map_err(|e| CacheAccessError::KeyDerivation(e.to_string()))?;
        let digest = fingerprint(&configuration)?;
        Ok(Some(format!("{}:{}", definition.definition_type().name, digest)))
    }
}

/// Storage for previously computed cohorts, owned by an evaluation context.
pub trait EvaluationCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Cohort>, CacheAccessError>;

    fn put(&self, key: &str, cohort: Cohort) -> Result<(), CacheAccessError>;
}

/// In-memory cache backed by a `HashMap<key, Cohort>`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Cohort>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .read()
            .map(|e| e.contains_key(key))
            .unwrap_or(false)
    }
}

impl EvaluationCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Cohort>, CacheAccessError> {
        let entries = self.entries.read().map_err(|_| CacheAccessError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, cohort: Cohort) -> Result<(), CacheAccessError> {
        let mut entries = self.entries.write().map_err(|_| CacheAccessError::Poisoned)?;
        entries.insert(key.to_string(), cohort);
        Ok(())
    }
}

/// Return the cached cohort for `definition`, or run `compute` and cache it.
///
/// `compute` runs directly, with no cache interaction, when `cache` is absent,
/// when the variant declares no strategy, or when the strategy yields no key.
/// Errors returned by `compute` itself are propagated and never cached.
pub fn maybe_cache<F>(
    definition: &dyn Definition,
    cache: Option<&dyn EvaluationCache>,
    compute: F,
) -> CohortResult<Cohort>
where
    F: FnOnce() -> CohortResult<Cohort>,
{
    let (Some(cache), Caching::Strategy(strategy)) = (cache, definition.definition_type().caching)
    else {
        return compute();
    };

    let key = match strategy.derive_key(definition) {
        Ok(Some(key)) => key,
        Ok(None) => return compute(),
        Err(e) => {
            obs::emit_cache_error(definition.name(), "derive_key", &e);
            return compute();
        }
    };

    match cache.get(&key) {
        Ok(Some(cohort)) => {
            obs::emit_cache_hit(definition.name(), &key);
            return Ok(cohort);
        }
        Ok(None) => obs::emit_cache_miss(definition.name(), &key),
        Err(e) => {
            obs::emit_cache_error(definition.name(), "get", &e);
            return compute();
        }
    }

    let cohort = compute()?;
    if let Err(e) = cache.put(&key, cohort.clone()) {
        obs::emit_cache_error(definition.name(), "put", &e);
    }
    Ok(cohort)
}
