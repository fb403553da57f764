//! The evaluation engine.
//!
//! `evaluate` runs, in order:
//! 1. resolve the most specific evaluator for the definition's type
//! 2. bind parameters onto a clone of the definition
//! 3. fetch from the context cache or compute (see [`maybe_cache`])
//! 4. intersect with the context's base cohort, if any

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builtin::characteristic::CharacteristicDefinition;
use crate::domain::cohort::Cohort;
use crate::domain::definition::{Definition, DefinitionType, Mapped};
use crate::domain::error::{Capability, CohortError, CohortResult, RegistryError};
use crate::evaluation::binder::bind;
use crate::evaluation::cache::maybe_cache;
use crate::evaluation::context::EvaluationContext;
use crate::evaluation::handler::{DefinitionEvaluator, DefinitionPersister};
use crate::evaluation::registry::{HandlerRegistry, RegistryBuilder};
use crate::obs::{self, EvaluationSpan};

/// Environment variable read by [`EngineConfig::from_env`].
pub const CACHE_ENV_VAR: &str = "COHORT_CACHE";

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// When `false`, context caches are ignored and every evaluation computes.
    #[serde(default = "default_caching")]
    pub caching: bool,
}

fn default_caching() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { caching: true }
    }
}

impl EngineConfig {
    /// Defaults, with caching disabled when `COHORT_CACHE` is `off`, `false` or `0`.
    pub fn from_env() -> Self {
        let caching = match std::env::var(CACHE_ENV_VAR) {
            Ok(value) => !matches!(value.trim().to_ascii_lowercase().as_str(), "off" | "false" | "0"),
            Err(_) => true,
        };
        Self { caching }
    }
}

pub struct EngineBuilder {
    evaluators: RegistryBuilder<dyn DefinitionEvaluator>,
    persisters: RegistryBuilder<dyn DefinitionPersister>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            evaluators: RegistryBuilder::new(Capability::Evaluator),
            persisters: RegistryBuilder::new(Capability::Persister),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn evaluator(
        &mut self,
        definition_type: &'static DefinitionType,
        evaluator: Arc<dyn DefinitionEvaluator>,
    ) -> Result<&mut Self, RegistryError> {
        self.evaluators.register(definition_type, evaluator)?;
        Ok(self)
    }

    pub fn persister(
        &mut self,
        definition_type: &'static DefinitionType,
        persister: Arc<dyn DefinitionPersister>,
    ) -> Result<&mut Self, RegistryError> {
        self.persisters.register(definition_type, persister)?;
        Ok(self)
    }

    pub fn build(self) -> CohortEngine {
        CohortEngine {
            evaluators: self.evaluators.build(),
            persisters: self.persisters.build(),
            config: self.config,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluates and saves definitions by dispatching to registered handlers.
///
/// The engine is immutable once built and can be shared across threads.
pub struct CohortEngine {
    evaluators: HandlerRegistry<dyn DefinitionEvaluator>,
    persisters: HandlerRegistry<dyn DefinitionPersister>,
    config: EngineConfig,
}

impl CohortEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn evaluators(&self) -> &HandlerRegistry<dyn DefinitionEvaluator> {
        &self.evaluators
    }

    pub fn persisters(&self) -> &HandlerRegistry<dyn DefinitionPersister> {
        &self.persisters
    }

    /// Evaluate `definition` against `context`.
    ///
    /// When the context carries a base cohort the result is always a subset of it.
    pub fn evaluate(
        &self,
        definition: &dyn Definition,
        context: &EvaluationContext<'_>,
    ) -> CohortResult<Cohort> {
        let evaluator = self.evaluators.resolve(definition)?;
        let configured = bind(definition, context)?;

        let _span = EvaluationSpan::enter(configured.name(), context.depth());
        obs::emit_evaluation_started(
            configured.name(),
            configured.definition_type().name,
            context.depth(),
        );
        let started = Instant::now();

        let cache = if self.config.caching {
            context.cache()
        } else {
            None
        };
        let computed = maybe_cache(configured.as_ref(), cache, || {
            evaluator
                .evaluate(configured.as_ref(), context, self)
                .map_err(handler_error)
        })?;

        let cohort = match context.base_cohort() {
            Some(base) => {
                debug!(computed = computed.len(), base = base.len(), "intersecting with base cohort");
                computed.intersect(base)
            }
            None => computed,
        };

        obs::emit_evaluation_finished(
            configured.name(),
            cohort.len(),
            started.elapsed().as_millis() as u64,
        );
        Ok(cohort)
    }

    /// Evaluate a mapped child definition in a child of `parent`.
    pub fn evaluate_mapped<D>(
        &self,
        mapped: &Mapped<D>,
        parent: &EvaluationContext<'_>,
    ) -> CohortResult<Cohort>
    where
        D: AsRef<dyn Definition>,
    {
        let child = parent.child(&mapped.mappings);
        let definition = mapped.definition.as_ref();
        debug!(
            definition = %definition.name(),
            mappings = mapped.mappings.len(),
            depth = child.depth(),
            "evaluating mapped definition"
        );
        self.evaluate(definition, &child)
    }

    /// Evaluate with a fresh, cache-less root context.
    pub fn evaluate_detached(&self, definition: &dyn Definition) -> CohortResult<Cohort> {
        self.evaluate(definition, &EvaluationContext::without_cache())
    }

    /// Persist `definition` through the most specific registered persister.
    pub fn save_definition(&self, definition: &dyn Definition) -> CohortResult<Box<dyn Definition>> {
        let persister = self.persisters.resolve(definition)?;
        let saved = persister.save(definition).map_err(handler_error)?;
        obs::emit_definition_saved(saved.name(), saved.header().version);
        Ok(saved)
    }

    /// The built-in definition selecting every subject.
    pub fn universe_definition(&self) -> Box<dyn Definition> {
        Box::new(CharacteristicDefinition::all_subjects())
    }
}

/// Handler errors pass through unchanged; engine errors raised by nested
/// evaluations are unwrapped back to their original variant.
fn handler_error(err: anyhow::Error) -> CohortError {
    match err.downcast::<CohortError>() {
        Ok(inner) => inner,
        Err(other) => CohortError::Handler(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults_to_caching() {
        assert!(EngineConfig::default().caching);
        let parsed: EngineConfig = serde_json::from_str("{}").unwrap();
        assert!(parsed.caching);
    }

    #[test]
    fn test_handler_error_unwraps_nested_engine_error() {
        let nested = anyhow::Error::from(CohortError::NoHandler {
            capability: Capability::Evaluator,
            definition_type: "static".to_string(),
            definition_name: "child".to_string(),
        });
        assert!(matches!(handler_error(nested), CohortError::NoHandler { .. }));

        let domain = anyhow::anyhow!("subject table unavailable");
        assert!(matches!(handler_error(domain), CohortError::Handler(_)));
    }

    #[test]
    fn test_empty_engine_has_no_handlers() {
        let engine = CohortEngine::builder().build();
        assert!(engine.evaluators().is_empty());
        assert!(engine.persisters().is_empty());
        let err = engine
            .save_definition(engine.universe_definition().as_ref())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            CohortError::NoHandler {
                capability: Capability::Persister,
                ..
            }
        ));
    }
}
