//! Evaluation contexts.
//!
//! A context carries the parameter values, base cohort and cache for one
//! evaluation. Nested evaluations get a child context that borrows its
//! parent: parameter lookups fall through to the parent chain, and the cache
//! and base cohort are shared. A parent never refers to its children.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::domain::cohort::Cohort;
use crate::domain::definition::parameter_reference;
use crate::evaluation::cache::{EvaluationCache, MemoryCache};

pub struct EvaluationContext<'p> {
    parameters: HashMap<String, Value>,
    base_cohort: Option<Arc<Cohort>>,
    cache: Option<Arc<dyn EvaluationCache>>,
    parent: Option<&'p EvaluationContext<'p>>,
}

impl EvaluationContext<'static> {
    /// A root context with an empty [`MemoryCache`].
    pub fn new() -> Self {
        Self::with_cache(Arc::new(MemoryCache::new()))
    }

    /// A root context backed by `cache`.
    pub fn with_cache(cache: Arc<dyn EvaluationCache>) -> Self {
        Self {
            parameters: HashMap::new(),
            base_cohort: None,
            cache: Some(cache),
            parent: None,
        }
    }

    /// A root context without any cache; every evaluation computes.
    pub fn without_cache() -> Self {
        Self {
            parameters: HashMap::new(),
            base_cohort: None,
            cache: None,
            parent: None,
        }
    }
}

impl Default for EvaluationContext<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p> EvaluationContext<'p> {
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set_parameter(name, value);
        self
    }

    pub fn with_base_cohort(mut self, cohort: Cohort) -> Self {
        self.set_base_cohort(Some(cohort));
        self
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    pub fn set_base_cohort(&mut self, cohort: Option<Cohort>) {
        self.base_cohort = cohort.map(Arc::new);
    }

    /// Value for `name`, looked up locally and then up the parent chain.
    pub fn parameter_value(&self, name: &str) -> Option<&Value> {
        match self.parameters.get(name) {
            Some(value) => Some(value),
            None => self.parent.and_then(|parent| parent.parameter_value(name)),
        }
    }

    pub fn contains_parameter(&self, name: &str) -> bool {
        self.parameter_value(name).is_some()
    }

    /// Values set on this context only, excluding inherited ones.
    pub fn local_parameters(&self) -> &HashMap<String, Value> {
        &self.parameters
    }

    pub fn base_cohort(&self) -> Option<&Cohort> {
        self.base_cohort.as_deref()
    }

    pub fn cache(&self) -> Option<&dyn EvaluationCache> {
        self.cache.as_deref()
    }

    pub fn parent(&self) -> Option<&EvaluationContext<'p>> {
        self.parent
    }

    /// Nesting level; 0 for a root context.
    pub fn depth(&self) -> usize {
        self.parent.map_or(0, |parent| parent.depth() + 1)
    }

    /// Derive the context for a mapped child evaluation.
    ///
    /// Mapped literals become local values; `${name}` references are resolved
    /// against this context, and map to `null` when `name` is unset here.
    /// Unmapped names fall through to this context.
    pub fn child(&self, mappings: &BTreeMap<String, Value>) -> EvaluationContext<'_> {
        let mut parameters = HashMap::with_capacity(mappings.len());
        for (name, mapped) in mappings {
            match parameter_reference(mapped) {
                Some(reference) => match self.parameter_value(reference) {
                    Some(value) => {
                        parameters.insert(name.clone(), value.clone());
                    }
                    None => {
                        warn!(
                            parameter = %name,
                            reference = %reference,
                            "unresolved parameter reference, mapping null"
                        );
                        parameters.insert(name.clone(), Value::Null);
                    }
                },
                None => {
                    parameters.insert(name.clone(), mapped.clone());
                }
            }
        }

        EvaluationContext {
            parameters,
            base_cohort: self.base_cohort.clone(),
            cache: self.cache.clone(),
            parent: Some(self),
        }
    }
}

impl fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("parameters", &self.parameters)
            .field("base_cohort", &self.base_cohort.as_ref().map(|c| c.len()))
            .field("cached", &self.cache.is_some())
            .field("depth", &self.depth())
            .finish()
    }
}
