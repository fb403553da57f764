//! Cohort evaluation engine.
//!
//! Evaluates declarative, parameterized cohort definitions against an
//! evaluation context: resolves the most specific evaluator for the
//! definition's type, binds parameters onto a clone of the definition,
//! consults the context's cache, and restricts the result to the context's
//! base cohort.

pub mod builtin;
pub mod domain;
pub mod evaluation;
pub mod obs;
pub mod store;
pub mod telemetry;

pub use domain::{
    BindingError, CacheAccessError, Caching, Capability, Cohort, CohortError, CohortResult,
    Definition, DefinitionHeader, DefinitionType, DefinitionVariant, Mapped, Parameter,
    ParameterType, RegistryError, SubjectId, COHORT_DEFINITION,
};

pub use evaluation::{
    bind, downcast, maybe_cache, CacheStrategy, CohortEngine, ConfigurationDigestStrategy,
    DefinitionEvaluator, DefinitionPersister, EngineBuilder, EngineConfig, EvaluationCache,
    EvaluationContext, HandlerRegistry, MemoryCache, RegistryBuilder,
};

pub use builtin::characteristic::{CharacteristicDefinition, CharacteristicEvaluator};
pub use builtin::composition::{CompositionDefinition, CompositionEvaluator, SetOperator};
pub use builtin::static_set::{StaticDefinition, StaticEvaluator};
pub use builtin::subjects::{MemorySubjectSource, Subject, SubjectSource};
pub use builtin::{register_builtins, BuiltinDefinition};

pub use store::MemoryDefinitionStore;
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
