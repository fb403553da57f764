//! The evaluation engine and its collaborators.
//!
//! # Module layout
//!
//! - [`context`]: `EvaluationContext`, parameter inheritance for child evaluations
//! - [`binder`]: `bind`, clone-and-configure of a definition
//! - [`registry`]: `HandlerRegistry`, most-specific handler lookup
//! - [`cache`]: `CacheStrategy`, `EvaluationCache`, `maybe_cache`
//! - [`handler`]: `DefinitionEvaluator`, `DefinitionPersister`
//! - [`engine`]: `CohortEngine`, the orchestrator

pub mod binder;
pub mod cache;
pub mod context;
pub mod engine;
pub mod handler;
pub mod registry;

pub use binder::bind;
pub use cache::{
    maybe_cache, CacheStrategy, ConfigurationDigestStrategy, EvaluationCache, MemoryCache,
};
pub use context::EvaluationContext;
pub use engine::{CohortEngine, EngineBuilder, EngineConfig};
pub use handler::{downcast, DefinitionEvaluator, DefinitionPersister};
pub use registry::{HandlerRegistry, RegistryBuilder};
