//! Handler capabilities: evaluators and persisters.

use std::any::type_name;

use anyhow::anyhow;
use uuid::Uuid;

use crate::domain::cohort::Cohort;
use crate::domain::definition::Definition;
use crate::evaluation::context::EvaluationContext;
use crate::evaluation::engine::CohortEngine;

/// Computes the cohort for a configured definition.
///
/// Implementations must be deterministic for a given configuration and base
/// cohort, modulo the external data they read. `engine` is available for
/// evaluating nested definitions.
pub trait DefinitionEvaluator: Send + Sync {
    fn evaluate(
        &self,
        definition: &dyn Definition,
        context: &EvaluationContext<'_>,
        engine: &CohortEngine,
    ) -> anyhow::Result<Cohort>;
}

/// Saves and loads definitions.
pub trait DefinitionPersister: Send + Sync {
    /// Persist `definition`, returning the stored copy (uuid and version set).
    fn save(&self, definition: &dyn Definition) -> anyhow::Result<Box<dyn Definition>>;

    fn get_by_uuid(&self, uuid: &Uuid) -> anyhow::Result<Option<Box<dyn Definition>>>;

    /// Definitions whose name equals `name` (`exact`) or contains it, case-insensitively.
    fn find_by_name(&self, name: &str, exact: bool) -> anyhow::Result<Vec<Box<dyn Definition>>>;

    fn all(&self) -> anyhow::Result<Vec<Box<dyn Definition>>>;

    /// Remove a definition; returns whether it existed.
    fn purge(&self, uuid: &Uuid) -> anyhow::Result<bool>;
}

/// Downcast a definition to the variant a handler was registered for.
pub fn downcast<D: 'static>(definition: &dyn Definition) -> anyhow::Result<&D> {
    definition.as_any().downcast_ref::<D>().ok_or_else(|| {
        anyhow!(
            "handler for {} cannot evaluate ({}) {}",
            type_name::<D>(),
            definition.definition_type(),
            definition.name()
        )
    })
}
