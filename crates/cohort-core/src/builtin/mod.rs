//! Built-in definition variants and their handlers.
//!
//! - [`characteristic`]: demographic constraints; also the universe definition
//! - [`static_set`]: explicit member lists
//! - [`composition`]: set operations over mapped child definitions
//! - [`subjects`]: the subject population read by evaluators

pub mod characteristic;
pub mod composition;
pub mod static_set;
pub mod subjects;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::definition::{Definition, COHORT_DEFINITION};
use crate::domain::error::RegistryError;
use crate::evaluation::engine::EngineBuilder;
use crate::store::MemoryDefinitionStore;

use characteristic::{CharacteristicDefinition, CharacteristicEvaluator, CHARACTERISTIC};
use composition::{CompositionDefinition, CompositionEvaluator, COMPOSITION};
use static_set::{StaticDefinition, StaticEvaluator, STATIC};
use subjects::SubjectSource;

/// Any built-in definition, tagged by `"type"` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuiltinDefinition {
    Characteristic(CharacteristicDefinition),
    Static(StaticDefinition),
    Composition(CompositionDefinition),
}

impl BuiltinDefinition {
    pub fn as_definition(&self) -> &(dyn Definition + 'static) {
        match self {
            BuiltinDefinition::Characteristic(d) => d,
            BuiltinDefinition::Static(d) => d,
            BuiltinDefinition::Composition(d) => d,
        }
    }

    pub fn into_boxed(self) -> Box<dyn Definition> {
        match self {
            BuiltinDefinition::Characteristic(d) => Box::new(d),
            BuiltinDefinition::Static(d) => Box::new(d),
            BuiltinDefinition::Composition(d) => Box::new(d),
        }
    }
}

impl AsRef<dyn Definition> for BuiltinDefinition {
    fn as_ref(&self) -> &(dyn Definition + 'static) {
        self.as_definition()
    }
}

impl From<CharacteristicDefinition> for BuiltinDefinition {
    fn from(d: CharacteristicDefinition) -> Self {
        BuiltinDefinition::Characteristic(d)
    }
}

impl From<StaticDefinition> for BuiltinDefinition {
    fn from(d: StaticDefinition) -> Self {
        BuiltinDefinition::Static(d)
    }
}

impl From<CompositionDefinition> for BuiltinDefinition {
    fn from(d: CompositionDefinition) -> Self {
        BuiltinDefinition::Composition(d)
    }
}

/// Register evaluators for every built-in variant, and `store` as the
/// persister for all definitions.
pub fn register_builtins(
    builder: &mut EngineBuilder,
    source: Arc<dyn SubjectSource>,
    store: Arc<MemoryDefinitionStore>,
) -> Result<(), RegistryError> {
    builder
        .evaluator(&CHARACTERISTIC, Arc::new(CharacteristicEvaluator::new(source)))?
        .evaluator(&STATIC, Arc::new(StaticEvaluator))?
        .evaluator(&COMPOSITION, Arc::new(CompositionEvaluator))?
        .persister(&COHORT_DEFINITION, store)?;
    Ok(())
}
