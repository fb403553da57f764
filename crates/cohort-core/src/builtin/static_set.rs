//! Cohorts given by an explicit member list.

use serde::{Deserialize, Serialize};

use crate::domain::cohort::{Cohort, SubjectId};
use crate::domain::definition::{
    Caching, Definition, DefinitionHeader, DefinitionType, DefinitionVariant, COHORT_DEFINITION,
};
use crate::domain::parameter::{Parameter, ParameterType};
use crate::evaluation::context::EvaluationContext;
use crate::evaluation::engine::CohortEngine;
use crate::evaluation::handler::{downcast, DefinitionEvaluator};

pub static STATIC: DefinitionType = DefinitionType {
    name: "static",
    supertypes: &[&COHORT_DEFINITION],
    caching: Caching::Disabled,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticDefinition {
    pub header: DefinitionHeader,
    #[serde(default)]
    pub members: Vec<SubjectId>,
}

impl StaticDefinition {
    pub fn new(name: impl Into<String>, members: impl IntoIterator<Item = u64>) -> Self {
        Self {
            header: DefinitionHeader::new(name),
            members: members.into_iter().map(SubjectId).collect(),
        }
    }

    /// Declare `members` as a parameter so contexts can supply the list.
    pub fn parameterized(mut self) -> Self {
        self.header
            .parameters
            .push(Parameter::new("members", ParameterType::SubjectList));
        self
    }
}

impl AsRef<DefinitionHeader> for StaticDefinition {
    fn as_ref(&self) -> &DefinitionHeader {
        &self.header
    }
}

impl AsMut<DefinitionHeader> for StaticDefinition {
    fn as_mut(&mut self) -> &mut DefinitionHeader {
        &mut self.header
    }
}

impl DefinitionVariant for StaticDefinition {
    fn descriptor() -> &'static DefinitionType {
        &STATIC
    }
}

pub struct StaticEvaluator;

impl DefinitionEvaluator for StaticEvaluator {
    fn evaluate(
        &self,
        definition: &dyn Definition,
        _context: &EvaluationContext<'_>,
        _engine: &CohortEngine,
    ) -> anyhow::Result<Cohort> {
        let definition = downcast::<StaticDefinition>(definition)?;
        Ok(definition.members.iter().copied().collect())
    }
}
