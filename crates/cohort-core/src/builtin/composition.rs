//! Cohorts composed from other definitions with a set operator.

use std::fmt;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::builtin::BuiltinDefinition;
use crate::domain::cohort::Cohort;
use crate::domain::definition::{
    Caching, Definition, DefinitionHeader, DefinitionType, DefinitionVariant, Mapped,
    COHORT_DEFINITION,
};
use crate::evaluation::context::EvaluationContext;
use crate::evaluation::engine::CohortEngine;
use crate::evaluation::handler::{downcast, DefinitionEvaluator};

pub static COMPOSITION: DefinitionType = DefinitionType {
    name: "composition",
    supertypes: &[&COHORT_DEFINITION],
    caching: Caching::Disabled,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOperator {
    Intersection,
    Union,
    /// First child minus every following child.
    Difference,
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOperator::Intersection => write!(f, "intersection"),
            SetOperator::Union => write!(f, "union"),
            SetOperator::Difference => write!(f, "difference"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionDefinition {
    pub header: DefinitionHeader,
    pub operator: SetOperator,
    #[serde(default)]
    pub children: Vec<Mapped<BuiltinDefinition>>,
}

impl CompositionDefinition {
    pub fn new(name: impl Into<String>, operator: SetOperator) -> Self {
        Self {
            header: DefinitionHeader::new(name),
            operator,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Mapped<BuiltinDefinition>) -> Self {
        self.children.push(child);
        self
    }
}

impl AsRef<DefinitionHeader> for CompositionDefinition {
    fn as_ref(&self) -> &DefinitionHeader {
        &self.header
    }
}

impl AsMut<DefinitionHeader> for CompositionDefinition {
    fn as_mut(&mut self) -> &mut DefinitionHeader {
        &mut self.header
    }
}

impl DefinitionVariant for CompositionDefinition {
    fn descriptor() -> &'static DefinitionType {
        &COMPOSITION
    }
}

/// Evaluates each child in a child context, then folds with the operator.
pub struct CompositionEvaluator;

impl DefinitionEvaluator for CompositionEvaluator {
    fn evaluate(
        &self,
        definition: &dyn Definition,
        context: &EvaluationContext<'_>,
        engine: &CohortEngine,
    ) -> anyhow::Result<Cohort> {
        let definition = downcast::<CompositionDefinition>(definition)?;
        let mut children = definition.children.iter();
        let Some(first) = children.next() else {
            bail!("composition {} has no children", definition.header.name);
        };

        let mut result = engine.evaluate_mapped(first, context)?;
        for child in children {
            let cohort = engine.evaluate_mapped(child, context)?;
            result = match definition.operator {
                SetOperator::Intersection => result.intersect(&cohort),
                SetOperator::Union => result.union(&cohort),
                SetOperator::Difference => result.difference(&cohort),
            };
        }
        Ok(result)
    }
}
