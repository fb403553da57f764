//! Cohorts defined by subject demographics.

use std::sync::Arc;

use anyhow::bail;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::builtin::subjects::{Subject, SubjectSource};
use crate::domain::cohort::Cohort;
use crate::domain::definition::{
    Caching, Definition, DefinitionHeader, DefinitionType, DefinitionVariant, COHORT_DEFINITION,
};
use crate::domain::parameter::Parameter;
use crate::evaluation::cache::ConfigurationDigestStrategy;
use crate::evaluation::context::EvaluationContext;
use crate::evaluation::engine::CohortEngine;
use crate::evaluation::handler::{downcast, DefinitionEvaluator};

pub static CHARACTERISTIC: DefinitionType = DefinitionType {
    name: "characteristic",
    supertypes: &[&COHORT_DEFINITION],
    caching: Caching::Strategy(&ConfigurationDigestStrategy),
};

/// Subjects matching every constraint that is set. With no constraint set
/// this selects the whole population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicDefinition {
    pub header: DefinitionHeader,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub max_age: Option<u32>,
    /// Date ages are computed on; today when unset.
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
}

impl CharacteristicDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            header: DefinitionHeader::new(name),
            gender: None,
            min_age: None,
            max_age: None,
            effective_date: None,
        }
    }

    /// The unrestricted universe of subjects.
    pub fn all_subjects() -> Self {
        let mut definition = Self::new("All Subjects");
        definition.header.description = Some("Every subject in the population".to_string());
        definition
    }

    pub fn with_gender(mut self, gender: &str) -> Self {
        self.gender = Some(gender.to_string());
        self
    }

    pub fn with_age_range(mut self, min_age: Option<u32>, max_age: Option<u32>) -> Self {
        self.min_age = min_age;
        self.max_age = max_age;
        self
    }

    pub fn with_effective_date(mut self, date: NaiveDate) -> Self {
        self.effective_date = Some(date);
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.header.parameters.push(parameter);
        self
    }

    fn is_unrestricted(&self) -> bool {
        self.gender.is_none() && self.min_age.is_none() && self.max_age.is_none()
    }

    fn matches(&self, subject: &Subject, on: NaiveDate) -> bool {
        if let Some(gender) = &self.gender {
            match &subject.gender {
                Some(g) if g.eq_ignore_ascii_case(gender) => {}
                _ => return false,
            }
        }
        if self.min_age.is_none() && self.max_age.is_none() {
            return true;
        }
        let Some(age) = subject.age_on(on) else {
            return false;
        };
        self.min_age.map_or(true, |min| age >= min) && self.max_age.map_or(true, |max| age <= max)
    }
}

impl AsRef<DefinitionHeader> for CharacteristicDefinition {
    fn as_ref(&self) -> &DefinitionHeader {
        &self.header
    }
}

impl AsMut<DefinitionHeader> for CharacteristicDefinition {
    fn as_mut(&mut self) -> &mut DefinitionHeader {
        &mut self.header
    }
}

impl DefinitionVariant for CharacteristicDefinition {
    fn descriptor() -> &'static DefinitionType {
        &CHARACTERISTIC
    }
}

/// Evaluates [`CharacteristicDefinition`]s against a subject source.
pub struct CharacteristicEvaluator {
    source: Arc<dyn SubjectSource>,
}

impl CharacteristicEvaluator {
    pub fn new(source: Arc<dyn SubjectSource>) -> Self {
        Self { source }
    }
}

impl DefinitionEvaluator for CharacteristicEvaluator {
    fn evaluate(
        &self,
        definition: &dyn Definition,
        _context: &EvaluationContext<'_>,
        _engine: &CohortEngine,
    ) -> anyhow::Result<Cohort> {
        let definition = downcast::<CharacteristicDefinition>(definition)?;
        if let (Some(min), Some(max)) = (definition.min_age, definition.max_age) {
            if min > max {
                bail!(
                    "{}: min_age {} is greater than max_age {}",
                    definition.header.name,
                    min,
                    max
                );
            }
        }
        if definition.is_unrestricted() {
            return self.source.universe();
        }

        let on = definition
            .effective_date
            .unwrap_or_else(|| Utc::now().date_naive());
        self.source.select(&|subject| definition.matches(subject, on))
    }
}
