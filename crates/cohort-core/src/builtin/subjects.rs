//! Subject data read by the built-in evaluators.

use std::io::Read;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::cohort::{Cohort, SubjectId};

/// Demographic facts about one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
}

impl Subject {
    pub fn new(id: u64) -> Self {
        Self {
            id: SubjectId(id),
            gender: None,
            birthdate: None,
        }
    }

    pub fn with_gender(mut self, gender: &str) -> Self {
        self.gender = Some(gender.to_string());
        self
    }

    pub fn with_birthdate(mut self, birthdate: NaiveDate) -> Self {
        self.birthdate = Some(birthdate);
        self
    }

    /// Age in completed years on `date`; `None` if the birthdate is unknown
    /// or after `date`.
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        let birthdate = self.birthdate?;
        let mut years = date.year() - birthdate.year();
        if (date.month(), date.day()) < (birthdate.month(), birthdate.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}

/// Read access to the subject population.
pub trait SubjectSource: Send + Sync {
    /// Every subject matching `predicate`.
    fn select(&self, predicate: &dyn Fn(&Subject) -> bool) -> anyhow::Result<Cohort>;

    fn universe(&self) -> anyhow::Result<Cohort> {
        self.select(&|_| true)
    }
}

/// Subject table held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySubjectSource {
    subjects: Vec<Subject>,
}

impl MemorySubjectSource {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self { subjects }
    }

    /// Load a JSON array of subjects.
    pub fn from_reader(reader: impl Read) -> anyhow::Result<Self> {
        let subjects: Vec<Subject> = serde_json::from_reader(reader)?;
        Ok(Self::new(subjects))
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

impl SubjectSource for MemorySubjectSource {
    fn select(&self, predicate: &dyn Fn(&Subject) -> bool) -> anyhow::Result<Cohort> {
        Ok(self
            .subjects
            .iter()
            .filter(|&s| predicate(s))
            .map(|s| s.id)
            .collect())
    }
}
