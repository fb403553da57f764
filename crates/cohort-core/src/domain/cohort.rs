//! Result sets produced by evaluation.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a single subject (e.g. a patient).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub u64);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SubjectId {
    fn from(id: u64) -> Self {
        SubjectId(id)
    }
}

/// An immutable set of subjects.
///
/// Set operations always return a new cohort; the operands are never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cohort {
    members: BTreeSet<SubjectId>,
}

impl Cohort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: SubjectId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SubjectId> + '_ {
        self.members.iter().copied()
    }

    /// Subjects present in both cohorts.
    pub fn intersect(&self, other: &Cohort) -> Cohort {
        self.members.intersection(&other.members).copied().collect()
    }

    /// Subjects present in either cohort.
    pub fn union(&self, other: &Cohort) -> Cohort {
        self.members.union(&other.members).copied().collect()
    }

    /// Subjects in `self` that are not in `other`.
    pub fn difference(&self, other: &Cohort) -> Cohort {
        self.members.difference(&other.members).copied().collect()
    }

    /// `true` when every member of `self` is also a member of `other`.
    pub fn is_subset(&self, other: &Cohort) -> bool {
        self.members.is_subset(&other.members)
    }
}

impl FromIterator<SubjectId> for Cohort {
    fn from_iter<I: IntoIterator<Item = SubjectId>>(iter: I) -> Self {
        Cohort {
            members: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<u64> for Cohort {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        iter.into_iter().map(SubjectId).collect()
    }
}
