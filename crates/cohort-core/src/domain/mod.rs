//! Domain model for cohort evaluation.
//!
//! - `Definition`: what to evaluate, with declared parameters
//! - `Cohort`: the set of subjects an evaluation produces
//! - `Parameter`: a named, typed input to a definition

pub mod cohort;
pub mod definition;
pub mod digest;
pub mod error;
pub mod parameter;

pub use cohort::{Cohort, SubjectId};
pub use definition::{
    Caching, Definition, DefinitionHeader, DefinitionType, DefinitionVariant, Mapped,
    COHORT_DEFINITION,
};
pub use error::{
    BindingError, CacheAccessError, Capability, CohortError, CohortResult, RegistryError,
};
pub use parameter::{Parameter, ParameterType};
