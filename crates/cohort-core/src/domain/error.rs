//! Error taxonomy for cohort evaluation.

use std::fmt;

/// Which kind of handler a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Evaluator,
    Persister,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Evaluator => write!(f, "evaluator"),
            Capability::Persister => write!(f, "persister"),
        }
    }
}

/// Errors raised while binding parameter values onto a cloned definition.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("parameter {parameter} expects {expected}, got {actual}")]
    TypeMismatch {
        parameter: String,
        expected: String,
        actual: String,
    },

    #[error("definition {definition} has no configuration field for parameter {parameter}")]
    MissingField {
        definition: String,
        parameter: String,
    },

    #[error("value for parameter {parameter} rejected by {definition}: {reason}")]
    InvalidValue {
        definition: String,
        parameter: String,
        reason: String,
    },
}

/// Failures touching the evaluation cache. Always recovered by the engine.
#[derive(Debug, thiserror::Error)]
pub enum CacheAccessError {
    #[error("cache key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("cache lock poisoned")]
    Poisoned,

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Errors raised while populating a handler registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{capability} already registered for definition type {definition_type}")]
    DuplicateRegistration {
        capability: Capability,
        definition_type: String,
    },
}

/// Errors surfaced to callers of the engine.
#[derive(Debug, thiserror::Error)]
pub enum CohortError {
    #[error("no {capability} found for ({definition_type}) {definition_name}")]
    NoHandler {
        capability: Capability,
        definition_type: String,
        definition_name: String,
    },

    #[error("ambiguous {capability} for ({definition_type}) {definition_name}: {candidates:?}")]
    AmbiguousHandler {
        capability: Capability,
        definition_type: String,
        definition_name: String,
        candidates: Vec<String>,
    },

    #[error("binding error: {0}")]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

/// Result type for engine operations.
pub type CohortResult<T> = std::result::Result<T, CohortError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_handler_message_names_type_and_definition() {
        let err = CohortError::NoHandler {
            capability: Capability::Evaluator,
            definition_type: "characteristic".to_string(),
            definition_name: "Adults".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("no evaluator found"));
        assert!(msg.contains("characteristic"));
        assert!(msg.contains("Adults"));
    }

    #[test]
    fn test_handler_error_is_transparent() {
        let err = CohortError::from(anyhow::anyhow!("subject table unavailable"));
        assert_eq!(err.to_string(), "subject table unavailable");
    }

    #[test]
    fn test_binding_error_wraps() {
        let err: CohortError = BindingError::MissingField {
            definition: "Adults".to_string(),
            parameter: "min_age".to_string(),
        }
        .into();
        assert!(err.to_string().starts_with("binding error"));
    }
}
