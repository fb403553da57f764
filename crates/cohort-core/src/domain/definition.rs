//! Definitions: declarative, parameterized descriptions of a cohort.
//!
//! Every definition variant has a static [`DefinitionType`] descriptor naming
//! the variant, its supertypes and its caching behaviour. Handlers are
//! registered against descriptors, and lookups walk `supertypes` to find the
//! most specific registration.
//!
//! Concrete variants are plain serde structs implementing
//! [`DefinitionVariant`]; the blanket [`Definition`] impl gives the binder a
//! uniform view of their configuration fields through their serialized form.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::error::BindingError;
use crate::domain::parameter::Parameter;
use crate::evaluation::cache::CacheStrategy;

/// Serialized key holding the [`DefinitionHeader`]; never a configuration field.
const HEADER_FIELD: &str = "header";

/// Caching declared by a definition variant.
#[derive(Clone, Copy)]
pub enum Caching {
    Disabled,
    Strategy(&'static dyn CacheStrategy),
}

impl fmt::Debug for Caching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caching::Disabled => write!(f, "Disabled"),
            Caching::Strategy(strategy) => write!(f, "Strategy({})", strategy.name()),
        }
    }
}

/// Static descriptor of a definition variant.
#[derive(Debug)]
pub struct DefinitionType {
    pub name: &'static str,
    /// Direct ancestors, nearest first.
    pub supertypes: &'static [&'static DefinitionType],
    pub caching: Caching,
}

impl PartialEq for DefinitionType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for DefinitionType {}

impl fmt::Display for DefinitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Root of the definition type hierarchy.
pub static COHORT_DEFINITION: DefinitionType = DefinitionType {
    name: "cohort_definition",
    supertypes: &[],
    caching: Caching::Disabled,
};

/// Identity and declared parameters shared by every definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Bumped by the persister on every save.
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl DefinitionHeader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: None,
            name: name.into(),
            description: None,
            version: 0,
            parameters: Vec::new(),
        }
    }
}

/// Object-safe view of a definition used by the engine and handlers.
pub trait Definition: fmt::Debug + Send + Sync {
    fn definition_type(&self) -> &'static DefinitionType;

    fn header(&self) -> &DefinitionHeader;

    fn header_mut(&mut self) -> &mut DefinitionHeader;

    fn name(&self) -> &str {
        &self.header().name
    }

    fn parameters(&self) -> &[Parameter] {
        &self.header().parameters
    }

    /// Variant-specific configuration fields as a JSON object, header excluded.
    fn configuration(&self) -> Result<Value, serde_json::Error>;

    /// Whether `field` names a configuration field of this definition.
    fn has_field(&self, field: &str) -> bool;

    /// Overwrite configuration field `field` with `value`.
    fn set_field(&mut self, field: &str, value: Value) -> Result<(), BindingError>;

    /// Deep copy.
    fn clone_definition(&self) -> Box<dyn Definition>;

    fn as_any(&self) -> &dyn Any;
}

/// A concrete definition variant.
///
/// Every configuration field must appear in the serialized form (do not use
/// `skip_serializing_if` on them), otherwise parameters naming that field
/// cannot be bound.
pub trait DefinitionVariant:
    Clone
    + fmt::Debug
    + Serialize
    + DeserializeOwned
    + AsRef<DefinitionHeader>
    + AsMut<DefinitionHeader>
    + Send
    + Sync
    + 'static
{
    fn descriptor() -> &'static DefinitionType;
}

fn fields_of<T: Serialize>(value: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(serde::ser::Error::custom("definition must serialize to an object")),
    }
}

impl<T: DefinitionVariant> Definition for T {
    fn definition_type(&self) -> &'static DefinitionType {
        T::descriptor()
    }

    fn header(&self) -> &DefinitionHeader {
        self.as_ref()
    }

    fn header_mut(&mut self) -> &mut DefinitionHeader {
        self.as_mut()
    }

    fn configuration(&self) -> Result<Value, serde_json::Error> {
        let mut fields = fields_of(self)?;
        fields.remove(HEADER_FIELD);
        Ok(Value::Object(fields))
    }

    fn has_field(&self, field: &str) -> bool {
        field != HEADER_FIELD
            && fields_of(self)
                .map(|fields| fields.contains_key(field))
                .unwrap_or(false)
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<(), BindingError> {
        let definition = self.as_ref().name.clone();
        let invalid = |reason: String| BindingError::InvalidValue {
            definition: definition.clone(),
            parameter: field.to_string(),
            reason,
        };

        let mut fields = fields_of(self).map_err(|e| invalid(e.to_string()))?;
        if field == HEADER_FIELD || !fields.contains_key(field) {
            return Err(BindingError::MissingField {
                definition: definition.clone(),
                parameter: field.to_string(),
            });
        }
        fields.insert(field.to_string(), value);
        *self = serde_json::from_value(Value::Object(fields)).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }

    fn clone_definition(&self) -> Box<dyn Definition> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A child definition together with the parameter mappings supplied by its
/// parent.
///
/// A mapped value of the form `"${name}"` refers to parameter `name` of the
/// parent context; any other value is used literally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapped<D> {
    pub definition: D,
    #[serde(default)]
    pub mappings: BTreeMap<String, Value>,
}

impl<D> Mapped<D> {
    pub fn new(definition: D) -> Self {
        Self {
            definition,
            mappings: BTreeMap::new(),
        }
    }

    /// Map child parameter `name` to a literal value.
    pub fn map(mut self, name: impl Into<String>, value: Value) -> Self {
        self.mappings.insert(name.into(), value);
        self
    }

    /// Map child parameter `name` to the parent's parameter `parent_name`.
    pub fn map_from_parent(self, name: impl Into<String>, parent_name: &str) -> Self {
        self.map(name, Value::String(format!("${{{parent_name}}}")))
    }
}

/// Extract `name` from a `"${name}"` parameter reference.
pub(crate) fn parameter_reference(value: &Value) -> Option<&str> {
    value
        .as_str()?
        .strip_prefix("${")?
        .strip_suffix('}')
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static BASE: DefinitionType = DefinitionType {
        name: "base",
        supertypes: &[&COHORT_DEFINITION],
        caching: Caching::Disabled,
    };

    static LEAF: DefinitionType = DefinitionType {
        name: "leaf",
        supertypes: &[&BASE],
        caching: Caching::Disabled,
    };

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Sample {
        header: DefinitionHeader,
        threshold: Option<u32>,
    }

    impl AsRef<DefinitionHeader> for Sample {
        fn as_ref(&self) -> &DefinitionHeader {
            &self.header
        }
    }

    impl AsMut<DefinitionHeader> for Sample {
        fn as_mut(&mut self) -> &mut DefinitionHeader {
            &mut self.header
        }
    }

    impl DefinitionVariant for Sample {
        fn descriptor() -> &'static DefinitionType {
            &LEAF
        }
    }

    fn sample() -> Sample {
        Sample {
            header: DefinitionHeader::new("sample"),
            threshold: None,
        }
    }

    #[test]
    fn test_configuration_excludes_header() {
        let config = sample().configuration().unwrap();
        assert_eq!(config, json!({ "threshold": null }));
    }

    #[test]
    fn test_set_field_updates_only_target() {
        let original = sample();
        let mut copy = original.clone_definition();
        copy.set_field("threshold", json!(5)).unwrap();
        assert_eq!(copy.configuration().unwrap(), json!({ "threshold": 5 }));
        assert_eq!(original.threshold, None);
    }

    #[test]
    fn test_set_field_rejects_unknown_and_header() {
        let mut def = sample();
        assert!(matches!(
            def.set_field("missing", json!(1)),
            Err(BindingError::MissingField { .. })
        ));
        assert!(matches!(
            def.set_field("header", json!({})),
            Err(BindingError::MissingField { .. })
        ));
        assert!(!def.has_field("header"));
        assert!(def.has_field("threshold"));
    }

    #[test]
    fn test_set_field_rejects_undeserializable_value() {
        let mut def = sample();
        let err = def.set_field("threshold", json!(-3)).unwrap_err();
        assert!(matches!(err, BindingError::InvalidValue { .. }));
        assert_eq!(def.threshold, None);
    }

    #[test]
    fn test_parameter_reference_parsing() {
        assert_eq!(parameter_reference(&json!("${start}")), Some("start"));
        assert_eq!(parameter_reference(&json!("start")), None);
        assert_eq!(parameter_reference(&json!("${}")), None);
        assert_eq!(parameter_reference(&json!(3)), None);
    }

    #[test]
    fn test_map_from_parent_builds_reference() {
        let mapped = Mapped::new(()).map_from_parent("min_age", "age");
        assert_eq!(mapped.mappings["min_age"], json!("${age}"));
    }
}
