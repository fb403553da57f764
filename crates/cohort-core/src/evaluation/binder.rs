//! Parameter binding.
//!
//! Produces an independent clone of a definition with each declared
//! parameter resolved and written into the matching configuration field.
//! Resolution order: a value supplied by the context (including inherited
//! values), then the parameter's default. A parameter with neither is bound
//! to `null`, clearing whatever value the definition was constructed with.

use serde_json::Value;
use tracing::trace;

use crate::domain::definition::Definition;
use crate::domain::error::BindingError;
use crate::domain::parameter::value_kind;
use crate::evaluation::context::EvaluationContext;

/// Clone `definition` and bind its declared parameters from `context`.
///
/// Neither `definition` nor `context` is modified.
pub fn bind(
    definition: &dyn Definition,
    context: &EvaluationContext<'_>,
) -> Result<Box<dyn Definition>, BindingError> {
    let mut configured = definition.clone_definition();

    for parameter in definition.parameters() {
        let value = context
            .parameter_value(&parameter.name)
            .or(parameter.default_value.as_ref())
            .unwrap_or(&Value::Null);

        if !configured.has_field(&parameter.name) {
            return Err(BindingError::MissingField {
                definition: definition.name().to_string(),
                parameter: parameter.name.clone(),
            });
        }

        if !parameter.parameter_type.accepts(value) {
            return Err(BindingError::TypeMismatch {
                parameter: parameter.name.clone(),
                expected: parameter.parameter_type.to_string(),
                actual: value_kind(value).to_string(),
            });
        }

        trace!(definition = %definition.name(), parameter = %parameter.name, value = %value, "binding parameter");
        configured.set_field(&parameter.name, value.clone())?;
    }

    Ok(configured)
}
