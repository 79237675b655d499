//! Request body schema validation.
//!
//! # Responsibilities
//! - Compile a route's inline JSON Schema once at startup
//! - Validate payloads, accumulating every violation in one pass
//! - Report violations as {code, property, message} triples
//!
//! # Design Decisions
//! - Schemas compile at route-compile time; an invalid schema aborts startup
//! - Validation never stops at the first violation
//! - The violation list is relayed to the caller verbatim, in order

use jsonschema::error::ValidationErrorKind;
use serde::Serialize;
use serde_json::Value;

/// One structural violation of a route's declared schema.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Machine-readable violation code (e.g. `required`, `type`).
    pub code: String,

    /// JSON pointer to the offending property (`$` for the root).
    pub property: String,

    /// Human-readable message.
    pub message: String,
}

/// Error raised when a route declares an invalid schema.
#[derive(Debug, thiserror::Error)]
#[error("invalid JSON schema: {message}")]
pub struct SchemaCompileError {
    pub message: String,
}

/// A route's pre-compiled schema validator.
#[derive(Debug)]
pub struct CompiledSchema {
    validator: jsonschema::Validator,
}

impl CompiledSchema {
    /// Compile an inline JSON Schema.
    pub fn compile(schema: &Value) -> Result<Self, SchemaCompileError> {
        let validator = jsonschema::options()
            .should_validate_formats(true)
            .build(schema)
            .map_err(|e| SchemaCompileError {
                message: e.to_string(),
            })?;
        Ok(Self { validator })
    }

    /// Validate a payload, returning every violation found.
    pub fn validate(&self, payload: &Value) -> Vec<SchemaViolation> {
        self.validator
            .iter_errors(payload)
            .map(|error| {
                let path = error.instance_path.to_string();
                SchemaViolation {
                    code: kind_code(&error.kind).to_string(),
                    property: if path.is_empty() {
                        "$".to_string()
                    } else {
                        format!("${path}")
                    },
                    message: error.to_string(),
                }
            })
            .collect()
    }
}

/// Stable short code for a violation kind.
fn kind_code(kind: &ValidationErrorKind) -> &'static str {
    match kind {
        ValidationErrorKind::Required { .. } => "required",
        ValidationErrorKind::Type { .. } => "type",
        ValidationErrorKind::MinLength { .. } => "min_length",
        ValidationErrorKind::MaxLength { .. } => "max_length",
        ValidationErrorKind::Minimum { .. } => "minimum",
        ValidationErrorKind::Maximum { .. } => "maximum",
        ValidationErrorKind::Pattern { .. } => "pattern",
        ValidationErrorKind::Format { .. } => "format",
        ValidationErrorKind::Enum { .. } => "enum",
        ValidationErrorKind::MinItems { .. } => "min_items",
        ValidationErrorKind::MaxItems { .. } => "max_items",
        ValidationErrorKind::AdditionalProperties { .. } => "additional_properties",
        _ => "schema",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_schema() -> CompiledSchema {
        CompiledSchema::compile(&json!({
            "type": "object",
            "required": ["name", "email"],
            "properties": {
                "name": { "type": "string", "minLength": 2 },
                "email": { "type": "string" },
                "age": { "type": "integer", "minimum": 0 }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_payload_yields_no_violations() {
        let schema = user_schema();
        let violations = schema.validate(&json!({"name": "ada", "email": "a@b.c"}));
        assert!(violations.is_empty());
    }

    #[test]
    fn test_independent_violations_all_reported() {
        let schema = user_schema();
        // Three independent constraints violated: missing email, name too
        // short, age negative.
        let violations = schema.validate(&json!({"name": "a", "age": -1}));
        assert_eq!(violations.len(), 3);

        let properties: std::collections::HashSet<&str> =
            violations.iter().map(|v| v.property.as_str()).collect();
        assert_eq!(properties.len(), 3, "each violation has a distinct property path");
    }

    #[test]
    fn test_violation_carries_code_and_path() {
        let schema = user_schema();
        let violations = schema.validate(&json!({"name": "ada", "email": "a@b.c", "age": "old"}));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "type");
        assert_eq!(violations[0].property, "$/age");
    }

    #[test]
    fn test_invalid_schema_rejected_at_compile() {
        let result = CompiledSchema::compile(&json!({"type": "not-a-type"}));
        assert!(result.is_err());
    }
}
