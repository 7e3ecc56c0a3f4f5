//! Compiles type descriptors into validation rules.
//!
//! Each descriptor is rendered as a JSON Schema (draft 2020-12) document of
//! the same shape and compiled once. The compiled rule is reused for every
//! edit of the input it belongs to.

use std::fmt;

use serde_json::{json, Map, Value};

use crate::descriptor::{Abi, TypeDescriptor, UintWidth};
use crate::SchemaError;

/// Decimal digits only, any length, leading zeros allowed.
pub const FIELD_PATTERN: &str = "^[0-9]+$";

/// Pattern for a `uN` literal: unbounded decimal, or hex bounded to `N/4` digits.
///
/// Decimal text is not checked against the width; a decimal literal past
/// the declared range is left for the engine to reject.
pub fn uint_pattern(width: UintWidth) -> String {
    format!("^([0-9]+|0x[0-9a-fA-F]{{1,{}}})$", width.max_hex_digits())
}

/// A compiled, descriptor-shaped validation rule.
pub struct ValidationRule {
    schema: Value,
    validator: jsonschema::Validator,
}

impl ValidationRule {
    /// The JSON Schema document this rule was compiled from.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub(crate) fn validator(&self) -> &jsonschema::Validator {
        &self.validator
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Builds [`ValidationRule`]s from descriptors.
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Render the JSON Schema for a descriptor without compiling it.
    pub fn schema(ty: &TypeDescriptor) -> Value {
        match ty {
            TypeDescriptor::Field => json!({
                "type": "string",
                "pattern": FIELD_PATTERN,
            }),
            TypeDescriptor::Uint(width) => json!({
                "type": "string",
                "pattern": uint_pattern(*width),
            }),
            TypeDescriptor::Bool => json!({ "type": "boolean" }),
            TypeDescriptor::Tuple(elements) => {
                let mut schema = json!({
                    "type": "array",
                    "minItems": elements.len(),
                    "maxItems": elements.len(),
                });
                // prefixItems must be non-empty; the length bounds alone cover `()`.
                if !elements.is_empty() {
                    let items: Vec<Value> = elements.iter().map(Self::schema).collect();
                    schema["prefixItems"] = Value::Array(items);
                }
                schema
            }
            TypeDescriptor::Array { element, size } => json!({
                "type": "array",
                "items": Self::schema(element),
                "minItems": size,
                "maxItems": size,
            }),
            TypeDescriptor::Struct { members, .. } => {
                let mut properties = Map::new();
                for member in members {
                    properties.insert(member.name.clone(), Self::schema(&member.ty));
                }
                let required: Vec<Value> = members
                    .iter()
                    .map(|m| Value::String(m.name.clone()))
                    .collect();
                // No additionalProperties: undeclared keys are accepted.
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                })
            }
        }
    }

    /// Compile a descriptor into a rule.
    pub fn build(ty: &TypeDescriptor) -> Result<ValidationRule, SchemaError> {
        let schema = Self::schema(ty);
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .build(&schema)
            .map_err(|e| SchemaError::Compile {
                message: e.to_string(),
            })?;
        Ok(ValidationRule { schema, validator })
    }

    /// Compile one rule per ABI input, in ABI order.
    ///
    /// Fails on the first input that cannot be compiled; no partial rule
    /// set is returned.
    pub fn build_abi(abi: &Abi) -> Result<Vec<ValidationRule>, SchemaError> {
        let rules = abi
            .inputs
            .iter()
            .map(|input| Self::build(&input.ty))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(inputs = rules.len(), "compiled ABI validation rules");
        Ok(rules)
    }
}
