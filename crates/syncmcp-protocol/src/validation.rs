//! Tool output validation.
//!
//! After a successful `tools/call`, a result's `structuredContent` is checked
//! against the `outputSchema` the tool declared in `tools/list`. The checking
//! itself sits behind [`OutputValidator`] so callers can plug in their own;
//! [`JsonSchemaValidator`] is the default and uses the `jsonschema` crate.
//!
//! Every violation is collected, not just the first, so a single error message
//! can enumerate all problems with a payload.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use jsonschema::Validator;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{McpError, McpResult};

/// One way a payload failed its schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer to the offending value; empty for the document root
    pub instance_path: String,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Result of validating one payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    violations: Vec<SchemaViolation>,
}

impl ValidationOutcome {
    /// A passing outcome
    pub fn valid() -> Self {
        Self::default()
    }

    /// An outcome with the given violations; valid if the list is empty
    pub fn from_violations(violations: Vec<SchemaViolation>) -> Self {
        Self { violations }
    }

    /// Whether the payload satisfied the schema
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations in the order they were found
    pub fn violations(&self) -> &[SchemaViolation] {
        &self.violations
    }

    /// Violations rendered as human-readable messages
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

/// Checks a structured payload against a JSON Schema document
pub trait OutputValidator: Send + Sync + fmt::Debug {
    /// Validate `instance` against `schema`.
    ///
    /// Returns `Err` only when the schema itself cannot be used; a payload that
    /// fails the schema is an `Ok` outcome with violations.
    fn validate(&self, schema: &Value, instance: &Value) -> McpResult<ValidationOutcome>;
}

/// [`OutputValidator`] backed by the `jsonschema` crate.
///
/// Compiled schemas are cached, keyed by their serialized form, because the
/// same tool is typically called many times with the same declared schema.
pub struct JsonSchemaValidator {
    cache_enabled: bool,
    compiled: RwLock<HashMap<String, Arc<Validator>>>,
}

impl JsonSchemaValidator {
    /// Create a validator that caches compiled schemas
    pub fn new() -> Self {
        Self {
            cache_enabled: true,
            compiled: RwLock::new(HashMap::new()),
        }
    }

    /// Create a validator that compiles the schema on every call
    pub fn without_cache() -> Self {
        Self {
            cache_enabled: false,
            compiled: RwLock::new(HashMap::new()),
        }
    }

    /// Number of compiled schemas currently cached
    pub fn cached_schemas(&self) -> usize {
        self.compiled.read().len()
    }

    fn compile(schema: &Value) -> McpResult<Validator> {
        jsonschema::validator_for(schema).map_err(|e| {
            McpError::invalid_response(format!("Tool output schema is not usable: {}", e))
        })
    }

    fn validator_for(&self, schema: &Value) -> McpResult<Arc<Validator>> {
        if !self.cache_enabled {
            return Self::compile(schema).map(Arc::new);
        }

        let key = schema.to_string();
        if let Some(validator) = self.compiled.read().get(&key) {
            trace!("Output schema cache hit");
            return Ok(Arc::clone(validator));
        }

        let validator = Arc::new(Self::compile(schema)?);
        // Another caller may have compiled the same schema meanwhile; either copy is fine.
        self.compiled
            .write()
            .entry(key)
            .or_insert_with(|| Arc::clone(&validator));
        debug!("Compiled and cached tool output schema");
        Ok(validator)
    }
}

impl Default for JsonSchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("cache_enabled", &self.cache_enabled)
            .field("cached_schemas", &self.cached_schemas())
            .finish()
    }
}

impl OutputValidator for JsonSchemaValidator {
    fn validate(&self, schema: &Value, instance: &Value) -> McpResult<ValidationOutcome> {
        let validator = self.validator_for(schema)?;
        let violations: Vec<SchemaViolation> = validator
            .iter_errors(instance)
            .map(|e| SchemaViolation {
                instance_path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect();
        Ok(ValidationOutcome::from_violations(violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn calculator_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "result": {"type": "number"},
                "operation": {"type": "string"}
            },
            "required": ["result", "operation"]
        })
    }

    #[test]
    fn test_conforming_payload_is_valid() {
        let validator = JsonSchemaValidator::new();
        let outcome = validator
            .validate(&calculator_schema(), &json!({"result": 5, "operation": "add"}))
            .unwrap();
        assert!(outcome.is_valid());
        assert!(outcome.messages().is_empty());
    }

    #[test]
    fn test_type_mismatch_is_reported_with_path() {
        let validator = JsonSchemaValidator::new();
        let outcome = validator
            .validate(&calculator_schema(), &json!({"result": "5", "operation": "add"}))
            .unwrap();

        assert!(!outcome.is_valid());
        assert_eq!(outcome.violations().len(), 1);
        assert_eq!(outcome.violations()[0].instance_path, "/result");
        assert!(outcome.messages()[0].starts_with("/result: "));
    }

    #[test]
    fn test_all_violations_are_aggregated() {
        let validator = JsonSchemaValidator::new();
        // Wrong type for `result` and `operation` missing entirely
        let outcome = validator
            .validate(&calculator_schema(), &json!({"result": "5"}))
            .unwrap();

        assert_eq!(outcome.violations().len(), 2);
        let messages = outcome.messages().join("\n");
        assert!(messages.contains("/result"));
        assert!(messages.contains("operation"));
    }

    #[test]
    fn test_nested_arrays_are_checked() {
        let schema = json!({
            "type": "object",
            "properties": {
                "items": {"type": "array", "items": {"type": "integer"}}
            }
        });
        let validator = JsonSchemaValidator::new();
        let outcome = validator
            .validate(&schema, &json!({"items": [1, "two", 3, "four"]}))
            .unwrap();

        let paths: Vec<_> = outcome
            .violations()
            .iter()
            .map(|v| v.instance_path.as_str())
            .collect();
        assert_eq!(paths, vec!["/items/1", "/items/3"]);
    }

    #[test]
    fn test_compiled_schemas_are_cached() {
        let validator = JsonSchemaValidator::new();
        let schema = calculator_schema();
        for _ in 0..3 {
            validator
                .validate(&schema, &json!({"result": 1, "operation": "x"}))
                .unwrap();
        }
        assert_eq!(validator.cached_schemas(), 1);

        let uncached = JsonSchemaValidator::without_cache();
        uncached
            .validate(&schema, &json!({"result": 1, "operation": "x"}))
            .unwrap();
        assert_eq!(uncached.cached_schemas(), 0);
    }

    #[test]
    fn test_unusable_schema_is_an_error() {
        let validator = JsonSchemaValidator::new();
        let err = validator
            .validate(&json!({"type": 12}), &json!({}))
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::InvalidResponse);
    }

    proptest! {
        #[test]
        fn prop_any_number_result_passes(n in any::<i64>(), op in "[a-z]{1,8}") {
            let validator = JsonSchemaValidator::new();
            let outcome = validator
                .validate(&calculator_schema(), &json!({"result": n, "operation": op}))
                .unwrap();
            prop_assert!(outcome.is_valid());
        }

        #[test]
        fn prop_string_result_always_fails(s in ".*") {
            let validator = JsonSchemaValidator::new();
            let outcome = validator
                .validate(&calculator_schema(), &json!({"result": s, "operation": "add"}))
                .unwrap();
            prop_assert!(!outcome.is_valid());
        }
    }
}
