use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::generate::{ModuleSchema, SchemaSet};
use crate::schema::escape_pointer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datapoint_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Outcome of validating a module's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub missing_required: Vec<String>,
    /// Reported for information; unknown fields are dropped from `values`.
    pub unknown_fields: Vec<String>,
    /// Coerced values of the known datapoints.
    pub values: Value,
}

/// Validate a JSON object of datapoint values against one module aggregate.
pub fn validate_module(module: &ModuleSchema, values: &Value) -> ValidationResult {
    let empty = Map::new();
    let Some(object) = values.as_object() else {
        return ValidationResult {
            valid: false,
            errors: vec![ValidationError {
                datapoint_id: None,
                path: Some(String::new()),
                message: "module values must be a JSON object".into(),
                code: Some("invalid_type".into()),
            }],
            missing_required: Vec::new(),
            unknown_fields: Vec::new(),
            values: Value::Object(empty),
        };
    };

    let mut errors = Vec::new();
    let mut missing_required = Vec::new();
    let mut coerced = Map::new();

    for field in &module.fields {
        let value = object.get(&field.id).filter(|value| !value.is_null());
        let Some(value) = value else {
            if !field.schema.accepts_absent() {
                missing_required.push(field.id.clone());
            }
            continue;
        };
        match field.schema.validate(value) {
            Ok(value) => {
                coerced.insert(field.id.clone(), value);
            }
            Err(issues) => {
                errors.extend(issues.into_iter().map(|issue| ValidationError {
                    datapoint_id: Some(field.id.clone()),
                    path: Some(format!("/{}{}", escape_pointer(&field.id), issue.path)),
                    message: issue.message,
                    code: Some(issue.code),
                }));
            }
        }
    }

    let unknown_fields = object
        .keys()
        .filter(|key| module.field(key).is_none())
        .cloned()
        .collect();

    ValidationResult {
        valid: errors.is_empty() && missing_required.is_empty(),
        errors,
        missing_required,
        unknown_fields,
        values: Value::Object(coerced),
    }
}

impl SchemaSet {
    /// Validate values for the module identified by `code`, if it exists.
    pub fn validate_module(&self, code: &str, values: &Value) -> Option<ValidationResult> {
        self.module(code).map(|module| validate_module(module, values))
    }
}
