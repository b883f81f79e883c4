use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Declared type of a datapoint in the data model description.
///
/// Unrecognised tags are kept in [`DataType::Other`] so the generator can
/// report them instead of silently accepting anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    Text,
    Number,
    Date,
    Boolean,
    Select,
    Table,
    Textarea,
    Url,
    Email,
    Other(String),
}

impl DataType {
    pub fn as_str(&self) -> &str {
        match self {
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Date => "date",
            DataType::Boolean => "boolean",
            DataType::Select => "select",
            DataType::Table => "table",
            DataType::Textarea => "textarea",
            DataType::Url => "url",
            DataType::Email => "email",
            DataType::Other(name) => name,
        }
    }

    /// Free-text types that receive the non-empty rule when required.
    pub fn is_text(&self) -> bool {
        matches!(self, DataType::Text | DataType::Textarea)
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => DataType::Text,
            "number" => DataType::Number,
            "date" => DataType::Date,
            "boolean" => DataType::Boolean,
            "select" => DataType::Select,
            "table" => DataType::Table,
            "textarea" => DataType::Textarea,
            "url" => DataType::Url,
            "email" => DataType::Email,
            _ => DataType::Other(value),
        }
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        match value {
            DataType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a select datapoint's option set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectOption {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Numeric bounds and pattern attached to a datapoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// A single datapoint definition. Table datapoints carry their columns as
/// nested definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatapointSpec {
    pub datapoint_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[schemars(with = "String")]
    pub data_type: DataType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<DatapointSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<usize>,
}

fn default_required() -> bool {
    true
}

impl DatapointSpec {
    /// Minimal definition used by tests and programmatic callers.
    pub fn new(datapoint_id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            datapoint_id: datapoint_id.into(),
            label: None,
            data_type,
            required: true,
            options: Vec::new(),
            validation: None,
            columns: Vec::new(),
            min_rows: None,
            max_rows: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_validation(mut self, validation: ValidationSpec) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_options<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = values
            .into_iter()
            .map(|value| SelectOption {
                value: value.into(),
                label: None,
            })
            .collect();
        self
    }

    pub fn with_columns(mut self, columns: Vec<DatapointSpec>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_rows(mut self, min_rows: Option<usize>, max_rows: Option<usize>) -> Self {
        self.min_rows = min_rows;
        self.max_rows = max_rows;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_type_keeps_its_tag() {
        let spec: DatapointSpec = serde_json::from_value(json!({
            "datapointId": "siteMap",
            "dataType": "geojson"
        }))
        .expect("deserialize");
        assert_eq!(spec.data_type, DataType::Other("geojson".into()));
        assert!(spec.required);
        assert_eq!(serde_json::to_value(&spec).unwrap()["dataType"], "geojson");
    }

    #[test]
    fn textarea_counts_as_text() {
        assert!(DataType::Textarea.is_text());
        assert!(!DataType::Select.is_text());
    }
}
