use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Number, Value};

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("static date pattern"));

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:(//[^\s/?#]+[^\s]*|[^\s/][^\s]*)$")
        .expect("static url pattern")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]+@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("static email pattern")
});

/// Message attached to the non-empty rule of required text fields.
pub const REQUIRED_MESSAGE: &str = "Required";

/// Message attached to the date base rule.
pub const DATE_MESSAGE: &str = "Invalid date format (YYYY-MM-DD)";

/// Base shape of a generated validator.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// Accepts any value, including an absent one.
    Any,
    Text,
    /// Numeric value; numeric strings are coerced.
    Number,
    Boolean,
    /// `YYYY-MM-DD` calendar date string.
    Date,
    Url,
    Email,
    /// Membership in a fixed, non-empty option set.
    Choice(Vec<String>),
    Table(TableSchema),
}

/// Repeating rows, each an object of column values.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub columns: Vec<(String, Schema)>,
    pub min_rows: usize,
    pub max_rows: Option<usize>,
}

/// Regex rule from the data model description.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Refinements layered on top of the base check, applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Min(f64),
    Max(f64),
    Pattern(Pattern),
    /// Text must contain at least one character.
    NonEmpty,
}

/// A single failed check, addressed by a JSON pointer relative to the
/// validated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: String,
    pub code: String,
    pub message: String,
}

impl SchemaIssue {
    fn new(path: &str, code: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Composable validator generated from a datapoint definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub kind: SchemaKind,
    pub rules: Vec<Rule>,
    pub optional: bool,
}

impl Schema {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            rules: Vec::new(),
            optional: false,
        }
    }

    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    /// True when an absent value passes.
    pub fn accepts_absent(&self) -> bool {
        self.optional || matches!(self.kind, SchemaKind::Any)
    }

    /// Validates `value` and returns its coerced form.
    pub fn validate(&self, value: &Value) -> Result<Value, Vec<SchemaIssue>> {
        let mut issues = Vec::new();
        let coerced = self.check(Some(value), "", &mut issues);
        if issues.is_empty() {
            Ok(coerced.unwrap_or(Value::Null))
        } else {
            Err(issues)
        }
    }

    /// Validates a possibly absent value; JSON `null` counts as absent.
    pub fn check(
        &self,
        value: Option<&Value>,
        path: &str,
        issues: &mut Vec<SchemaIssue>,
    ) -> Option<Value> {
        let Some(value) = value.filter(|value| !value.is_null()) else {
            if !self.accepts_absent() {
                issues.push(SchemaIssue::new(path, "required", REQUIRED_MESSAGE));
            }
            return None;
        };

        let coerced = self.check_base(value, path, issues)?;
        for rule in &self.rules {
            self.check_rule(rule, &coerced, path, issues);
        }
        Some(coerced)
    }

    fn check_base(&self, value: &Value, path: &str, issues: &mut Vec<SchemaIssue>) -> Option<Value> {
        let result = match &self.kind {
            SchemaKind::Any => Ok(value.clone()),
            SchemaKind::Text => expect_string(value).map(|_| value.clone()),
            SchemaKind::Number => coerce_number(value),
            SchemaKind::Boolean => value
                .as_bool()
                .map(|_| value.clone())
                .ok_or(("invalid_type", "Expected boolean".to_string())),
            SchemaKind::Date => expect_string(value).and_then(|text| {
                if DATE_RE.is_match(text) {
                    Ok(value.clone())
                } else {
                    Err(("invalid_string", DATE_MESSAGE.to_string()))
                }
            }),
            SchemaKind::Url => expect_string(value).and_then(|text| {
                if URL_RE.is_match(text) {
                    Ok(value.clone())
                } else {
                    Err(("invalid_string", "Invalid url".to_string()))
                }
            }),
            SchemaKind::Email => expect_string(value).and_then(|text| {
                if EMAIL_RE.is_match(text) {
                    Ok(value.clone())
                } else {
                    Err(("invalid_string", "Invalid email".to_string()))
                }
            }),
            SchemaKind::Choice(options) => expect_string(value).and_then(|text| {
                if options.iter().any(|option| option == text) {
                    Ok(value.clone())
                } else {
                    Err((
                        "invalid_enum_value",
                        format!("Expected one of: {}", options.join(", ")),
                    ))
                }
            }),
            SchemaKind::Table(table) => return check_table(table, value, path, issues),
        };

        match result {
            Ok(value) => Some(value),
            Err((code, message)) => {
                issues.push(SchemaIssue::new(path, code, message));
                None
            }
        }
    }

    fn check_rule(&self, rule: &Rule, value: &Value, path: &str, issues: &mut Vec<SchemaIssue>) {
        match rule {
            Rule::Min(min) => {
                if let Some(measure) = self.measure(value)
                    && measure < *min
                {
                    issues.push(SchemaIssue::new(path, "too_small", self.bound_message("at least", *min)));
                }
            }
            Rule::Max(max) => {
                if let Some(measure) = self.measure(value)
                    && measure > *max
                {
                    issues.push(SchemaIssue::new(path, "too_big", self.bound_message("at most", *max)));
                }
            }
            Rule::Pattern(pattern) => {
                if let Some(text) = value.as_str()
                    && !pattern.is_match(text)
                {
                    issues.push(SchemaIssue::new(path, "invalid_string", "Invalid format"));
                }
            }
            Rule::NonEmpty => {
                if value.as_str().is_some_and(str::is_empty) {
                    issues.push(SchemaIssue::new(path, "required", REQUIRED_MESSAGE));
                }
            }
        }
    }

    /// What `Min`/`Max` compare against: value for numbers, row count for
    /// tables, character count for strings.
    fn measure(&self, value: &Value) -> Option<f64> {
        match (&self.kind, value) {
            (SchemaKind::Number, value) => value.as_f64(),
            (_, Value::Array(rows)) => Some(rows.len() as f64),
            (_, Value::String(text)) => Some(text.chars().count() as f64),
            _ => None,
        }
    }

    fn bound_message(&self, relation: &str, bound: f64) -> String {
        match self.kind {
            SchemaKind::Number => format!("Must be {} {}", relation, bound),
            SchemaKind::Table(_) => format!("Must contain {} {} row(s)", relation, bound),
            _ => format!("Must contain {} {} character(s)", relation, bound),
        }
    }
}

fn expect_string(value: &Value) -> Result<&str, (&'static str, String)> {
    value
        .as_str()
        .ok_or(("invalid_type", "Expected text".to_string()))
}

fn coerce_number(value: &Value) -> Result<Value, (&'static str, String)> {
    let invalid = || ("invalid_type", "Expected number".to_string());
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(text) => {
            let trimmed = text.trim();
            if let Ok(integer) = trimmed.parse::<i64>() {
                return Ok(Value::from(integer));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn check_table(
    table: &TableSchema,
    value: &Value,
    path: &str,
    issues: &mut Vec<SchemaIssue>,
) -> Option<Value> {
    let Some(rows) = value.as_array() else {
        issues.push(SchemaIssue::new(path, "invalid_type", "Expected a list of rows"));
        return None;
    };

    let mut coerced_rows = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let row_path = format!("{}/{}", path, index);
        let Some(cells) = row.as_object() else {
            issues.push(SchemaIssue::new(&row_path, "invalid_type", "Expected object"));
            continue;
        };
        let mut coerced = Map::new();
        for (column_id, column) in &table.columns {
            let cell_path = format!("{}/{}", row_path, escape_pointer(column_id));
            if let Some(cell) = column.check(cells.get(column_id), &cell_path, issues) {
                coerced.insert(column_id.clone(), cell);
            }
        }
        coerced_rows.push(Value::Object(coerced));
    }

    if table.min_rows > 0 && rows.len() < table.min_rows {
        issues.push(SchemaIssue::new(
            path,
            "too_small",
            format!("Must contain at least {} row(s)", table.min_rows),
        ));
    }
    if let Some(max_rows) = table.max_rows
        && rows.len() > max_rows
    {
        issues.push(SchemaIssue::new(
            path,
            "too_big",
            format!("Must contain at most {} row(s)", max_rows),
        ));
    }

    Some(Value::Array(coerced_rows))
}

/// Escapes a key for use as a JSON pointer segment.
pub fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_coerces_numeric_strings() {
        let schema = Schema::new(SchemaKind::Number);
        assert_eq!(schema.validate(&json!("42")).unwrap(), json!(42));
        assert_eq!(schema.validate(&json!(" 1.5 ")).unwrap(), json!(1.5));
        assert_eq!(schema.validate(&json!(7)).unwrap(), json!(7));
        let issues = schema.validate(&json!("forty")).unwrap_err();
        assert_eq!(issues[0].code, "invalid_type");
        assert!(schema.validate(&json!("")).is_err());
        assert!(schema.validate(&json!(true)).is_err());
    }

    #[test]
    fn date_requires_zero_padded_components() {
        let schema = Schema::new(SchemaKind::Date);
        assert!(schema.validate(&json!("2024-01-01")).is_ok());
        for bad in ["2024-1-1", "2024-01-01T00:00:00Z", "20240101", "２０２４-01-01"] {
            let issues = schema.validate(&json!(bad)).unwrap_err();
            assert_eq!(issues[0].message, DATE_MESSAGE, "{}", bad);
        }
    }

    #[test]
    fn any_accepts_absent_values() {
        let mut issues = Vec::new();
        assert!(Schema::any().check(None, "/x", &mut issues).is_none());
        assert!(issues.is_empty());
    }

    #[test]
    fn rules_measure_by_kind() {
        let mut text = Schema::new(SchemaKind::Text);
        text.rules.push(Rule::Max(3.0));
        assert!(text.validate(&json!("äöü")).is_ok());
        assert_eq!(text.validate(&json!("abcd")).unwrap_err()[0].code, "too_big");

        let mut number = Schema::new(SchemaKind::Number);
        number.rules.push(Rule::Min(10.0));
        assert_eq!(number.validate(&json!("9")).unwrap_err()[0].code, "too_small");
        assert!(number.validate(&json!("10")).is_ok());
    }

    #[test]
    fn url_and_email_formats() {
        let url = Schema::new(SchemaKind::Url);
        assert!(url.validate(&json!("https://example.com/report.pdf")).is_ok());
        assert!(url.validate(&json!("example.com")).is_err());
        assert!(url.validate(&json!("https://")).is_err());

        let email = Schema::new(SchemaKind::Email);
        assert!(email.validate(&json!("esg@example.co.uk")).is_ok());
        assert!(email.validate(&json!("esg@example")).is_err());
    }

    #[test]
    fn table_rows_are_checked_per_column() {
        let table = Schema::new(SchemaKind::Table(TableSchema {
            columns: vec![
                ("siteName".into(), Schema::new(SchemaKind::Text)),
                ("area".into(), Schema::new(SchemaKind::Number)),
            ],
            min_rows: 1,
            max_rows: Some(2),
        }));

        let coerced = table
            .validate(&json!([{ "siteName": "Plant A", "area": "120", "extra": 1 }]))
            .unwrap();
        assert_eq!(coerced, json!([{ "siteName": "Plant A", "area": 120 }]));

        let issues = table.validate(&json!([{ "area": "x" }])).unwrap_err();
        let paths = issues.iter().map(|issue| issue.path.as_str()).collect::<Vec<_>>();
        assert_eq!(paths, vec!["/0/siteName", "/0/area"]);

        assert_eq!(table.validate(&json!([])).unwrap_err()[0].code, "too_small");
    }
}
