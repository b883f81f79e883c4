//! Interactive validators for individual wizard fields.
//!
//! These never touch the stored value: callers always keep the raw input and
//! only use the returned errors for display and submission readiness.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::choice::{Choice, Currency, IdentifierScheme};
use crate::state::{FieldValue, WizardState};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static ENTITY_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{N}\s.,'()&/-]+$").expect("valid entity name regex")
});
static REPEATED_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid whitespace regex"));

pub const ENTITY_NAME_MIN_CHARS: usize = 3;
pub const ENTITY_NAME_MAX_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub code: String,
    pub message: String,
}

impl FieldError {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

pub fn validate_email(value: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::new("required", "Email address is required"));
    }
    if !is_valid_email(value) {
        return Err(FieldError::new("invalid_email", "Please enter a valid email address"));
    }
    Ok(())
}

/// Errors for an email field and its confirmation, re-evaluated together
/// whenever either one changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailPairErrors {
    pub email: Option<FieldError>,
    pub confirmation: Option<FieldError>,
}

impl EmailPairErrors {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.confirmation.is_none()
    }
}

pub fn check_email_pair(email: &str, confirmation: &str) -> EmailPairErrors {
    let confirmation_error = if confirmation.trim().is_empty() {
        Some(FieldError::new("required", "Please confirm your email address"))
    } else if confirmation != email {
        Some(FieldError::new("mismatch", "The email addresses do not match"))
    } else {
        None
    };
    EmailPairErrors {
        email: validate_email(email).err(),
        confirmation: confirmation_error,
    }
}

/// Validate a legal entity name. Leading and trailing whitespace is ignored.
pub fn validate_entity_name(value: &str) -> Result<(), FieldError> {
    let trimmed = value.trim();
    let length = trimmed.chars().count();
    if length < ENTITY_NAME_MIN_CHARS {
        return Err(FieldError::new(
            "too_small",
            "Please enter at least three readable characters so the reporting entity can be uniquely identified.",
        ));
    }
    if length > ENTITY_NAME_MAX_CHARS {
        return Err(FieldError::new(
            "too_big",
            "Please stay under 120 characters to keep the exported disclosure compact.",
        ));
    }
    if !ENTITY_NAME_RE.is_match(trimmed) {
        return Err(FieldError::new(
            "invalid_string",
            "Only use letters, digits, spaces and safe punctuation such as . , ' ( ) & / -",
        ));
    }
    Ok(())
}

/// Collapse whitespace runs to a single space and trim the ends.
pub fn normalize_entity_name(value: &str) -> String {
    REPEATED_SPACE_RE.replace_all(value, " ").trim().to_string()
}

/// Interaction state of the entity name input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityNameField {
    value: String,
    error: Option<FieldError>,
    touched: bool,
    blurred: bool,
}

impl EntityNameField {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let error = validate_entity_name(&value).err();
        Self {
            value,
            error,
            ..Self::default()
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn error(&self) -> Option<&FieldError> {
        self.error.as_ref()
    }

    /// Record a keystroke. The raw value is returned for committing upstream.
    pub fn on_change(&mut self, raw: &str) -> &str {
        self.value = raw.to_string();
        self.touched = true;
        self.error = validate_entity_name(&self.value).err();
        &self.value
    }

    /// Leave the field. Returns the normalized value when normalization
    /// changed it and it has to be committed upstream.
    pub fn on_blur(&mut self) -> Option<String> {
        let normalized = normalize_entity_name(&self.value);
        let changed = normalized != self.value;
        if changed {
            self.value = normalized;
        }
        self.blurred = true;
        self.error = validate_entity_name(&self.value).err();
        changed.then(|| self.value.clone())
    }

    /// The error to show, once the user has interacted with the field.
    pub fn display_error(&self) -> Option<&FieldError> {
        if self.touched || self.blurred {
            self.error.as_ref()
        } else {
            None
        }
    }
}

pub fn parse_currency(raw: &str) -> Result<Currency, FieldError> {
    raw.trim().parse::<Currency>().map_err(|_| {
        FieldError::new(
            "invalid_enum_value",
            format!("Currency must be one of {}", Currency::allowed()),
        )
    })
}

pub fn parse_identifier_scheme(raw: &str) -> Result<IdentifierScheme, FieldError> {
    raw.trim().parse::<IdentifierScheme>().map_err(|_| {
        FieldError::new(
            "invalid_enum_value",
            format!("Identifier scheme must be one of {}", IdentifierScheme::allowed()),
        )
    })
}

/// A field that blocks submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessIssue {
    pub datapoint_id: String,
    pub error: FieldError,
}

/// Numeric input must parse as a finite number once trimmed. Blank input is
/// not checked here.
pub fn validate_number(raw: &str) -> Result<(), FieldError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(()),
        _ => Err(FieldError::new(
            "invalid_number",
            format!("'{}' is not a number. Use digits and a '.' for decimals.", trimmed),
        )),
    }
}

/// Run the field validators over a state. An empty result means the state may
/// be submitted as far as field validity is concerned.
pub fn readiness_issues(state: &WizardState) -> Vec<ReadinessIssue> {
    let mut issues = Vec::new();
    let entity_name = &state.general_information.entity_name;
    if !entity_name.trim().is_empty()
        && let Err(error) = validate_entity_name(entity_name)
    {
        issues.push(ReadinessIssue {
            datapoint_id: "entityName".into(),
            error,
        });
    }
    for section in state.sections() {
        for field in section.fields() {
            if let Some(FieldValue::Number(input)) = field.value
                && let Err(error) = validate_number(input.raw())
            {
                issues.push(ReadinessIssue {
                    datapoint_id: field.id.into(),
                    error,
                });
            }
        }
    }
    issues
}
