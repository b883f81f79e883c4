use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::state::{FieldValue, WizardState};

/// One `(datapointId, value)` pair of the report payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadEntry {
    pub datapoint_id: String,
    pub values: String,
}

impl PayloadEntry {
    pub fn new(datapoint_id: impl Into<String>, values: impl Into<String>) -> Self {
        Self {
            datapoint_id: datapoint_id.into(),
            values: values.into(),
        }
    }
}

/// Flatten the wizard state into payload entries, section by section in
/// declaration order. Blank text and numeric input that does not parse are
/// skipped; numbers are sent as typed (trimmed); dates expand into the ISO
/// date followed by `Year`, `Month` and `Day` entries.
pub fn flatten(state: &WizardState) -> Vec<PayloadEntry> {
    let mut entries = Vec::new();
    for section in state.sections() {
        for field in section.fields() {
            let Some(value) = field.value else {
                continue;
            };
            push_value(&mut entries, field.id, value);
        }
    }
    tracing::debug!(entries = entries.len(), "flattened wizard state");
    entries
}

fn push_value(entries: &mut Vec<PayloadEntry>, id: &str, value: FieldValue<'_>) {
    match value {
        FieldValue::Text(text) => {
            if !text.trim().is_empty() {
                entries.push(PayloadEntry::new(id, text));
            }
        }
        FieldValue::Number(input) => {
            if input.value().is_some() {
                entries.push(PayloadEntry::new(id, input.raw().trim()));
            }
        }
        FieldValue::Date(date) => {
            entries.push(PayloadEntry::new(id, date.format("%Y-%m-%d").to_string()));
            entries.push(PayloadEntry::new(format!("{id}Year"), date.year().to_string()));
            entries.push(PayloadEntry::new(format!("{id}Month"), date.month().to_string()));
            entries.push(PayloadEntry::new(format!("{id}Day"), date.day().to_string()));
        }
        FieldValue::Choice(token) => entries.push(PayloadEntry::new(id, token)),
    }
}
