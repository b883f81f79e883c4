use std::path::Path;

use vsme_client::TOTAL_STEPS;
use vsme_spec::{
    BasisModule, Choice, Currency, EmployeeCountingMethod, FieldError, FieldValue,
    IdentifierScheme, PayloadEntry, ReportingBasis, SectionKind, StateError, WizardState, YesNo,
};

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Prompts only.
    Clean,
    /// Also field identifiers, input hints and the payload summary.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// One page of the wizard. The last one has no section and confirms the
/// submission.
pub struct Step {
    pub number: u8,
    pub title: &'static str,
    pub section: Option<SectionKind>,
}

pub const STEPS: [Step; TOTAL_STEPS as usize] = [
    Step {
        number: 1,
        title: "General information",
        section: Some(SectionKind::GeneralInformation),
    },
    Step {
        number: 2,
        title: "Environmental disclosures",
        section: Some(SectionKind::EnvironmentalDisclosures),
    },
    Step {
        number: 3,
        title: "Social disclosures",
        section: Some(SectionKind::SocialDisclosures),
    },
    Step {
        number: 4,
        title: "Governance disclosures",
        section: Some(SectionKind::GovernanceDisclosures),
    },
    Step {
        number: 5,
        title: "Confirmation",
        section: None,
    },
];

pub fn step(number: u8) -> &'static Step {
    let index = usize::from(number.clamp(1, TOTAL_STEPS)) - 1;
    &STEPS[index]
}

/// How a section prompt ended.
pub enum StepOutcome {
    Next,
    Back,
}

pub fn field_ids(state: &WizardState, section: SectionKind) -> Vec<&'static str> {
    state
        .sections()
        .into_iter()
        .find(|candidate| candidate.kind() == section)
        .map(|found| found.fields().into_iter().map(|field| field.id).collect())
        .unwrap_or_default()
}

pub fn current_value<'a>(
    state: &'a WizardState,
    section: SectionKind,
    id: &str,
) -> Option<FieldValue<'a>> {
    state
        .sections()
        .into_iter()
        .find(|candidate| candidate.kind() == section)?
        .fields()
        .into_iter()
        .find(|field| field.id == id)?
        .value
}

/// What the user typed at a field prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardInput {
    Keep,
    Value(String),
    NextStep,
    PreviousStep,
    Exit,
}

impl WizardInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        match trimmed.trim() {
            "" => WizardInput::Keep,
            ":next" => WizardInput::NextStep,
            ":back" => WizardInput::PreviousStep,
            command if command.eq_ignore_ascii_case("exit") => WizardInput::Exit,
            _ => WizardInput::Value(trimmed.to_string()),
        }
    }
}

/// `reportingPeriodStart` -> `Reporting period start`.
pub fn field_label(id: &str) -> String {
    let mut label = String::with_capacity(id.len() + 4);
    for (index, ch) in id.chars().enumerate() {
        if index == 0 {
            label.extend(ch.to_uppercase());
        } else if ch.is_ascii_uppercase() {
            label.push(' ');
            label.push(ch.to_ascii_lowercase());
        } else if ch.is_ascii_digit() && !label.ends_with(|c: char| c.is_ascii_digit()) {
            label.push(' ');
            label.push(ch);
        } else {
            label.push(ch);
        }
    }
    label
}

/// Accepted input for a field, when it is more specific than free text.
pub fn field_hint(id: &str) -> Option<String> {
    let hint = match id {
        "entityIdentifierScheme" => IdentifierScheme::allowed(),
        "currency" => Currency::allowed(),
        "basisModule" => BasisModule::allowed(),
        "basisForReporting" => ReportingBasis::allowed(),
        "employeeCountingMethod" | "employeeMethodology" => EmployeeCountingMethod::allowed(),
        "reportingPeriodStart" | "reportingPeriodEnd" => "YYYY-MM-DD".to_string(),
        "hasTransitionPlan" | "hasAntiCorruptionConvictions" => YesNo::allowed(),
        _ => return None,
    };
    Some(hint)
}

pub fn display_value(value: &FieldValue<'_>) -> String {
    match value {
        FieldValue::Text(text) => text.to_string(),
        FieldValue::Number(input) => input.raw().to_string(),
        FieldValue::Date(date) => date.format("%Y-%m-%d").to_string(),
        FieldValue::Choice(token) => token.to_string(),
    }
}

/// Prints the wizard to stdout and problems to stderr.
pub struct WizardPresenter {
    verbosity: Verbosity,
    header_printed: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            header_printed: false,
        }
    }

    pub fn show_header(&mut self, base_url: &str) {
        if self.header_printed {
            return;
        }
        println!("VSME report wizard");
        println!("Enter a value, press enter to keep the current one, ':next' / ':back' to change step, 'exit' to quit.");
        if self.verbosity.is_verbose() {
            println!("Report service: {}", base_url);
        }
        self.header_printed = true;
    }

    pub fn show_step(&self, step: &Step) {
        println!();
        println!("Step {}/{}: {}", step.number, TOTAL_STEPS, step.title);
    }

    pub fn show_prompt(&self, id: &str, current: Option<&FieldValue<'_>>) {
        let mut line = field_label(id);
        if self.verbosity.is_verbose() {
            line.push_str(&format!(" <{}>", id));
        }
        if let Some(hint) = field_hint(id) {
            line.push_str(&format!(" ({})", hint));
        }
        if let Some(value) = current {
            let shown = display_value(value);
            if !shown.trim().is_empty() {
                line.push_str(&format!(" [{}]", shown));
            }
        }
        println!("{}", line);
    }

    pub fn show_field_error(&self, error: &FieldError) {
        eprintln!("Invalid value: {}", error.message);
    }

    pub fn show_state_error(&self, error: &StateError) {
        eprintln!("Invalid value: {}", error);
    }

    pub fn show_normalized(&self, value: &str) {
        println!("Entity name normalized to '{}'", value);
    }

    pub fn show_summary(&self, payload: &[PayloadEntry]) {
        if payload.is_empty() {
            println!("No fields filled in yet.");
            return;
        }
        println!("{} datapoint(s) will be submitted:", payload.len());
        for entry in payload {
            if self.verbosity.is_verbose() || !is_date_component(&entry.datapoint_id) {
                println!("  {} = {}", entry.datapoint_id, entry.values);
            }
        }
    }

    pub fn show_saved(&self, path: &Path) {
        println!("Report saved to {}", path.display());
    }

    pub fn show_submit_error(&self, message: &str) {
        eprintln!("Submission failed: {}", message);
    }
}

fn is_date_component(id: &str) -> bool {
    ["Year", "Month", "Day"]
        .iter()
        .any(|suffix| id.starts_with("reportingPeriod") && id.ends_with(suffix))
}
