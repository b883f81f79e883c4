use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::choice::{
    BasisModule, Choice, Currency, EmployeeCountingMethod, IdentifierScheme, ReportingBasis, YesNo,
};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("unknown wizard section '{0}'")]
    UnknownSection(String),
    #[error("invalid update for section '{section}': {source}")]
    Patch {
        section: SectionKind,
        #[source]
        source: serde_json::Error,
    },
}

/// Current value of one wizard field, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    /// Non-blank numeric input, as typed.
    Number(&'a NumberInput),
    Date(NaiveDate),
    Choice(&'static str),
}

/// A field of a section: datapoint identifier plus its value, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field<'a> {
    pub id: &'static str,
    pub value: Option<FieldValue<'a>>,
}

impl<'a> Field<'a> {
    fn text(id: &'static str, value: &'a str) -> Self {
        Self {
            id,
            value: Some(FieldValue::Text(value)),
        }
    }

    fn number(id: &'static str, value: &'a NumberInput) -> Self {
        Self {
            id,
            value: (!value.is_blank()).then_some(FieldValue::Number(value)),
        }
    }

    fn date(id: &'static str, value: Option<NaiveDate>) -> Self {
        Self {
            id,
            value: value.map(FieldValue::Date),
        }
    }

    fn choice<C: Choice>(id: &'static str, value: Option<C>) -> Self {
        Self {
            id,
            value: value.map(|choice| FieldValue::Choice(choice.as_str())),
        }
    }
}

/// A numeric field exactly as the user typed it.
///
/// The text is stored even when it does not parse; `value` is `None` for such
/// input and readiness reports it. JSON numbers are kept in their textual
/// form, so large integers survive unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct NumberInput(String);

impl NumberInput {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Parsed value of non-blank input. Infinite and NaN spellings do not count.
    pub fn value(&self) -> Option<f64> {
        self.0
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
    }
}

impl From<&str> for NumberInput {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<f64> for NumberInput {
    fn from(number: f64) -> Self {
        Self(number.to_string())
    }
}

impl<'de> Deserialize<'de> for NumberInput {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Number(number)) => Ok(Self(number.to_string())),
            Some(Value::String(text)) => Ok(Self(text)),
            Some(other) => Err(serde::de::Error::custom(format!(
                "expected a number, got {}",
                other
            ))),
        }
    }
}

/// A wizard section that can list its fields in declaration order.
pub trait Section {
    fn kind(&self) -> SectionKind;

    fn fields(&self) -> Vec<Field<'_>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    GeneralInformation,
    EnvironmentalDisclosures,
    SocialDisclosures,
    GovernanceDisclosures,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::GeneralInformation,
        SectionKind::EnvironmentalDisclosures,
        SectionKind::SocialDisclosures,
        SectionKind::GovernanceDisclosures,
    ];

    /// Key of the section in serialized wizard state.
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::GeneralInformation => "generalInformation",
            SectionKind::EnvironmentalDisclosures => "environmentalDisclosures",
            SectionKind::SocialDisclosures => "socialDisclosures",
            SectionKind::GovernanceDisclosures => "governanceDisclosures",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = StateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "general" | "generalInformation" => Ok(SectionKind::GeneralInformation),
            "environmental" | "environmentalDisclosures" => {
                Ok(SectionKind::EnvironmentalDisclosures)
            }
            "social" | "socialDisclosures" => Ok(SectionKind::SocialDisclosures),
            "governance" | "governanceDisclosures" => Ok(SectionKind::GovernanceDisclosures),
            other => Err(StateError::UnknownSection(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GeneralInformation {
    pub entity_name: String,
    #[serde(deserialize_with = "input::blank_as_none")]
    pub entity_identifier_scheme: Option<IdentifierScheme>,
    pub entity_identifier: String,
    #[serde(deserialize_with = "input::blank_as_none")]
    pub currency: Option<Currency>,
    #[serde(deserialize_with = "input::blank_as_none")]
    pub reporting_period_start: Option<NaiveDate>,
    #[serde(deserialize_with = "input::blank_as_none")]
    pub reporting_period_end: Option<NaiveDate>,
    #[serde(deserialize_with = "input::blank_as_none")]
    pub basis_module: Option<BasisModule>,
    #[serde(deserialize_with = "input::blank_as_none")]
    pub basis_for_reporting: Option<ReportingBasis>,
    pub omitted_disclosures: String,
    pub turnover: NumberInput,
    pub employee_count: NumberInput,
    #[serde(deserialize_with = "input::blank_as_none")]
    pub employee_counting_method: Option<EmployeeCountingMethod>,
    pub primary_country: String,
    pub previous_report_link: String,
}

impl Section for GeneralInformation {
    fn kind(&self) -> SectionKind {
        SectionKind::GeneralInformation
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::text("entityName", &self.entity_name),
            Field::choice("entityIdentifierScheme", self.entity_identifier_scheme),
            Field::text("entityIdentifier", &self.entity_identifier),
            Field::choice("currency", self.currency),
            Field::date("reportingPeriodStart", self.reporting_period_start),
            Field::date("reportingPeriodEnd", self.reporting_period_end),
            Field::choice("basisModule", self.basis_module),
            Field::choice("basisForReporting", self.basis_for_reporting),
            Field::text("omittedDisclosures", &self.omitted_disclosures),
            Field::number("turnover", &self.turnover),
            Field::number("employeeCount", &self.employee_count),
            Field::choice("employeeCountingMethod", self.employee_counting_method),
            Field::text("primaryCountry", &self.primary_country),
            Field::text("previousReportLink", &self.previous_report_link),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct EnvironmentalDisclosures {
    pub total_energy_consumption: NumberInput,
    pub scope1_emissions: NumberInput,
    pub scope2_emissions: NumberInput,
    pub scope3_emissions: NumberInput,
    pub ghg_intensity: NumberInput,
    #[serde(deserialize_with = "input::blank_as_none")]
    pub has_transition_plan: Option<YesNo>,
    pub transition_plan_description: String,
}

impl Section for EnvironmentalDisclosures {
    fn kind(&self) -> SectionKind {
        SectionKind::EnvironmentalDisclosures
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::number("totalEnergyConsumption", &self.total_energy_consumption),
            Field::number("scope1Emissions", &self.scope1_emissions),
            Field::number("scope2Emissions", &self.scope2_emissions),
            Field::number("scope3Emissions", &self.scope3_emissions),
            Field::number("ghgIntensity", &self.ghg_intensity),
            Field::choice("hasTransitionPlan", self.has_transition_plan),
            Field::text("transitionPlanDescription", &self.transition_plan_description),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SocialDisclosures {
    #[serde(deserialize_with = "input::blank_as_none")]
    pub employee_methodology: Option<EmployeeCountingMethod>,
    pub total_employees: NumberInput,
    pub permanent_employees: NumberInput,
    pub temporary_employees: NumberInput,
    pub turnover_rate: NumberInput,
    pub accident_rate: NumberInput,
    pub fatalities: NumberInput,
}

impl Section for SocialDisclosures {
    fn kind(&self) -> SectionKind {
        SectionKind::SocialDisclosures
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::choice("employeeMethodology", self.employee_methodology),
            Field::number("totalEmployees", &self.total_employees),
            Field::number("permanentEmployees", &self.permanent_employees),
            Field::number("temporaryEmployees", &self.temporary_employees),
            Field::number("turnoverRate", &self.turnover_rate),
            Field::number("accidentRate", &self.accident_rate),
            Field::number("fatalities", &self.fatalities),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GovernanceDisclosures {
    #[serde(deserialize_with = "input::blank_as_none")]
    pub has_anti_corruption_convictions: Option<YesNo>,
    pub convictions_count: NumberInput,
    pub anti_corruption_fines: NumberInput,
    pub fossil_fuel_revenue: NumberInput,
    pub female_board_members: NumberInput,
    pub male_board_members: NumberInput,
}

impl Section for GovernanceDisclosures {
    fn kind(&self) -> SectionKind {
        SectionKind::GovernanceDisclosures
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::choice(
                "hasAntiCorruptionConvictions",
                self.has_anti_corruption_convictions,
            ),
            Field::number("convictionsCount", &self.convictions_count),
            Field::number("antiCorruptionFines", &self.anti_corruption_fines),
            Field::number("fossilFuelRevenue", &self.fossil_fuel_revenue),
            Field::number("femaleBoardMembers", &self.female_board_members),
            Field::number("maleBoardMembers", &self.male_board_members),
        ]
    }
}

/// Everything the wizard has collected so far.
///
/// Sections sit behind `Arc`s: updates produce a new state that shares every
/// section it did not touch. `WizardState::default()` is the full reset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct WizardState {
    pub general_information: Arc<GeneralInformation>,
    pub environmental_disclosures: Arc<EnvironmentalDisclosures>,
    pub social_disclosures: Arc<SocialDisclosures>,
    pub governance_disclosures: Arc<GovernanceDisclosures>,
}

impl WizardState {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Sections in submission order.
    pub fn sections(&self) -> [&dyn Section; 4] {
        [
            &*self.general_information,
            &*self.environmental_disclosures,
            &*self.social_disclosures,
            &*self.governance_disclosures,
        ]
    }

    pub fn update_general_information(&self, update: impl FnOnce(&mut GeneralInformation)) -> Self {
        let mut next = self.clone();
        update(Arc::make_mut(&mut next.general_information));
        next
    }

    pub fn update_environmental_disclosures(
        &self,
        update: impl FnOnce(&mut EnvironmentalDisclosures),
    ) -> Self {
        let mut next = self.clone();
        update(Arc::make_mut(&mut next.environmental_disclosures));
        next
    }

    pub fn update_social_disclosures(&self, update: impl FnOnce(&mut SocialDisclosures)) -> Self {
        let mut next = self.clone();
        update(Arc::make_mut(&mut next.social_disclosures));
        next
    }

    pub fn update_governance_disclosures(
        &self,
        update: impl FnOnce(&mut GovernanceDisclosures),
    ) -> Self {
        let mut next = self.clone();
        update(Arc::make_mut(&mut next.governance_disclosures));
        next
    }

    /// Merge a partial JSON object into one section. Keys not present in the
    /// patch keep their current value; unknown keys are rejected.
    pub fn apply_patch(&self, section: SectionKind, patch: &Map<String, Value>) -> Result<Self, StateError> {
        let mut next = self.clone();
        match section {
            SectionKind::GeneralInformation => {
                next.general_information = Arc::new(merge(section, &*self.general_information, patch)?);
            }
            SectionKind::EnvironmentalDisclosures => {
                next.environmental_disclosures =
                    Arc::new(merge(section, &*self.environmental_disclosures, patch)?);
            }
            SectionKind::SocialDisclosures => {
                next.social_disclosures = Arc::new(merge(section, &*self.social_disclosures, patch)?);
            }
            SectionKind::GovernanceDisclosures => {
                next.governance_disclosures =
                    Arc::new(merge(section, &*self.governance_disclosures, patch)?);
            }
        }
        Ok(next)
    }
}

fn merge<T>(section: SectionKind, current: &T, patch: &Map<String, Value>) -> Result<T, StateError>
where
    T: Serialize + DeserializeOwned,
{
    let patch_error = |source| StateError::Patch { section, source };
    let mut merged = match serde_json::to_value(current).map_err(patch_error)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }
    serde_json::from_value(Value::Object(merged)).map_err(patch_error)
}

/// Lenient readers for raw form input.
mod input {
    use serde::de::{DeserializeOwned, Error};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Blank strings and null read as `None`.
    pub fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(D::Error::custom),
        }
    }
}
