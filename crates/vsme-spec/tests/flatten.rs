use chrono::NaiveDate;
use serde_json::json;

use vsme_spec::{
    Currency, IdentifierScheme, PayloadEntry, SectionKind, WizardState, YesNo, flatten,
};

fn entry(id: &str, value: &str) -> PayloadEntry {
    PayloadEntry::new(id, value)
}

#[test]
fn reporting_period_start_expands_into_four_entries() {
    let state = WizardState::default().update_general_information(|general| {
        general.reporting_period_start = NaiveDate::from_ymd_opt(2024, 3, 15);
    });
    assert_eq!(
        flatten(&state),
        vec![
            entry("reportingPeriodStart", "2024-03-15"),
            entry("reportingPeriodStartYear", "2024"),
            entry("reportingPeriodStartMonth", "3"),
            entry("reportingPeriodStartDay", "15"),
        ]
    );
}

#[test]
fn flattening_is_pure() {
    let state = WizardState::default()
        .update_general_information(|general| {
            general.entity_name = "Acme GmbH".into();
            general.turnover = "1250000".into();
        })
        .update_governance_disclosures(|governance| {
            governance.has_anti_corruption_convictions = Some(YesNo::No);
        });
    let snapshot = state.clone();
    assert_eq!(flatten(&state), flatten(&state));
    assert_eq!(state, snapshot);
}

#[test]
fn blank_state_flattens_to_nothing() {
    assert!(flatten(&WizardState::default()).is_empty());

    let whitespace_only = WizardState::default()
        .update_general_information(|general| {
            general.entity_name = "   ".into();
            general.omitted_disclosures = "\n\t".into();
            general.turnover = "n/a".into();
        })
        .update_environmental_disclosures(|environmental| {
            environmental.transition_plan_description = " ".into();
        });
    assert!(flatten(&whitespace_only).is_empty());
}

#[test]
fn entries_follow_section_and_declaration_order() {
    let state = WizardState::default()
        .update_governance_disclosures(|governance| {
            governance.female_board_members = "3".into();
        })
        .update_general_information(|general| {
            general.entity_name = "Acme GmbH".into();
            general.entity_identifier_scheme = Some(IdentifierScheme::EuId);
            general.currency = Some(Currency::Eur);
            general.reporting_period_end = NaiveDate::from_ymd_opt(2024, 12, 31);
        })
        .update_environmental_disclosures(|environmental| {
            environmental.scope1_emissions = "12.75".into();
            environmental.has_transition_plan = Some(YesNo::Yes);
        });

    assert_eq!(
        flatten(&state),
        vec![
            entry("entityName", "Acme GmbH"),
            entry("entityIdentifierScheme", "EU ID"),
            entry("currency", "EUR"),
            entry("reportingPeriodEnd", "2024-12-31"),
            entry("reportingPeriodEndYear", "2024"),
            entry("reportingPeriodEndMonth", "12"),
            entry("reportingPeriodEndDay", "31"),
            entry("scope1Emissions", "12.75"),
            entry("hasTransitionPlan", "yes"),
            entry("femaleBoardMembers", "3"),
        ]
    );
}

#[test]
fn text_is_sent_as_typed() {
    let state = WizardState::default().update_general_information(|general| {
        general.primary_country = " Austria ".into();
    });
    assert_eq!(flatten(&state), vec![entry("primaryCountry", " Austria ")]);
}

#[test]
fn patched_state_flattens_like_typed_updates() {
    let patch = json!({
        "entityName": "Acme GmbH",
        "reportingPeriodStart": "2024-03-15",
        "employeeCount": "not a number"
    });
    let state = WizardState::default()
        .apply_patch(SectionKind::GeneralInformation, patch.as_object().expect("object"))
        .expect("patch");
    let ids = flatten(&state)
        .into_iter()
        .map(|entry| entry.datapoint_id)
        .collect::<Vec<_>>();
    assert_eq!(
        ids,
        vec![
            "entityName",
            "reportingPeriodStart",
            "reportingPeriodStartYear",
            "reportingPeriodStartMonth",
            "reportingPeriodStartDay",
        ]
    );
}

#[test]
fn payload_serializes_as_datapoint_array() {
    let payload = flatten(&WizardState::default().update_social_disclosures(|social| {
        social.fatalities = "0".into();
    }));
    assert_eq!(
        serde_json::to_value(&payload).expect("encode"),
        json!([{ "datapointId": "fatalities", "values": "0" }])
    );
}

#[test]
fn yes_no_answers_are_sent_as_tokens() {
    let patch = json!({ "hasTransitionPlan": "yes" });
    let state = WizardState::default()
        .apply_patch(SectionKind::EnvironmentalDisclosures, patch.as_object().expect("object"))
        .expect("patch");
    assert_eq!(flatten(&state), vec![entry("hasTransitionPlan", "yes")]);

    let blank = json!({ "hasTransitionPlan": "" });
    let cleared = state
        .apply_patch(SectionKind::EnvironmentalDisclosures, blank.as_object().expect("object"))
        .expect("patch");
    assert!(flatten(&cleared).is_empty());
}

#[test]
fn numbers_are_sent_without_losing_precision() {
    let patch = json!({ "employeeCount": "9007199254740993", "turnover": " 12.50 " });
    let state = WizardState::default()
        .apply_patch(SectionKind::GeneralInformation, patch.as_object().expect("object"))
        .expect("patch");
    assert_eq!(
        flatten(&state),
        vec![
            entry("turnover", "12.50"),
            entry("employeeCount", "9007199254740993"),
        ]
    );
}
