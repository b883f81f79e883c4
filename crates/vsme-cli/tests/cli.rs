use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use serde_json::{Value, json};
use tempfile::TempDir;

const MODEL: &str = include_str!("../../vsme-spec/tests/fixtures/vsme_data_model.json");

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn cli() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vsme-report"));
    cmd.env_remove("VSME_API_BASE_URL")
        .env_remove("VSME_OUTPUT_DIR")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn generate_writes_json_schema() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let model = write_file(&dir, "model.json", MODEL);
    let out = dir.path().join("generated").join("datapoints.schema.json");

    cli()
        .arg("generate")
        .arg("--model")
        .arg(&model)
        .arg("--out")
        .arg(&out)
        .arg("--format")
        .arg("json-schema")
        .assert()
        .success();

    let document: Value = serde_json::from_str(&fs::read_to_string(&out)?)?;
    assert_eq!(document["$defs"]["entityName"]["maxLength"], 120);
    assert_eq!(document["properties"]["C1"]["x-tier"], "comprehensive");
    Ok(())
}

#[test]
fn generate_filters_modules_and_prints_zod() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let model = write_file(&dir, "model.json", MODEL);

    let output = cli()
        .arg("generate")
        .arg("--model")
        .arg(&model)
        .arg("--modules")
        .arg("B1")
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("// Total datapoints: 10"));
    assert!(!stdout.contains("\"B3\""));
    Ok(())
}

#[test]
fn strict_generation_fails_on_unknown_type() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let model = write_file(&dir, "model.json", MODEL);

    let output = cli()
        .arg("generate")
        .arg("--model")
        .arg(&model)
        .arg("--strict")
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)?.contains("geojson"));
    Ok(())
}

#[test]
fn model_schema_describes_the_description_format() -> Result<(), Box<dyn std::error::Error>> {
    let output = cli().arg("model-schema").output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let schema: Value = serde_json::from_str(&stdout)?;
    assert_eq!(schema["title"], "DataModel");
    assert!(stdout.contains("coreReport"));
    Ok(())
}

#[test]
fn validate_reports_missing_datapoints() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let model = write_file(&dir, "model.json", MODEL);
    let values = write_file(&dir, "values.json", r#"{ "entityName": "Acme GmbH" }"#);

    let output = cli()
        .arg("validate")
        .arg("--model")
        .arg(&model)
        .arg("--module")
        .arg("B1")
        .arg("--values")
        .arg(&values)
        .output()?;
    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Validation result: invalid"));
    assert!(stdout.contains("Missing required datapoints: entityIdentifierScheme, currency"));
    Ok(())
}

#[test]
fn flatten_prints_date_expansion() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let state = write_file(
        &dir,
        "state.json",
        &json!({ "generalInformation": { "reportingPeriodStart": "2024-03-15" } }).to_string(),
    );

    let output = cli().arg("flatten").arg("--state").arg(&state).output()?;
    assert!(output.status.success());
    let payload: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(
        payload,
        json!([
            { "datapointId": "reportingPeriodStart", "values": "2024-03-15" },
            { "datapointId": "reportingPeriodStartYear", "values": "2024" },
            { "datapointId": "reportingPeriodStartMonth", "values": "3" },
            { "datapointId": "reportingPeriodStartDay", "values": "15" }
        ])
    );
    Ok(())
}

#[test]
fn flatten_rejects_blank_state() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let state = write_file(&dir, "state.json", r#"{ "generalInformation": { "entityName": "  " } }"#);

    cli()
        .arg("flatten")
        .arg("--state")
        .arg(&state)
        .assert()
        .failure();
    Ok(())
}

#[test]
fn submit_reports_unreachable_service() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let state = write_file(
        &dir,
        "state.json",
        r#"{ "generalInformation": { "entityName": "Acme GmbH" } }"#,
    );

    let output = cli()
        .arg("submit")
        .arg("--state")
        .arg(&state)
        .arg("--base-url")
        .arg("http://127.0.0.1:9")
        .arg("--out-dir")
        .arg(dir.path())
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)?.contains("Connection error"));
    Ok(())
}

#[test]
fn wizard_normalizes_entity_name_and_can_skip_submission() -> Result<(), Box<dyn std::error::Error>>
{
    let workspace = assert_fs::TempDir::new()?;
    let answers = ["Company   XYZ", ":next", ":next", ":next", ":next", "n"];
    let stdin = format!("{}\n", answers.join("\n"));

    let output = cli()
        .arg("wizard")
        .arg("--out-dir")
        .arg(workspace.path())
        .write_stdin(stdin)
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Entity name normalized to 'Company XYZ'"));
    assert!(stdout.contains("entityName = Company XYZ"));
    assert!(stdout.contains("Submission skipped."));
    Ok(())
}

#[test]
fn wizard_keeps_prompting_until_entity_name_is_valid() -> Result<(), Box<dyn std::error::Error>> {
    let answers = ["A", "Acme GmbH", ":next", ":next", ":next", ":next", "exit"];
    let stdin = format!("{}\n", answers.join("\n"));

    let output = cli().arg("wizard").write_stdin(stdin).output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("at least three readable characters"));
    assert!(String::from_utf8(output.stdout)?.contains("entityName = Acme GmbH"));
    Ok(())
}

#[test]
fn wizard_flags_unreadable_numbers_and_keeps_them() -> Result<(), Box<dyn std::error::Error>> {
    let mut answers = vec!["Acme GmbH"];
    answers.extend([""; 8]);
    answers.extend(["1,5", "", ":next", ":next", ":next", ":next", "n"]);
    let stdin = format!("{}\n", answers.join("\n"));

    let output = cli().arg("wizard").write_stdin(stdin).output()?;
    assert!(output.status.success());
    assert!(String::from_utf8(output.stderr)?.contains("'1,5' is not a number"));
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Turnover [1,5]"));
    assert!(!stdout.contains("turnover = "));
    Ok(())
}
