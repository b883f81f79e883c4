mod logging;
mod wizard;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use vsme_client::{
    ClientConfig, DEFAULT_BASE_URL, ReportClient, SubmitError, WizardSession, save_report,
};
use vsme_spec::{
    ArtifactFormat, DataModel, EntityNameField, FieldValue, GenerateOptions, SectionKind,
    ValidationResult, WizardState, flatten, generate, render, validate_number,
};
use wizard::{StepOutcome, Verbosity, WizardInput, WizardPresenter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "VSME sustainability report tooling",
    long_about = "Generates datapoint validators from the VSME data model, flattens wizard state and requests the populated report spreadsheet"
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SchemaFormat {
    Zod,
    JsonSchema,
}

impl From<SchemaFormat> for ArtifactFormat {
    fn from(format: SchemaFormat) -> Self {
        match format {
            SchemaFormat::Zod => ArtifactFormat::Zod,
            SchemaFormat::JsonSchema => ArtifactFormat::JsonSchema,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Generate datapoint validators from a data model description.
    Generate {
        /// Data model description JSON.
        #[arg(long, value_name = "MODEL")]
        model: PathBuf,
        /// File to write; prints to stdout when omitted.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Artifact flavour.
        #[arg(long, value_enum, default_value_t = SchemaFormat::Zod)]
        format: SchemaFormat,
        /// Only include modules whose code matches one of these globs (e.g. `B*`).
        #[arg(long, value_name = "GLOB", value_delimiter = ',')]
        modules: Vec<String>,
        /// Fail on unknown datapoint types instead of accepting any value.
        #[arg(long)]
        strict: bool,
    },
    /// Print the JSON Schema of the data model description format.
    ModelSchema,
    /// Validate module values against the generated validators.
    Validate {
        /// Data model description JSON.
        #[arg(long, value_name = "MODEL")]
        model: PathBuf,
        /// Module code, e.g. B1.
        #[arg(long, value_name = "CODE")]
        module: String,
        /// JSON object of datapoint values.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
    },
    /// Print the flattened report payload for a saved wizard state.
    Flatten {
        /// Wizard state JSON.
        #[arg(long, value_name = "STATE")]
        state: PathBuf,
    },
    /// Submit a saved wizard state and save the returned report.
    Submit {
        /// Wizard state JSON.
        #[arg(long, value_name = "STATE")]
        state: PathBuf,
        /// Report service base URL.
        #[arg(long, env = "VSME_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,
        /// Directory for the downloaded report (defaults to VSME_OUTPUT_DIR or the current directory).
        #[arg(long, env = "VSME_OUTPUT_DIR", value_name = "DIR")]
        out_dir: Option<PathBuf>,
        /// Post the nested state to the legacy submission endpoint instead.
        #[arg(long)]
        legacy: bool,
    },
    /// Walk through the report wizard in a text shell.
    Wizard {
        /// Optional wizard state JSON to start from.
        #[arg(long, value_name = "STATE")]
        state: Option<PathBuf>,
        /// Report service base URL.
        #[arg(long, env = "VSME_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,
        /// Directory for the downloaded report (defaults to VSME_OUTPUT_DIR or the current directory).
        #[arg(long, env = "VSME_OUTPUT_DIR", value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    match cli.command {
        Command::Generate {
            model,
            out,
            format,
            modules,
            strict,
        } => run_generate(model, out, format, modules, strict),
        Command::ModelSchema => run_model_schema(),
        Command::Validate {
            model,
            module,
            values,
        } => run_validate(model, module, values),
        Command::Flatten { state } => run_flatten(state),
        Command::Submit {
            state,
            base_url,
            out_dir,
            legacy,
        } => run_submit(state, base_url, out_dir, legacy),
        Command::Wizard {
            state,
            base_url,
            out_dir,
        } => run_wizard(state, base_url, out_dir, cli.verbose > 0),
    }
}

fn run_generate(
    model_path: PathBuf,
    out: Option<PathBuf>,
    format: SchemaFormat,
    modules: Vec<String>,
    strict: bool,
) -> CliResult<()> {
    let model = read_model(&model_path)?;
    let options = GenerateOptions { strict, modules };
    let set = generate(&model, &options)?;
    for warning in set.warnings() {
        eprintln!(
            "warning: datapoint '{}' has unknown type '{}'; it accepts any value",
            warning.datapoint_id, warning.data_type
        );
    }
    let rendered = render(&set, format.into())?;

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, rendered)?;
            info!(path = %path.display(), "generated validators");
            println!(
                "Generated {} datapoint schemas across {} modules into {}",
                set.len(),
                set.modules().len(),
                path.display()
            );
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn run_model_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(DataModel);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_validate(model_path: PathBuf, module: String, values_path: PathBuf) -> CliResult<()> {
    let model = read_model(&model_path)?;
    let set = generate(&model, &GenerateOptions::default())?;
    let values_json = fs::read_to_string(values_path)?;
    let values: Value = serde_json::from_str(&values_json)?;

    let result = set
        .validate_module(&module, &values)
        .ok_or_else(|| format!("module '{}' is not part of the data model", module))?;
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!(
                "  {} - {}",
                error.path.as_deref().unwrap_or("<unknown>"),
                error.message
            );
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required datapoints: {}",
            result.missing_required.join(", ")
        );
    }
    if !result.unknown_fields.is_empty() {
        println!(
            "Unknown datapoints (ignored): {}",
            result.unknown_fields.join(", ")
        );
    }
}

fn run_flatten(state_path: PathBuf) -> CliResult<()> {
    let state = read_state(&state_path)?;
    let payload = flatten(&state);
    if payload.is_empty() {
        return Err(SubmitError::EmptyPayload.to_string().into());
    }
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_submit(
    state_path: PathBuf,
    base_url: String,
    out_dir: Option<PathBuf>,
    legacy: bool,
) -> CliResult<()> {
    let state = read_state(&state_path)?;
    let client = ReportClient::new(ClientConfig::new(base_url));
    let mut session = WizardSession::new(state);
    let runtime = runtime()?;

    if legacy {
        let receipt = runtime
            .block_on(session.submit_legacy(&client))
            .map_err(|error| error.to_string())?;
        println!(
            "Submission accepted: {}",
            receipt.message.as_deref().unwrap_or("ok")
        );
        return Ok(());
    }

    let report = runtime
        .block_on(session.submit(&client))
        .map_err(|error| error.to_string())?;
    let out_dir = resolve_output_dir(out_dir)?;
    let path = save_report(&report, &out_dir).map_err(|error| error.to_string())?;
    println!("Report saved to {}", path.display());
    Ok(())
}

fn run_wizard(
    state_path: Option<PathBuf>,
    base_url: String,
    out_dir: Option<PathBuf>,
    verbose: bool,
) -> CliResult<()> {
    let state = match state_path {
        Some(path) => read_state(&path)?,
        None => WizardState::default(),
    };
    let out_dir = resolve_output_dir(out_dir)?;
    let client = ReportClient::new(ClientConfig::new(base_url));
    let runtime = runtime()?;
    let mut session = WizardSession::new(state);
    let mut presenter = WizardPresenter::new(Verbosity::from_verbose(verbose));
    presenter.show_header(client.config().base_url());

    loop {
        let step = wizard::step(session.current_step());
        presenter.show_step(step);

        if let Some(section) = step.section {
            match prompt_section(&mut session, section, &presenter)? {
                StepOutcome::Next => session.next_step(),
                StepOutcome::Back => session.previous_step(),
            };
            continue;
        }

        presenter.show_summary(&flatten(session.state()));
        println!("Generate the report now? [y/N]");
        match WizardInput::parse(&read_answer()?) {
            WizardInput::PreviousStep => {
                session.previous_step();
                continue;
            }
            WizardInput::Exit => return Err("wizard aborted by user".into()),
            WizardInput::Value(answer)
                if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") => {}
            _ => {
                println!("Submission skipped.");
                return Ok(());
            }
        }

        match runtime.block_on(session.submit(&client)) {
            Ok(report) => {
                let path = save_report(&report, &out_dir).map_err(|error| error.to_string())?;
                presenter.show_saved(&path);
                return Ok(());
            }
            Err(error @ (SubmitError::EmptyPayload | SubmitError::InvalidFields(_))) => {
                presenter.show_submit_error(&error.to_string());
                session.go_to_step(1);
            }
            Err(error) => {
                presenter.show_submit_error(&error.to_string());
                return Err(error.to_string().into());
            }
        }
    }
}

/// Prompt every field of one section. Returns early when the user changes
/// step.
fn prompt_section(
    session: &mut WizardSession,
    section: SectionKind,
    presenter: &WizardPresenter,
) -> CliResult<StepOutcome> {
    let ids = wizard::field_ids(session.state(), section);
    for id in ids {
        loop {
            presenter.show_prompt(id, wizard::current_value(session.state(), section, id).as_ref());
            let raw = match WizardInput::parse(&read_answer()?) {
                WizardInput::Keep => break,
                WizardInput::NextStep => return Ok(StepOutcome::Next),
                WizardInput::PreviousStep => return Ok(StepOutcome::Back),
                WizardInput::Exit => return Err("wizard aborted by user".into()),
                WizardInput::Value(raw) => raw,
            };

            if section == SectionKind::GeneralInformation && id == "entityName" {
                if commit_entity_name(session, presenter, &raw) {
                    break;
                }
                continue;
            }

            let mut patch = Map::new();
            patch.insert(id.to_string(), Value::String(raw));
            match session.apply_patch(section, &patch) {
                Ok(()) => {
                    if let Some(FieldValue::Number(input)) =
                        wizard::current_value(session.state(), section, id)
                        && let Err(error) = validate_number(input.raw())
                    {
                        presenter.show_field_error(&error);
                        continue;
                    }
                    break;
                }
                Err(error) => presenter.show_state_error(&error),
            }
        }
    }
    Ok(StepOutcome::Next)
}

/// Store the typed entity name, then the blur-normalized one. Returns whether
/// the final value is valid.
fn commit_entity_name(session: &mut WizardSession, presenter: &WizardPresenter, raw: &str) -> bool {
    let mut field = EntityNameField::new(session.state().general_information.entity_name.clone());
    let typed = field.on_change(raw).to_string();
    session.update(|state| state.update_general_information(|general| general.entity_name = typed));

    if let Some(normalized) = field.on_blur() {
        presenter.show_normalized(&normalized);
        session.update(|state| {
            state.update_general_information(|general| general.entity_name = normalized)
        });
    }
    match field.display_error() {
        Some(error) => {
            presenter.show_field_error(error);
            false
        }
        None => true,
    }
}

fn read_answer() -> CliResult<String> {
    print!("> ");
    io::stdout().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Err("input closed before the wizard finished".into());
    }
    Ok(input)
}

fn read_model(path: &Path) -> CliResult<DataModel> {
    let contents = fs::read_to_string(path)?;
    let model = DataModel::from_json(&contents)?;
    info!(modules = model.module_count(), "loaded data model description");
    Ok(model)
}

fn read_state(path: &Path) -> CliResult<WizardState> {
    let contents = fs::read_to_string(path)?;
    Ok(WizardState::from_json(&contents)?)
}

fn resolve_output_dir(out: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = out.unwrap_or_else(|| PathBuf::from("."));
    if candidate.as_os_str().is_empty() {
        return Err("output directory cannot be empty".into());
    }
    if candidate.is_file() {
        warn!(path = %candidate.display(), "output directory points at a file");
        return Err(format!("{} is a file, not a directory", candidate.display()).into());
    }
    Ok(candidate)
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
