//! Fitlytics CLI - Command-line interface for Fitlytics Core
//!
//! Commands:
//! - activity: Classify one sensor reading or window
//! - fitness: Predict and calibrate a fitness score
//! - calibrate: Calibrate an already-computed raw score
//! - form: Score exercise form from a sensor window
//! - run: Process newline-delimited requests from stdin (streaming mode)
//! - doctor: Diagnose model artifacts and environment
//! - schema: Print input schemas

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use fitlytics_core::calibration::calibrate;
use fitlytics_core::encoder::PredictionEncoder;
use fitlytics_core::fitness::{
    RawFitnessInputs, ACTIVITY_TYPE_OPTIONS, GENDER_OPTIONS, INTENSITY_OPTIONS,
};
use fitlytics_core::form::Exercise;
use fitlytics_core::model::ModelArtifact;
use fitlytics_core::pipeline::parse_object;
use fitlytics_core::types::Channel;
use fitlytics_core::{ComputeError, FitlyticsEngine, PRODUCER_NAME, VERSION};

/// Environment variable read for the log filter
const LOG_ENV: &str = "FITLYTICS_LOG";

/// Fitlytics - Activity classification and fitness scoring for wearable data
#[derive(Parser)]
#[command(name = "fitlytics")]
#[command(version = VERSION)]
#[command(about = "Classify activities and calibrate fitness scores", long_about = None)]
struct Cli {
    /// Log level when FITLYTICS_LOG is unset (logs go to stderr)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a sensor reading into an activity label
    Activity {
        /// Sensor JSON file (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Activity model artifact
        #[arg(short, long)]
        model: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Predict and calibrate a fitness score
    Fitness {
        /// Request JSON file (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Fitness model artifact
        #[arg(short, long)]
        model: PathBuf,

        /// Input holds raw form fields (labels such as "High") rather than model columns
        #[arg(long)]
        raw_inputs: bool,

        /// Include the calibration breakdown
        #[arg(long)]
        explain: bool,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Calibrate a raw model score against request fields
    Calibrate {
        /// Raw model output
        #[arg(allow_hyphen_values = true)]
        raw: f64,

        /// Request JSON file with the auxiliary fields (defaults apply when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Score exercise form from a sensor window (no model needed)
    Form {
        /// Exercise performed during the window
        #[arg(short, long, value_enum)]
        exercise: ExerciseArg,

        /// Sensor JSON file (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Process newline-delimited JSON requests from stdin (streaming mode)
    Run {
        /// Which pipeline each line is sent to
        #[arg(value_enum)]
        pipeline: Pipeline,

        /// Model artifact for the selected pipeline
        #[arg(short, long)]
        model: PathBuf,

        /// Buffer output instead of flushing after each record
        #[arg(long)]
        no_flush: bool,
    },

    /// Diagnose model artifacts and environment
    Doctor {
        /// Activity model artifact to check
        #[arg(long)]
        activity_model: Option<PathBuf>,

        /// Fitness model artifact to check
        #[arg(long)]
        fitness_model: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print input schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON on one line
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum Pipeline {
    Activity,
    Fitness,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExerciseArg {
    JumpingJacks,
    ShadowBoxing,
    ArmRaises,
    Plank,
}

impl From<ExerciseArg> for Exercise {
    fn from(arg: ExerciseArg) -> Self {
        match arg {
            ExerciseArg::JumpingJacks => Exercise::JumpingJacks,
            ExerciseArg::ShadowBoxing => Exercise::ShadowBoxing,
            ExerciseArg::ArmRaises => Exercise::ArmRaises,
            ExerciseArg::Plank => Exercise::Plank,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Sensor reading accepted by `activity`
    Sensor,
    /// Raw form inputs accepted by `fitness --raw-inputs`
    RawInputs,
    /// Model artifact document
    Artifact,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&ErrorBody::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Activity {
            input,
            model,
            output_format,
        } => cmd_activity(&input, &model, &output_format),

        Commands::Fitness {
            input,
            model,
            raw_inputs,
            explain,
            output_format,
        } => cmd_fitness(&input, &model, raw_inputs, explain, &output_format),

        Commands::Calibrate {
            raw,
            input,
            output_format,
        } => cmd_calibrate(raw, input.as_deref(), &output_format),

        Commands::Form {
            exercise,
            input,
            output_format,
        } => cmd_form(exercise.into(), &input, &output_format),

        Commands::Run {
            pipeline,
            model,
            no_flush,
        } => cmd_run(pipeline, &model, !no_flush),

        Commands::Doctor {
            activity_model,
            fitness_model,
            json,
        } => cmd_doctor(activity_model.as_deref(), fitness_model.as_deref(), json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn cmd_activity(input: &Path, model: &Path, format: &OutputFormat) -> Result<(), CliError> {
    let engine = FitlyticsEngine::load(Some(model), None)?;
    let payload = engine.classify_json(&read_input(input)?)?;
    println!("{}", reformat(&payload, format)?);
    Ok(())
}

fn cmd_fitness(
    input: &Path,
    model: &Path,
    raw_inputs: bool,
    explain: bool,
    format: &OutputFormat,
) -> Result<(), CliError> {
    let engine = FitlyticsEngine::load(None, Some(model))?
        .with_encoder(PredictionEncoder::new().include_calibration(explain));
    let input_data = read_input(input)?;

    let payload = if raw_inputs {
        engine.score_raw_inputs_json(&input_data)?
    } else {
        engine.score_json(&input_data)?
    };

    println!("{}", reformat(&payload, format)?);
    Ok(())
}

fn cmd_calibrate(raw: f64, input: Option<&Path>, format: &OutputFormat) -> Result<(), CliError> {
    let request = match input {
        Some(path) => parse_object(&read_input(path)?)?,
        None => serde_json::Map::new(),
    };

    let report = calibrate(raw, &request)?;
    println!("{}", to_json(&report, format)?);
    Ok(())
}

fn cmd_form(exercise: Exercise, input: &Path, format: &OutputFormat) -> Result<(), CliError> {
    let payload = FitlyticsEngine::new().evaluate_form_json(exercise, &read_input(input)?)?;
    println!("{}", reformat(&payload, format)?);
    Ok(())
}

fn cmd_run(pipeline: Pipeline, model: &Path, flush: bool) -> Result<(), CliError> {
    let engine = match pipeline {
        Pipeline::Activity => FitlyticsEngine::load(Some(model), None)?,
        Pipeline::Fitness => FitlyticsEngine::load(None, Some(model))?,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut processed = 0usize;
    let mut failed = 0usize;

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let result = match pipeline {
            Pipeline::Activity => engine.classify_json(trimmed),
            Pipeline::Fitness => engine.score_json(trimmed),
        };

        // Requests are independent: a bad line yields an error record, not an abort
        let output = match result {
            Ok(payload) => payload,
            Err(e) => {
                failed += 1;
                tracing::warn!(line = processed + 1, error = %e, "request failed");
                serde_json::to_string(&ErrorLine {
                    error: ErrorBody::from(CliError::Compute(e)),
                })?
            }
        };
        processed += 1;

        writeln!(stdout, "{}", output)?;
        if flush {
            stdout.flush()?;
        }
    }

    stdout.flush()?;
    tracing::info!(processed, failed, "stream finished");
    Ok(())
}

fn cmd_doctor(
    activity_model: Option<&Path>,
    fitness_model: Option<&Path>,
    json: bool,
) -> Result<(), CliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, VERSION),
    });

    for (name, path) in [("activity_model", activity_model), ("fitness_model", fitness_model)] {
        let Some(path) = path else {
            checks.push(DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Warning,
                message: "not provided".to_string(),
            });
            continue;
        };

        let check = if !path.exists() {
            DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Error,
                message: format!("{} does not exist", path.display()),
            }
        } else {
            match ModelArtifact::load(path) {
                Ok(artifact) => DoctorCheck {
                    name: name.to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "{} loaded ({} features)",
                        path.display(),
                        artifact.feature_names().len()
                    ),
                },
                Err(e) => DoctorCheck {
                    name: name.to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            }
        };
        checks.push(check);
    }

    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (interactive mode)"
    } else {
        "stdin is a pipe (streaming mode ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Fitlytics Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), CliError> {
    match schema_type {
        SchemaType::Sensor => {
            println!("Sensor reading");
            println!();
            println!("A JSON object mapping channel name to a number or an array of numbers.");
            println!("Every channel is optional; missing channels contribute 0 features.");
            println!();
            let names: Vec<&str> = Channel::ALL.iter().map(Channel::as_str).collect();
            println!("Channels: {}", names.join(", "));
            println!();
            println!("Features per motion channel: mean, std, min, max, skew, kurt, energy");
            println!("Composite (ax, ay, az present): acc_mag_mean, acc_mag_std, acc_mag_energy");
            println!("Temperature: temp_mean, temp_std");
            println!("Placeholder: dom_freq (always 0)");
            println!();
            println!("`form` reads the same object; windows under 15 samples score Bad.");
        }
        SchemaType::RawInputs => {
            println!("Raw fitness inputs");
            println!();
            println!("Numeric: calories_burned, duration_minutes, resting_heart_rate, age,");
            println!("         bmi, hours_sleep, daily_steps");
            println!("gender:        {}", GENDER_OPTIONS.join(", "));
            println!("activity_type: {}", ACTIVITY_TYPE_OPTIONS.join(", "));
            println!("intensity:     {}", INTENSITY_OPTIONS.join(", "));
        }
        SchemaType::Artifact => {
            let example = serde_json::json!({
                "feature_names": ["ax_mean", "ax_std", "acc_mag_mean"],
                "predictor": {
                    "kind": "nearest_centroid",
                    "centroids": [
                        { "label": 0, "center": [0.0, 0.1, 1.0] },
                        { "label": 1, "center": [0.3, 1.2, 1.8] }
                    ]
                }
            });
            println!("Model artifact (predictor kinds: linear, nearest_centroid)");
            println!();
            println!("{}", serde_json::to_string_pretty(&example)?);
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, CliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn reformat(payload: &str, format: &OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => Ok(payload.to_string()),
        OutputFormat::JsonPretty => {
            let value: serde_json::Value = serde_json::from_str(payload)?;
            Ok(serde_json::to_string_pretty(&value)?)
        }
    }
}

fn to_json<T: Serialize>(value: &T, format: &OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
    })
}

// Error types

#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<ComputeError> for CliError {
    fn from(e: ComputeError) -> Self {
        CliError::Compute(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    hint: Option<String>,
}

#[derive(Serialize)]
struct ErrorLine {
    error: ErrorBody,
}

impl From<CliError> for ErrorBody {
    fn from(e: CliError) -> Self {
        let (code, hint) = match &e {
            CliError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
            CliError::Json(_) => ("JSON_ERROR", Some("Check JSON syntax")),
            CliError::DoctorFailed => (
                "DOCTOR_FAILED",
                Some("Review the doctor report for details"),
            ),
            CliError::Compute(ComputeError::Validation(_)) => (
                "VALIDATION_ERROR",
                Some("Fields must be numbers or arrays of numbers"),
            ),
            CliError::Compute(ComputeError::ModelInput(_)) => (
                "MODEL_INPUT_ERROR",
                Some("Run 'fitlytics doctor' to inspect the artifact's expected columns"),
            ),
            CliError::Compute(ComputeError::ModelInference(_)) => ("MODEL_INFERENCE_ERROR", None),
            CliError::Compute(ComputeError::ArtifactError(_)) => (
                "ARTIFACT_ERROR",
                Some("Run 'fitlytics schema artifact' for the expected format"),
            ),
            CliError::Compute(ComputeError::JsonError(_)) => {
                ("JSON_ERROR", Some("Check JSON syntax"))
            }
        };

        let message = match e {
            CliError::Io(e) => e.to_string(),
            CliError::Compute(e) => e.to_string(),
            CliError::Json(e) => e.to_string(),
            CliError::DoctorFailed => "One or more health checks failed".to_string(),
        };

        ErrorBody {
            code: code.to_string(),
            message,
            hint: hint.map(str::to_string),
        }
    }
}

// Report types

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
