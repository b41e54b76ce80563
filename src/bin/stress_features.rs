//! stress-features CLI - batch feature computation for stress-study recordings
//!
//! Commands:
//! - video: Facial/pose features per recording
//! - physio: Baseline-corrected EDA and HRV targets
//! - participant-eda: SCL descriptives used to build baseline tables
//! - baseline build: Reduce feature records into a persisted baseline table
//! - doctor: Check configuration and baseline table availability

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use stress_features::baseline::StatsDir;
use stress_features::physio::{PrecomputedEcg, PrecomputedEda, TimeDomainHrv};
use stress_features::pipeline::process_recordings;
use stress_features::{
    BaselineCatalog, BaselineStatistic, BaselineTable, ComputeError, Config, DataPaths,
    FeatureDictionary, FeatureRecord, PhysioProcessor, Recording, RecordingTable, Reduction,
    VideoProcessor, PRODUCER_NAME, VERSION,
};

/// Feature engine for facial action units, pupil geometry and EDA/ECG targets
#[derive(Parser)]
#[command(name = "stress-features")]
#[command(version = VERSION)]
#[command(about = "Compute stress-study features from recordings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Facial/pose features, one record per input recording
    Video {
        /// Recording CSV files
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Process recordings in parallel (requires the `parallel` feature)
        #[arg(long)]
        parallel: bool,
    },

    /// Baseline-corrected EDA and HRV targets for one recording
    Physio {
        /// Physiological recording CSV (raw_EDA, raw_ECG, t_from_start, pp)
        #[arg(short, long)]
        input: PathBuf,

        /// Exported EDA decomposition (EDA_Tonic, SCR_Peaks)
        #[arg(long)]
        eda_decomposition: Option<PathBuf>,

        /// Exported ECG processing (ECG_Clean, ECG_R_Peaks)
        #[arg(long)]
        ecg_decomposition: Option<PathBuf>,

        /// Data directory holding `information/SCL stats` and `information/HRV stats`
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// SCL descriptives of one recording
    ParticipantEda {
        /// Physiological recording CSV (raw_EDA, t_from_start, pp)
        #[arg(short, long)]
        input: PathBuf,

        /// Exported EDA decomposition (EDA_Tonic, SCR_Peaks)
        #[arg(long)]
        eda_decomposition: PathBuf,

        /// Configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Participant baseline tables
    Baseline {
        #[command(subcommand)]
        command: BaselineCommands,
    },

    /// Check configuration and baseline tables
    Doctor {
        /// Configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Data directory overriding the configured stats paths
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BaselineCommands {
    /// Reduce feature records (NDJSON) into a two-column baseline table
    Build {
        /// Feature records, one JSON object per line (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Feature to reduce (defaults to the statistic's value column)
        #[arg(long)]
        feature: Option<String>,

        /// Statistic to build, e.g. PP_meanSCL_Baseline
        #[arg(long, value_parser = parse_statistic)]
        statistic: BaselineStatistic,

        /// Reduction over each participant's records
        #[arg(long, default_value = "mean")]
        reduction: ReductionArg,

        /// Output CSV path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one feature record per line)
    Ndjson,
    /// JSON array of feature records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum ReductionArg {
    Mean,
    Min,
    Max,
    Std,
}

impl From<ReductionArg> for Reduction {
    fn from(arg: ReductionArg) -> Self {
        match arg {
            ReductionArg::Mean => Reduction::Mean,
            ReductionArg::Min => Reduction::Min,
            ReductionArg::Max => Reduction::Max,
            ReductionArg::Std => Reduction::Std,
        }
    }
}

fn parse_statistic(value: &str) -> Result<BaselineStatistic, String> {
    let stem = value.trim_end_matches(".csv");
    BaselineStatistic::ALL
        .into_iter()
        .find(|s| s.to_string() == stem)
        .ok_or_else(|| {
            let known: Vec<String> = BaselineStatistic::ALL.iter().map(|s| s.to_string()).collect();
            format!("unknown statistic '{}', expected one of: {}", value, known.join(", "))
        })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), StressCliError> {
    match cli.command {
        Commands::Video {
            input,
            output,
            output_format,
            config,
            parallel,
        } => cmd_video(&input, &output, output_format, config.as_deref(), parallel),
        Commands::Physio {
            input,
            eda_decomposition,
            ecg_decomposition,
            data_dir,
            config,
            output,
            output_format,
        } => cmd_physio(
            &input,
            eda_decomposition.as_deref(),
            ecg_decomposition.as_deref(),
            data_dir.as_deref(),
            config.as_deref(),
            &output,
            output_format,
        ),
        Commands::ParticipantEda {
            input,
            eda_decomposition,
            config,
            output,
            output_format,
        } => cmd_participant_eda(
            &input,
            &eda_decomposition,
            config.as_deref(),
            &output,
            output_format,
        ),
        Commands::Baseline {
            command:
                BaselineCommands::Build {
                    input,
                    feature,
                    statistic,
                    reduction,
                    output,
                },
        } => cmd_baseline_build(&input, feature.as_deref(), statistic, reduction.into(), &output),
        Commands::Doctor {
            config,
            data_dir,
            json,
        } => cmd_doctor(config.as_deref(), data_dir.as_deref(), json),
    }
}

fn load_config(path: Option<&Path>, data_dir: Option<&Path>) -> Result<Config, StressCliError> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(dir) = data_dir {
        config.paths = DataPaths::from_data_dir(dir);
    }
    config.validate()?;
    Ok(config)
}

fn cmd_video(
    input: &[PathBuf],
    output: &Path,
    output_format: OutputFormat,
    config: Option<&Path>,
    parallel: bool,
) -> Result<(), StressCliError> {
    let config = load_config(config, None)?;
    let recordings = input
        .iter()
        .map(|path| Recording::from_csv_path(path))
        .collect::<Result<Vec<_>, _>>()?;

    let processor = VideoProcessor::new(config.video);
    let results = if parallel {
        run_parallel(&processor, &recordings)
    } else {
        process_recordings(&processor, &recordings)
    };

    let mut records = Vec::with_capacity(results.len());
    let mut failed = 0;
    for result in results {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                failed += 1;
                tracing::error!(error = %e, "video recording skipped");
            }
        }
    }

    write_output(output, &format_output(&records, &output_format)?)?;
    if failed > 0 {
        return Err(StressCliError::RecordingsFailed(failed));
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn run_parallel(
    processor: &VideoProcessor,
    recordings: &[Recording],
) -> Vec<Result<FeatureRecord, ComputeError>> {
    stress_features::process_recordings_parallel(processor, recordings)
}

#[cfg(not(feature = "parallel"))]
fn run_parallel(
    processor: &VideoProcessor,
    recordings: &[Recording],
) -> Vec<Result<FeatureRecord, ComputeError>> {
    tracing::warn!("built without the parallel feature, processing sequentially");
    process_recordings(processor, recordings)
}

fn cmd_physio(
    input: &Path,
    eda_decomposition: Option<&Path>,
    ecg_decomposition: Option<&Path>,
    data_dir: Option<&Path>,
    config: Option<&Path>,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), StressCliError> {
    if eda_decomposition.is_none() && ecg_decomposition.is_none() {
        return Err(StressCliError::NoCapability);
    }
    let config = load_config(config, data_dir)?;
    let recording = Recording::from_csv_path(input)?;

    let mut statistics = Vec::new();
    let eda = match eda_decomposition {
        Some(path) => {
            statistics.extend(statistics_in(StatsDir::Scl));
            Some(PrecomputedEda::from_table(&RecordingTable::from_csv_path(path)?)?)
        }
        None => None,
    };
    let ecg = match ecg_decomposition {
        Some(path) => {
            statistics.extend(statistics_in(StatsDir::Hrv));
            Some(PrecomputedEcg::from_table(&RecordingTable::from_csv_path(path)?)?)
        }
        None => None,
    };
    let catalog = BaselineCatalog::load_only(&config.paths, &statistics)?;

    let mut processor = PhysioProcessor::new(config.physio, &catalog);
    if let Some(eda) = &eda {
        processor = processor.with_eda(eda);
    }
    if let Some(ecg) = &ecg {
        processor = processor.with_ecg(ecg, &TimeDomainHrv);
    }

    let record = stress_features::RecordingProcessor::process(&processor, &recording)?;
    write_output(output, &format_output(&[record], &output_format)?)
}

fn statistics_in(dir: StatsDir) -> impl Iterator<Item = BaselineStatistic> {
    BaselineStatistic::ALL
        .into_iter()
        .filter(move |s| s.stats_dir() == dir)
}

fn cmd_participant_eda(
    input: &Path,
    eda_decomposition: &Path,
    config: Option<&Path>,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), StressCliError> {
    let config = load_config(config, None)?;
    let recording = Recording::from_csv_path(input)?;
    let eda = PrecomputedEda::from_table(&RecordingTable::from_csv_path(eda_decomposition)?)?;

    let catalog = BaselineCatalog::new();
    let processor = PhysioProcessor::new(config.physio, &catalog).with_eda(&eda);
    let record = processor.participant_eda(&recording)?;
    write_output(output, &format_output(&[record], &output_format)?)
}

fn cmd_baseline_build(
    input: &Path,
    feature: Option<&str>,
    statistic: BaselineStatistic,
    reduction: Reduction,
    output: &Path,
) -> Result<(), StressCliError> {
    let reader: Box<dyn BufRead> = if input.to_string_lossy() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(fs::File::open(input)?))
    };

    let mut rows: Vec<FeatureDictionary> = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: FeatureRecord = serde_json::from_str(trimmed)?;
        rows.push(record.features);
    }
    if rows.is_empty() {
        return Err(StressCliError::NoRecords);
    }

    let feature = feature.unwrap_or_else(|| statistic.value_column());
    let table = BaselineTable::from_feature_rows(statistic, &rows, feature, reduction);
    if table.is_empty() {
        return Err(StressCliError::NoRecords);
    }

    let mut buffer = Vec::new();
    table.write_csv(&mut buffer)?;
    write_output(output, &String::from_utf8_lossy(&buffer))
}

fn cmd_doctor(
    config: Option<&Path>,
    data_dir: Option<&Path>,
    json: bool,
) -> Result<(), StressCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, VERSION),
    });

    let loaded = match config {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
    .and_then(|mut c| {
        if let Some(dir) = data_dir {
            c.paths = DataPaths::from_data_dir(dir);
        }
        c.validate().map(|_| c)
    });

    match loaded {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "window {} samples, arousal top {}",
                    config.video.window_samples(),
                    config.video.arousal_top_k
                ),
            });
            for statistic in BaselineStatistic::ALL {
                let path = statistic.path(&config.paths);
                let check = if !path.exists() {
                    DoctorCheck {
                        name: statistic.to_string(),
                        status: CheckStatus::Warning,
                        message: format!("{} does not exist", path.display()),
                    }
                } else {
                    match BaselineTable::from_csv_path(statistic, &path) {
                        Ok(table) => DoctorCheck {
                            name: statistic.to_string(),
                            status: CheckStatus::Ok,
                            message: format!("{} participants", table.len()),
                        },
                        Err(e) => DoctorCheck {
                            name: statistic.to_string(),
                            status: CheckStatus::Error,
                            message: e.to_string(),
                        },
                    }
                };
                checks.push(check);
            }
        }
        Err(e) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("stress-features Doctor Report");
        println!("=============================");
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
        Err(StressCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn format_output<T: Serialize>(
    records: &[T],
    format: &OutputFormat,
) -> Result<String, StressCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)?),
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), StressCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

#[derive(Debug)]
enum StressCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoCapability,
    NoRecords,
    RecordingsFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for StressCliError {
    fn from(e: io::Error) -> Self {
        StressCliError::Io(e)
    }
}

impl From<ComputeError> for StressCliError {
    fn from(e: ComputeError) -> Self {
        StressCliError::Compute(e)
    }
}

impl From<serde_json::Error> for StressCliError {
    fn from(e: serde_json::Error) -> Self {
        StressCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<StressCliError> for CliError {
    fn from(e: StressCliError) -> Self {
        match e {
            StressCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            StressCliError::Compute(e) => compute_error(e),
            StressCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Input lines must be feature records as written by this tool".to_string()),
            },
            StressCliError::NoCapability => CliError {
                code: "NO_CAPABILITY".to_string(),
                message: "Neither --eda-decomposition nor --ecg-decomposition given".to_string(),
                hint: Some("Pass at least one exported decomposition".to_string()),
            },
            StressCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No usable feature records in input".to_string(),
                hint: Some("Records need a pp field and the requested feature".to_string()),
            },
            StressCliError::RecordingsFailed(count) => CliError {
                code: "RECORDINGS_FAILED".to_string(),
                message: format!("{} recordings failed", count),
                hint: Some("Set RUST_LOG=warn for per-recording errors".to_string()),
            },
            StressCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report above".to_string()),
            },
        }
    }
}

fn compute_error(e: ComputeError) -> CliError {
    let (code, hint) = match &e {
        ComputeError::MissingChannel(_) => (
            "MISSING_CHANNEL",
            Some("Check the recording's column names"),
        ),
        ComputeError::MissingBaseline { .. } => (
            "MISSING_BASELINE",
            Some("Build the baseline tables for this participant first"),
        ),
        ComputeError::BaselineUnavailable(_) => (
            "BASELINE_UNAVAILABLE",
            Some("Run 'stress-features doctor' to locate baseline tables"),
        ),
        ComputeError::UndefinedFrequency(_) => (
            "UNDEFINED_FREQUENCY",
            Some("Recording needs at least two increasing timestamps"),
        ),
        ComputeError::DecompositionFailure(_) => (
            "DECOMPOSITION_FAILURE",
            Some("Exported decomposition must cover the same samples as the recording"),
        ),
        ComputeError::ConfigError(_) => ("CONFIG_ERROR", Some("Check the configuration file")),
        ComputeError::ParseError(_) | ComputeError::Csv(_) | ComputeError::SchemaError(_) => {
            ("PARSE_ERROR", Some("Input must be a CSV table with a header row"))
        }
        ComputeError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
        ComputeError::JsonError(_) => ("JSON_ERROR", None),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: hint.map(str::to_string),
    }
}

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
