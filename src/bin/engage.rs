//! Engage CLI - Command-line interface for the engagement scorer
//!
//! Commands:
//! - score: Build an engagement report from event counts
//! - replay: Score recorded classifier traces
//! - features: Inspect the audio window schedule over a WAV file
//! - doctor: Diagnose configuration and the feature extractor
//! - schema: Print report and trace schemas

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use engage_score::audio_windows::{window_features, window_schedule};
use engage_score::classifiers::AudioFeatureExtractor;
use engage_score::encoder::ReportEncoder;
use engage_score::features::{MfccExtractor, FEATURE_COLS, FEATURE_ROWS};
use engage_score::media::AudioTrack;
use engage_score::trace::score_trace;
use engage_score::types::{EyeCounts, ScoreBreakdown};
use engage_score::{AnalysisConfig, AnalysisError, ENGINE_VERSION, PRODUCER_NAME};

/// Engage - Temporal engagement scoring for recorded interviews
#[derive(Parser)]
#[command(name = "engage")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score interview recordings on disfluency, gaze and blink", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an engagement report from event counts
    Score {
        /// Completed disfluency episodes
        #[arg(long)]
        disfluency: u32,

        /// Blink events
        #[arg(long)]
        blink: u32,

        /// Gaze-aversion events
        #[arg(long)]
        gaze: u32,

        /// Source video URL echoed in the report
        #[arg(long)]
        url: Option<String>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Score recorded classifier traces (NDJSON)
    Replay {
        /// Frame trace file (use - for stdin)
        #[arg(long)]
        frames: PathBuf,

        /// Window trace file (use - for stdin)
        #[arg(long)]
        windows: PathBuf,

        /// Source video URL echoed in the report
        #[arg(long)]
        url: Option<String>,

        /// Analysis configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Run the audio window schedule and MFCC extractor over a WAV file
    Features {
        /// WAV file to analyze
        #[arg(long)]
        wav: PathBuf,

        /// Analysis configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and the feature extractor
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Engagement report
    Report,
    /// Frame and window traces
    Trace,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let json = serde_json::to_string(&CliError::from(e))
                .unwrap_or_else(|_| "Unknown error".to_string());
            eprintln!("{}", json);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("engage_score=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_ansi(atty::is(atty::Stream::Stderr))
                    .with_target(true),
            )
            .with(env_filter)
            .init();
    }
}

fn run(cli: Cli) -> Result<(), EngageCliError> {
    match cli.command {
        Commands::Score {
            disfluency,
            blink,
            gaze,
            url,
            pretty,
        } => cmd_score(disfluency, blink, gaze, url.as_deref(), pretty),

        Commands::Replay {
            frames,
            windows,
            url,
            config,
            pretty,
        } => cmd_replay(&frames, &windows, url.as_deref(), config.as_deref(), pretty),

        Commands::Features { wav, config, json } => cmd_features(&wav, config.as_deref(), json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_score(
    disfluency: u32,
    blink: u32,
    gaze: u32,
    url: Option<&str>,
    pretty: bool,
) -> Result<(), EngageCliError> {
    let breakdown = ScoreBreakdown::from_counts(
        disfluency,
        EyeCounts {
            gaze_count: gaze,
            blink_count: blink,
        },
    );
    print_report(&breakdown, url, pretty)
}

fn cmd_replay(
    frames: &Path,
    windows: &Path,
    url: Option<&str>,
    config: Option<&Path>,
    pretty: bool,
) -> Result<(), EngageCliError> {
    if is_stdin(frames) && is_stdin(windows) {
        return Err(EngageCliError::Usage(
            "only one of --frames and --windows may read stdin".to_string(),
        ));
    }

    let config = load_config(config)?;
    let frames_data = read_input(frames)?;
    let windows_data = read_input(windows)?;

    let breakdown = score_trace(&frames_data, &windows_data, &config)?;
    print_report(&breakdown, url, pretty)
}

fn cmd_features(wav: &Path, config: Option<&Path>, json: bool) -> Result<(), EngageCliError> {
    let config = load_config(config)?;
    let track = AudioTrack::from_wav(wav, config.audio.sample_rate)?;
    let extractor = MfccExtractor::default();

    let mut windows = Vec::new();
    for window in window_schedule(&config.audio) {
        let features = window_features(&extractor, &track, window)?;
        windows.push(WindowReport {
            index: window.index,
            start_ms: window.start_ms,
            end_ms: window.end_ms,
            raw_columns: features.raw_columns,
            padded: features.was_padded(),
            truncated: features.was_truncated(),
        });
    }

    let report = FeaturesReport {
        track_ms: track.duration_ms(),
        sample_rate: track.sample_rate(),
        window_count: windows.len(),
        padded_windows: windows.iter().filter(|w| w.padded).count(),
        truncated_windows: windows.iter().filter(|w| w.truncated).count(),
        windows,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Feature Report");
        println!("==============");
        println!("Track length:      {} ms @ {} Hz", report.track_ms, report.sample_rate);
        println!("Windows:           {}", report.window_count);
        println!("Padded windows:    {}", report.padded_windows);
        println!("Truncated windows: {}", report.truncated_windows);
        println!("\n  index  start_ms  end_ms  columns");
        for w in &report.windows {
            let flag = if w.truncated {
                " (truncated)"
            } else if w.padded {
                " (padded)"
            } else {
                ""
            };
            println!(
                "  {:>5}  {:>8}  {:>6}  {:>7}{}",
                w.index, w.start_ms, w.end_ms, w.raw_columns, flag
            );
        }
    }

    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), EngageCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} version {}", PRODUCER_NAME, ENGINE_VERSION),
    });

    // Configuration file if provided, defaults otherwise
    let analysis_config = match config {
        Some(path) if !path.exists() => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist, using defaults".to_string(),
            });
            AnalysisConfig::default()
        }
        Some(path) => match AnalysisConfig::from_file(path) {
            Ok(c) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: "Config file valid".to_string(),
                });
                c
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                });
                AnalysisConfig::default()
            }
        },
        None => AnalysisConfig::default(),
    };

    let audio = &analysis_config.audio;
    let span_ms = audio.window_count.saturating_sub(1) as u64 * audio.stride_ms as u64
        + audio.window_ms as u64;
    checks.push(DoctorCheck {
        name: "window_schedule".to_string(),
        status: if audio.window_count == 0 {
            CheckStatus::Warning
        } else {
            CheckStatus::Ok
        },
        message: format!(
            "{} windows of {} ms every {} ms cover {} ms of audio",
            audio.window_count, audio.window_ms, audio.stride_ms, span_ms
        ),
    });

    // One full window through the extractor must give exactly 32 × 32
    let extractor = MfccExtractor::default();
    let sample_window = AudioTrack::silence(audio.window_ms as u64, audio.sample_rate);
    let extracted = extractor.extract(sample_window.samples(), sample_window.sample_rate());
    let extractor_check = match extracted {
        Ok(m) if m.nrows() == FEATURE_ROWS && m.ncols() == FEATURE_COLS => DoctorCheck {
            name: "feature_extractor".to_string(),
            status: CheckStatus::Ok,
            message: format!("MFCC extractor yields {}x{} per window", m.nrows(), m.ncols()),
        },
        Ok(m) => DoctorCheck {
            name: "feature_extractor".to_string(),
            status: CheckStatus::Warning,
            message: format!(
                "MFCC extractor yields {}x{} per window; matrices will be padded or truncated",
                m.nrows(),
                m.ncols()
            ),
        },
        Err(e) => DoctorCheck {
            name: "feature_extractor".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    };
    checks.push(extractor_check);

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (trace replay ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Engage Doctor Report");
        println!("====================");
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

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(EngageCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), EngageCliError> {
    match schema_type {
        SchemaType::Report => {
            if json_schema {
                println!("{}", get_report_json_schema());
            } else {
                println!("Engagement report");
                println!();
                println!("- timestamp: local time of encoding (YYYY-MM-DD HH:MM:SS.ffffff)");
                println!("- score: composite score, 0 to 495");
                println!("- blink: {{ value }} blink events");
                println!("- gaze: {{ value }} gaze-aversion events");
                println!("- disfluency: {{ value }} completed disfluency episodes");
                println!("- urlvideo: source video URL or null");
            }
        }
        SchemaType::Trace => {
            if json_schema {
                println!("{}", get_trace_json_schema());
            } else {
                println!("Signal traces (NDJSON, one record per line)");
                println!();
                println!("Frame trace, one line per video frame:");
                println!("  {{\"gaze\":\"left\",\"blink\":0.05}}          one face");
                println!("  {{\"faces\":[{{...}},{{...}}]}}              several faces");
                println!("  {{\"faces\":[]}}                          no face detected");
                println!("  gaze: center | left | right; blink: eye-open score in [0, 100]");
                println!();
                println!("Window trace, one line per audio window:");
                println!("  {{\"score\":0.93}}                         disfluency probability");
            }
        }
    }
    Ok(())
}

// Helper functions

fn is_stdin(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_input(path: &Path) -> Result<String, EngageCliError> {
    if is_stdin(path) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, EngageCliError> {
    match path {
        Some(p) => Ok(AnalysisConfig::from_file(p)?),
        None => Ok(AnalysisConfig::default()),
    }
}

fn print_report(
    breakdown: &ScoreBreakdown,
    url: Option<&str>,
    pretty: bool,
) -> Result<(), EngageCliError> {
    let encoder = if pretty {
        ReportEncoder::pretty()
    } else {
        ReportEncoder::new()
    };
    println!("{}", encoder.encode_to_json(breakdown, url)?);
    Ok(())
}

fn get_report_json_schema() -> String {
    let value = serde_json::json!({
        "type": "object",
        "required": ["value"],
        "properties": { "value": { "type": "integer", "minimum": 0 } }
    });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "engagement.report",
        "description": "Engagement score for one interview recording",
        "type": "object",
        "required": ["timestamp", "score", "blink", "gaze", "disfluency", "urlvideo"],
        "properties": {
            "timestamp": { "type": "string" },
            "score": { "type": "number", "minimum": 0, "maximum": 495 },
            "blink": value.clone(),
            "gaze": value.clone(),
            "disfluency": value,
            "urlvideo": { "type": ["string", "null"] }
        }
    })
    .to_string()
}

fn get_trace_json_schema() -> String {
    let observation = serde_json::json!({
        "type": "object",
        "required": ["gaze", "blink"],
        "properties": {
            "gaze": { "type": "string", "enum": ["center", "left", "right"] },
            "blink": { "type": "number", "minimum": 0, "maximum": 100 }
        }
    });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "engagement.trace",
        "$defs": {
            "frame": {
                "oneOf": [
                    observation.clone(),
                    {
                        "type": "object",
                        "required": ["faces"],
                        "properties": { "faces": { "type": "array", "items": observation } }
                    }
                ]
            },
            "window": {
                "type": "object",
                "required": ["score"],
                "properties": { "score": { "type": "number", "minimum": 0, "maximum": 1 } }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum EngageCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
    Usage(String),
    DoctorFailed,
}

impl From<io::Error> for EngageCliError {
    fn from(e: io::Error) -> Self {
        EngageCliError::Io(e)
    }
}

impl From<AnalysisError> for EngageCliError {
    fn from(e: AnalysisError) -> Self {
        EngageCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for EngageCliError {
    fn from(e: serde_json::Error) -> Self {
        EngageCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<EngageCliError> for CliError {
    fn from(e: EngageCliError) -> Self {
        match e {
            EngageCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            EngageCliError::Analysis(e) => {
                let (code, hint) = match &e {
                    AnalysisError::MediaRead(_) => {
                        ("MEDIA_READ_ERROR", "Check that the file is a readable WAV")
                    }
                    AnalysisError::Config(_) => {
                        ("CONFIG_ERROR", "Run 'engage doctor --config <file>' for details")
                    }
                    AnalysisError::TraceParse(_) | AnalysisError::JsonError(_) => {
                        ("TRACE_PARSE_ERROR", "Run 'engage schema trace' for the expected format")
                    }
                    AnalysisError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                    AnalysisError::Classifier(_) | AnalysisError::FeatureShape(_) => {
                        ("ANALYSIS_ERROR", "Review the log output for the failing window")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            EngageCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            EngageCliError::Usage(msg) => CliError {
                code: "USAGE_ERROR".to_string(),
                message: msg,
                hint: Some("Pass at most one input as '-'".to_string()),
            },
            EngageCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct FeaturesReport {
    track_ms: u64,
    sample_rate: u32,
    window_count: usize,
    padded_windows: usize,
    truncated_windows: usize,
    windows: Vec<WindowReport>,
}

#[derive(serde::Serialize)]
struct WindowReport {
    index: u32,
    start_ms: u64,
    end_ms: u64,
    raw_columns: usize,
    padded: bool,
    truncated: bool,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
