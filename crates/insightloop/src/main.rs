mod config;
mod extract;
mod interview;
mod transcripts;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use insightloop_core::InterviewOutcome;
use insightloop_guide::StudyConfig;
use insightloop_logging::{init_tracing, LogFormat, Logger};
use insightloop_oracle::OracleKind;

use config::{PersistenceMode, ProjectConfig};
use transcripts::TranscriptsAction;

#[derive(Parser, Debug)]
#[command(
    name = "insightloop",
    about = "Adaptive qualitative interviews driven by a study guide",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Working directory holding insightloop.toml (default: current directory)
    #[arg(short = 'd', long, global = true)]
    working_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Tracing filter for diagnostics on stderr
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Also append structured events to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Oracle backend (overrides insightloop.toml)
    #[arg(long, value_enum, global = true)]
    oracle: Option<OracleChoice>,

    /// Model to use (if the backend supports it)
    #[arg(short, long, global = true)]
    model: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a study guide from raw notes or documents
    Extract {
        /// Files to extract questions from (text, markdown or PDF)
        inputs: Vec<PathBuf>,

        /// Raw guide text to extract from
        #[arg(long)]
        text: Option<String>,

        /// Study name
        #[arg(long)]
        name: Option<String>,

        /// Research goal
        #[arg(long)]
        goal: Option<String>,

        /// Where to write the guide (.toml or .json)
        #[arg(short, long, default_value = "guide.toml")]
        output: PathBuf,

        /// Append to an existing guide at --output instead of replacing it
        #[arg(long)]
        append: bool,
    },

    /// Interview a respondent in the terminal
    Run {
        /// Study guide to interview with
        #[arg(short, long, default_value = "guide.toml")]
        guide: PathBuf,

        /// Where completed transcripts go (overrides insightloop.toml)
        #[arg(long, value_enum)]
        persistence: Option<PersistenceChoice>,

        /// Seconds to wait for each interview decision
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Output final result as JSON
        #[arg(long)]
        json_output: bool,
    },

    /// Check a study guide without starting an interview
    Validate {
        /// Study guide to check
        #[arg(short, long, default_value = "guide.toml")]
        guide: PathBuf,
    },

    /// Browse saved transcripts
    Transcripts {
        #[command(subcommand)]
        action: TranscriptsAction,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OracleChoice {
    Gemini,
    Command,
    Offline,
}

impl From<OracleChoice> for OracleKind {
    fn from(choice: OracleChoice) -> Self {
        match choice {
            OracleChoice::Gemini => OracleKind::Gemini,
            OracleChoice::Command => OracleKind::Command,
            OracleChoice::Offline => OracleKind::Offline,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PersistenceChoice {
    Sqlite,
    Bridge,
    Mock,
}

impl From<PersistenceChoice> for PersistenceMode {
    fn from(choice: PersistenceChoice) -> Self {
        match choice {
            PersistenceChoice::Sqlite => PersistenceMode::Sqlite,
            PersistenceChoice::Bridge => PersistenceMode::Bridge,
            PersistenceChoice::Mock => PersistenceMode::Mock,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing(&cli.log_level, log_format);

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let mut project = ProjectConfig::load(&working_dir)?.unwrap_or_default();
    if let Some(ref model) = cli.model {
        project.oracle.model = Some(model.clone());
    }

    let oracle_kind = match cli.oracle {
        Some(choice) => choice.into(),
        None => project.oracle.kind()?,
    };

    let logger = match cli.log_file {
        Some(ref path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };
    let logger = Arc::new(logger);

    match cli.command {
        Commands::Extract {
            inputs,
            text,
            name,
            goal,
            output,
            append,
        } => {
            let oracle = project.oracle.extraction_oracle(oracle_kind)?;
            let request = extract::ExtractRequest {
                inputs,
                text,
                name,
                goal,
                output,
                append,
            };
            extract::handle_extract_command(request, oracle.as_ref(), &logger).await
        }
        Commands::Run {
            guide,
            persistence,
            timeout_secs,
            json_output,
        } => {
            let config = load_guide(&guide)?;
            let mode = persistence
                .map(PersistenceMode::from)
                .unwrap_or(project.persistence.mode);

            let oracle = project.oracle.decision_oracle(oracle_kind)?;
            let gateway = if mode == PersistenceMode::Bridge {
                let bridge = project.persistence.bridge_gateway()?;
                match bridge.health().await {
                    Ok(message) => tracing::info!(endpoint = bridge.endpoint(), "{}", message),
                    Err(e) => eprintln!(
                        "{} relay at {} is not answering ({}). Transcripts may not be saved.",
                        "Warning:".bright_yellow(),
                        bridge.endpoint(),
                        e
                    ),
                }
                Arc::new(bridge) as Arc<dyn insightloop_core::TranscriptGateway>
            } else {
                project.persistence.gateway(mode)?
            };

            let timeout = timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(project.oracle.timeout);

            let outcome =
                interview::run_interview(config, oracle, gateway, logger, timeout).await?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&outcome);
            }

            std::process::exit(outcome.exit_code());
        }
        Commands::Validate { guide } => {
            let config = load_guide(&guide)?;
            print_guide(&config);
            Ok(())
        }
        Commands::Transcripts { action } => {
            let db = project.persistence.open_database()?;
            transcripts::handle_transcripts_command(action, &db)
        }
    }
}

fn load_guide(path: &std::path::Path) -> Result<StudyConfig> {
    let config = StudyConfig::load(path)
        .with_context(|| format!("Failed to load guide {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Guide {} is not ready", path.display()))?;
    Ok(config)
}

fn print_guide(config: &StudyConfig) {
    println!("{}", "=== Study Guide ===".bright_blue().bold());
    println!("{}  {}", "Study:".dimmed(), config.study_name);
    println!("{}  {}", "Goal:".dimmed(), config.research_goal);
    println!();
    for (i, question) in config.core_questions.iter().enumerate() {
        println!(
            "  {} {}",
            format!("[{}]", i + 1).bright_blue(),
            question.text
        );
        for probe in &question.predefined_probes {
            println!("      {} {}", "-".dimmed(), probe);
        }
    }
    println!();
    println!(
        "{}",
        format!("{} core questions, ready to run.", config.question_count()).bright_green()
    );
}

fn print_outcome(outcome: &InterviewOutcome) {
    match outcome {
        InterviewOutcome::Completed {
            respondent_id,
            steps,
            fallbacks,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("=== COMPLETED ===");
            eprintln!("Respondent: {}", respondent_id);
            eprintln!("Questions asked: {}", steps);
            if *fallbacks > 0 {
                eprintln!("Oracle fallbacks: {}", fallbacks);
            }
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        InterviewOutcome::Exited {
            respondent_id,
            steps,
        } => {
            eprintln!();
            eprintln!("=== EXITED ===");
            eprintln!("Respondent: {}", respondent_id);
            eprintln!("Questions asked: {}", steps);
            eprintln!("Nothing was saved.");
        }
    }
}
