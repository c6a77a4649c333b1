//! Terminal respondent loop.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use colored::Colorize;
use tokio::sync::{mpsc, Notify};

use insightloop_core::{
    InterviewOutcome, InterviewRunner, StepKind, Submission, TranscriptGateway,
};
use insightloop_guide::StudyConfig;
use insightloop_logging::Logger;
use insightloop_oracle::DecisionOracle;

const EXIT_COMMAND: &str = ":exit";
const PERSISTENCE_GRACE: Duration = Duration::from_secs(30);

pub async fn run_interview(
    config: StudyConfig,
    oracle: Arc<dyn DecisionOracle>,
    gateway: Arc<dyn TranscriptGateway>,
    logger: Arc<Logger>,
    decision_timeout: Duration,
) -> Result<InterviewOutcome> {
    let study_name = config.study_name.clone();
    let runner = InterviewRunner::start(config, oracle, gateway, logger)
        .context("Failed to start interview")?
        .with_decision_timeout(decision_timeout);

    // Handle Ctrl+C by ending the session without saving
    let interrupt = Arc::new(Notify::new());
    let interrupt_handle = Arc::clone(&interrupt);
    ctrlc::set_handler(move || {
        interrupt_handle.notify_one();
    })
    .context("Failed to set Ctrl+C handler")?;

    let mut lines = spawn_stdin_reader();
    // Lines received before this instant belong to an earlier question
    let mut accepting_since = Instant::now();

    eprintln!();
    eprintln!("{}", format!("=== {} ===", study_name).bright_blue().bold());
    eprintln!(
        "{}",
        format!("Type your answer and press Enter. {} or Ctrl+C ends the interview.", EXIT_COMMAND)
            .dimmed()
    );

    loop {
        let Some((kind, question)) = runner.current_question() else {
            return runner.exit().context("Interview has no open question");
        };
        print_question(kind, &question, runner.progress());

        let (line, dropped) = next_answer(&mut lines, &interrupt, accepting_since).await;
        if dropped > 0 {
            eprintln!(
                "{}",
                format!("Ignored {} line(s) typed while waiting.", dropped).dimmed()
            );
        }

        // EOF and Ctrl+C both end the session early
        let Some(line) = line else {
            return exit_early(&runner);
        };
        if line.trim() == EXIT_COMMAND {
            return exit_early(&runner);
        }
        if line.trim().is_empty() {
            continue;
        }

        eprint!("{}", "Thinking...".dimmed());
        std::io::stderr().flush().ok();

        let submission = tokio::select! {
            submission = runner.submit(&line) => submission,
            _ = interrupt.notified() => {
                eprintln!();
                return exit_early(&runner);
            }
        };
        eprint!("\r{}\r", " ".repeat(12));
        accepting_since = Instant::now();

        match submission {
            Submission::Asked { .. } | Submission::Ignored => continue,
            Submission::Completed(outcome) => {
                eprintln!();
                eprintln!(
                    "{}",
                    "Thank you! Your responses have been recorded.".bright_green()
                );
                wait_for_persistence(&runner).await;
                return Ok(outcome);
            }
        }
    }
}

fn exit_early(runner: &InterviewRunner) -> Result<InterviewOutcome> {
    runner.exit().context("Failed to end interview")
}

fn print_question(kind: StepKind, question: &str, progress: u8) {
    eprintln!();
    let marker = match kind {
        StepKind::Core => format!("[{:>3}%]", progress).bright_blue(),
        StepKind::Probe => format!("[{:>3}%] follow-up", progress).bright_yellow(),
    };
    eprintln!("{} {}", marker, question.bold());
    eprint!("{} ", ">".dimmed());
    std::io::stderr().flush().ok();
}

async fn wait_for_persistence(runner: &InterviewRunner) {
    let Some(handle) = runner.take_persistence() else {
        return;
    };

    match tokio::time::timeout(PERSISTENCE_GRACE, handle).await {
        Ok(Ok(outcome)) if outcome.is_saved() => {
            eprintln!("{}", outcome.message().dimmed());
        }
        Ok(Ok(outcome)) => {
            eprintln!("{} {}", "Save failed:".bright_red(), outcome.message());
        }
        Ok(Err(e)) => {
            eprintln!("{} {}", "Save task failed:".bright_red(), e);
        }
        Err(_) => {
            eprintln!(
                "{}",
                format!("Save still pending after {:?}; giving up.", PERSISTENCE_GRACE)
                    .bright_yellow()
            );
        }
    }
}

/// A line of respondent input, stamped when the reader thread received it
#[derive(Debug)]
struct InputLine {
    text: String,
    received_at: Instant,
}

impl InputLine {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Instant::now(),
        }
    }
}

/// Read stdin lines on a dedicated thread so the loop can select on Ctrl+C
fn spawn_stdin_reader() -> mpsc::Receiver<InputLine> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(InputLine::new(line)).is_err() {
                break;
            }
        }
    });
    rx
}

/// Wait for the first line received at or after `since`.
///
/// Earlier lines were typed while a decision was in flight and are counted
/// and discarded. Returns `None` on EOF or Ctrl+C.
async fn next_answer(
    lines: &mut mpsc::Receiver<InputLine>,
    interrupt: &Notify,
    since: Instant,
) -> (Option<String>, usize) {
    let mut dropped = 0;
    loop {
        let next = tokio::select! {
            line = lines.recv() => line,
            _ = interrupt.notified() => None,
        };

        match next {
            Some(line) if line.received_at < since => dropped += 1,
            Some(line) => return (Some(line.text), dropped),
            None => return (None, dropped),
        }
    }
}
