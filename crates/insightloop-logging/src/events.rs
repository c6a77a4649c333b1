use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for an interview session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    InterviewStarted {
        study_name: String,
        respondent_id: String,
        core_questions: usize,
        oracle: String,
    },
    AnswerRecorded {
        step: usize,
        probe: bool,
        answer_chars: usize,
    },
    DecisionReceived {
        step: usize,
        decision: String,
        reasoning: String,
    },
    /// An oracle failure absorbed by the fallback policy
    OracleFallback {
        step: usize,
        reason: String,
        /// Core question index advanced to, or `None` when the session completed
        advanced_to: Option<usize>,
    },
    InterviewCompleted {
        respondent_id: String,
        steps: usize,
        fallbacks: usize,
        duration_secs: f64,
    },
    InterviewExited {
        respondent_id: String,
        steps: usize,
    },
    TranscriptSaved {
        respondent_id: String,
        message: String,
    },
    TranscriptSaveFailed {
        respondent_id: String,
        error: String,
    },
    GuideExtracted {
        source: String,
        questions: usize,
        probes: usize,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for session events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    quiet: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            quiet: false,
            file_writer: None,
        }
    }

    /// A logger that writes nothing to the console
    pub fn silent() -> Self {
        Self {
            format: LogFormat::Compact,
            quiet: true,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            quiet: false,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if self.quiet {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::InterviewStarted {
                study_name,
                respondent_id,
                core_questions,
                oracle,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "insightloop".bold().bright_white(),
                    " ".repeat(56) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Study:".dimmed(),
                    Self::truncate_with_padding(study_name, 58, 66).dimmed()
                );
                let details = format!(
                    "{} · {} questions · {}",
                    respondent_id, core_questions, oracle
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Session:".dimmed(),
                    Self::truncate_with_padding(&details, 56, 64).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::DecisionReceived { decision, .. } => {
                let styled = if decision.contains("FINISH") {
                    format!("✓ {}", decision).bright_green().to_string()
                } else if decision.contains("PROBE") {
                    format!("↻ {}", decision).bright_magenta().to_string()
                } else {
                    format!("→ {}", decision).bright_cyan().to_string()
                };
                let _ = writeln!(stderr, "    {}", styled.dimmed());
            }
            LogEvent::OracleFallback {
                reason,
                advanced_to,
                ..
            } => {
                let action = match advanced_to {
                    Some(index) => format!("advancing to question {}", index + 1),
                    None => "no questions left, completing".to_string(),
                };
                let _ = writeln!(
                    stderr,
                    "    {} Oracle unavailable ({}), {}",
                    "⚠".bright_yellow(),
                    reason.bright_yellow(),
                    action
                );
            }
            LogEvent::InterviewCompleted {
                steps,
                fallbacks,
                duration_secs,
                ..
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Interview complete: {} steps in {:.1}s",
                    "✓".bright_green(),
                    steps,
                    duration_secs
                );
                if *fallbacks > 0 {
                    let _ = writeln!(
                        stderr,
                        "  {} {} decision(s) fell back to the scripted guide",
                        "⚠".bright_yellow(),
                        fallbacks
                    );
                }
            }
            LogEvent::InterviewExited { steps, .. } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Interview exited after {} step(s); nothing saved",
                    "■".bright_yellow(),
                    steps
                );
            }
            LogEvent::TranscriptSaved { message, .. } => {
                let _ = writeln!(stderr, "  {} {}", "💾".dimmed(), message.dimmed());
            }
            LogEvent::TranscriptSaveFailed { error, .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} Transcript not saved: {}",
                    "✗".bright_red(),
                    error.bright_red()
                );
            }
            LogEvent::GuideExtracted {
                source,
                questions,
                probes,
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}: {} question(s), {} probe(s)",
                    "▶".bright_cyan(),
                    source,
                    questions,
                    probes
                );
            }
            LogEvent::AnswerRecorded { .. } => {
                // The respondent already sees their own answer
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::InterviewStarted {
                respondent_id,
                core_questions,
                ..
            } => format!(
                "[{}] interview:start:{} q={}",
                timestamp, respondent_id, core_questions
            ),
            LogEvent::AnswerRecorded {
                step,
                probe,
                answer_chars,
            } => format!(
                "[{}] answer:{}{} {}c",
                timestamp,
                step + 1,
                if *probe { ":probe" } else { "" },
                answer_chars
            ),
            LogEvent::DecisionReceived { step, decision, .. } => {
                format!("[{}] decision:{} {}", timestamp, step + 1, decision)
            }
            LogEvent::OracleFallback {
                step,
                reason,
                advanced_to,
            } => format!(
                "[{}] fallback:{} {} -> {}",
                timestamp,
                step + 1,
                reason,
                advanced_to.map_or_else(|| "complete".to_string(), |i| format!("q{}", i + 1))
            ),
            LogEvent::InterviewCompleted {
                steps,
                fallbacks,
                duration_secs,
                ..
            } => format!(
                "[{}] interview:done steps={} fallbacks={} {:.1}s",
                timestamp, steps, fallbacks, duration_secs
            ),
            LogEvent::InterviewExited { steps, .. } => {
                format!("[{}] interview:exit steps={}", timestamp, steps)
            }
            LogEvent::TranscriptSaved { respondent_id, .. } => {
                format!("[{}] save:ok:{}", timestamp, respondent_id)
            }
            LogEvent::TranscriptSaveFailed {
                respondent_id,
                error,
            } => format!("[{}] save:failed:{} {}", timestamp, respondent_id, error),
            LogEvent::GuideExtracted {
                source, questions, ..
            } => format!("[{}] extract:{} q={}", timestamp, source, questions),
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = if s.chars().count() > max_len {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{}...", head)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1);
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = LogEvent::OracleFallback {
            step: 2,
            reason: "timeout".into(),
            advanced_to: Some(1),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "oracle_fallback");
        assert_eq!(json["advanced_to"], 1);
    }

    #[test]
    fn test_file_logging_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/session.jsonl");
        let mut logger = Logger::with_file(LogFormat::Compact, &path).unwrap();
        logger.quiet = true;

        logger.log(&LogEvent::InterviewExited {
            respondent_id: "abc123".into(),
            steps: 3,
        });
        logger.log(&LogEvent::TranscriptSaved {
            respondent_id: "abc123".into(),
            message: "saved".into(),
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "interview_exited");
        assert!(lines[1]["timestamp"].is_string());
    }

    #[test]
    fn test_truncate_with_padding() {
        let padded = Logger::truncate_with_padding("short", 10, 12);
        assert_eq!(padded, "short      │");

        let truncated = Logger::truncate_with_padding("a very long study name", 10, 12);
        assert!(truncated.starts_with("a very ..."));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
