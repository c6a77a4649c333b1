use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use insightloop_core::StepKind;
use insightloop_db::{Database, TranscriptFilter, TranscriptRow};

#[derive(Subcommand, Debug)]
pub enum TranscriptsAction {
    /// List saved transcripts, newest first
    List {
        /// Filter by study name
        #[arg(long)]
        study: Option<String>,

        /// Filter by respondent id
        #[arg(long)]
        respondent: Option<String>,

        /// Maximum number of transcripts to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one transcript
    Show {
        /// Transcript id (launches interactive picker if omitted)
        id: Option<i64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show studies with their transcript counts
    Studies {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a transcript
    Delete {
        id: i64,
    },
}

pub fn handle_transcripts_command(action: TranscriptsAction, db: &Database) -> Result<()> {
    match action {
        TranscriptsAction::List {
            study,
            respondent,
            limit,
            json,
        } => {
            let filter = TranscriptFilter {
                study_name: study,
                respondent_id: respondent,
                limit,
                offset: None,
            };
            let rows = db.transcripts().list(&filter)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("{}", "No transcripts found.".dimmed());
            } else {
                print_transcripts_table(&rows);
            }
        }
        TranscriptsAction::Show { id, json } => {
            let id = resolve_transcript_id(db, id)?;
            let row = db
                .transcripts()
                .get(id)?
                .with_context(|| format!("No transcript with id {}", id))?;

            if json {
                let steps = row.steps()?;
                println!("{}", serde_json::to_string_pretty(&steps)?);
            } else {
                print_transcript_detail(&row)?;
            }
        }
        TranscriptsAction::Studies { json } => {
            let studies = db.transcripts().list_studies()?;

            if json {
                let value: Vec<_> = studies
                    .iter()
                    .map(|(name, count)| serde_json::json!({ "study_name": name, "transcripts": count }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else if studies.is_empty() {
                println!("{}", "No transcripts found.".dimmed());
            } else {
                println!("{:<40} {}", "STUDY".dimmed(), "TRANSCRIPTS".dimmed());
                for (name, count) in studies {
                    println!("{:<40} {}", name, count);
                }
            }
        }
        TranscriptsAction::Delete { id } => {
            if db.transcripts().delete(id)? {
                println!("Deleted transcript {}", id);
            } else {
                anyhow::bail!("No transcript with id {}", id);
            }
        }
    }

    Ok(())
}

fn resolve_transcript_id(db: &Database, id: Option<i64>) -> Result<i64> {
    if let Some(id) = id {
        return Ok(id);
    }

    // Interactive picker
    let rows = db.transcripts().list(&TranscriptFilter::default())?;
    if rows.is_empty() {
        anyhow::bail!("No transcripts found.");
    }

    let items: Vec<String> = rows
        .iter()
        .map(|row| {
            format!(
                "#{} | {} | {} | {}",
                row.id,
                row.created_at.format("%Y-%m-%d %H:%M"),
                row.respondent_id,
                preview(&row.study_name, 50)
            )
        })
        .collect();

    let selection = dialoguer::FuzzySelect::new()
        .with_prompt("Select a transcript")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(rows[selection].id)
}

fn print_transcripts_table(rows: &[TranscriptRow]) {
    println!(
        "{:<6} {:<20} {:<12} {:<6} {}",
        "ID".dimmed(),
        "SAVED".dimmed(),
        "RESPONDENT".dimmed(),
        "STEPS".dimmed(),
        "STUDY".dimmed(),
    );

    for row in rows {
        let steps = row
            .steps()
            .map(|s| s.len().to_string())
            .unwrap_or_else(|_| "?".to_string());
        println!(
            "{:<6} {:<20} {:<12} {:<6} {}",
            row.id,
            row.created_at.format("%Y-%m-%d %H:%M").to_string(),
            row.respondent_id,
            steps,
            preview(&row.study_name, 50)
        );
    }
}

fn print_transcript_detail(row: &TranscriptRow) -> Result<()> {
    let steps = row.steps()?;

    println!("{}", "=== Transcript ===".bright_blue().bold());
    println!("{}  {}", "ID:".dimmed(), row.id);
    println!("{}  {}", "Study:".dimmed(), row.study_name);
    println!("{}  {}", "Respondent:".dimmed(), row.respondent_id);
    println!(
        "{}  {}",
        "Saved:".dimmed(),
        row.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let (Some(first), Some(last)) = (steps.first(), steps.last()) {
        let secs = (last.asked_at - first.asked_at).num_seconds().max(0) as f64;
        println!("{}  {}", "Duration:".dimmed(), format_duration(secs));
    }

    println!();
    println!("{}", format!("--- Steps ({}) ---", steps.len()).dimmed());
    for (i, step) in steps.iter().enumerate() {
        println!();
        let label = match step.kind {
            StepKind::Core => format!("[{}]", i + 1).bright_blue(),
            StepKind::Probe => format!("[{}] probe", i + 1).bright_yellow(),
        };
        println!("  {} {}", label, step.question);
        println!(
            "    {} {}",
            "A:".dimmed(),
            step.response.as_deref().unwrap_or("(no answer)")
        );
    }

    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.0}s", secs)
    } else {
        let mins = (secs / 60.0).floor() as u64;
        let remaining_secs = (secs % 60.0) as u64;
        format!("{}m {}s", mins, remaining_secs)
    }
}
