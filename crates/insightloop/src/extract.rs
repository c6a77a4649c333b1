use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use insightloop_guide::{GuideDraft, GuideStructurer, StudyConfig};
use insightloop_logging::{LogEvent, Logger};
use insightloop_oracle::{ExtractionOracle, ExtractionSource};

pub struct ExtractRequest {
    pub inputs: Vec<PathBuf>,
    pub text: Option<String>,
    pub name: Option<String>,
    pub goal: Option<String>,
    pub output: PathBuf,
    pub append: bool,
}

pub async fn handle_extract_command(
    request: ExtractRequest,
    oracle: &dyn ExtractionOracle,
    logger: &Logger,
) -> Result<()> {
    let mut sources = Vec::new();
    if let Some(text) = request.text {
        sources.push(ExtractionSource::text(text));
    }
    for path in &request.inputs {
        let source = ExtractionSource::from_path(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        sources.push(source);
    }
    if sources.is_empty() {
        bail!("Nothing to extract. Pass files or --text");
    }

    let mut draft = if request.append && request.output.exists() {
        let existing = StudyConfig::load(&request.output)
            .with_context(|| format!("Failed to load {}", request.output.display()))?;
        GuideDraft::from_config(existing)
    } else {
        GuideDraft::new(String::new(), String::new())
    };
    if let Some(name) = request.name {
        draft.study_name = name;
    }
    if let Some(goal) = request.goal {
        draft.research_goal = goal;
    }

    let structurer = GuideStructurer::new(oracle);
    for source in &sources {
        let added = structurer
            .extract_into(&mut draft, source)
            .await
            .with_context(|| format!("Could not structure {}", source.describe()))?;

        let probes: usize = added
            .iter()
            .filter_map(|id| draft.question(id))
            .map(|q| q.predefined_probes.len())
            .sum();
        logger.log(&LogEvent::GuideExtracted {
            source: source.describe(),
            questions: added.len(),
            probes,
        });
    }

    fill_missing_metadata(&mut draft)?;

    let config = draft.finalize().context("Extracted guide is not ready")?;
    config
        .save(&request.output)
        .with_context(|| format!("Failed to write {}", request.output.display()))?;

    println!(
        "{} {} core questions to {}",
        "Wrote".bright_green(),
        config.question_count(),
        request.output.display()
    );
    for (i, question) in config.core_questions.iter().enumerate() {
        println!("  {} {}", format!("[{}]", i + 1).bright_blue(), question.text);
        for probe in &question.predefined_probes {
            println!("      {} {}", "-".dimmed(), probe);
        }
    }

    Ok(())
}

/// Prompt for a study name and goal when stdin is interactive
fn fill_missing_metadata(draft: &mut GuideDraft) -> Result<()> {
    if !std::io::stdin().is_terminal() {
        return Ok(());
    }

    if draft.study_name.trim().is_empty() {
        draft.study_name = dialoguer::Input::<String>::new()
            .with_prompt("Study name")
            .interact_text()?;
    }
    if draft.research_goal.trim().is_empty() {
        draft.research_goal = dialoguer::Input::<String>::new()
            .with_prompt("Research goal")
            .interact_text()?;
    }

    Ok(())
}
