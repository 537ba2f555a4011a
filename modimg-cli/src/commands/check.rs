//! Check command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use modimg_core::{
    load_frames, EngineResult, EngineStatus, ListKind, OpenNsfw2Engine, PhashEngineConfig,
    PhashListEngine, Pipeline, PipelineReport, Verdict,
};
use serde_json::Value;
use tracing::info;

use crate::exit_codes::ExitCode;
use crate::OutputFormat;

/// Flags that override the environment for one list.
#[derive(Debug, Default)]
pub struct ListOverrides {
    pub path: Option<PathBuf>,
    pub max_distance: Option<i64>,
}

impl ListOverrides {
    fn apply(&self, mut config: PhashEngineConfig) -> PhashEngineConfig {
        if let Some(path) = &self.path {
            config = config.with_list_path(path.to_string_lossy());
        }
        if let Some(max_distance) = self.max_distance {
            config = config.with_max_distance(max_distance);
        }
        config
    }
}

/// Execute the check command.
pub fn execute(
    file: PathBuf,
    allow: ListOverrides,
    block: ListOverrides,
    sample_frames: usize,
    format: OutputFormat,
    quiet: bool,
) -> Result<ExitCode> {
    let frames = load_frames(&file, sample_frames)
        .with_context(|| format!("Failed to load image: {}", file.display()))?;

    info!(path = %file.display(), frames = frames.len(), "Loaded frames");

    let pipeline = Pipeline::new()
        .with_screening(PhashListEngine::new(
            allow.apply(PhashEngineConfig::from_env(ListKind::Allow)),
        ))
        .with_screening(PhashListEngine::new(
            block.apply(PhashEngineConfig::from_env(ListKind::Block)),
        ))
        .with_engine(OpenNsfw2Engine::from_env());

    let report = pipeline.run(&file, &frames);

    match format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{json}");
        }
        OutputFormat::Text => print_text(&report, quiet),
    }

    Ok(match report.verdict {
        Verdict::Block => ExitCode::blocked(),
        Verdict::Allow | Verdict::Inconclusive => ExitCode::success(),
    })
}

fn print_text(report: &PipelineReport, quiet: bool) {
    if !quiet {
        for result in &report.results {
            println!("{}", format_result(result));
        }
    }

    let verdict = report.verdict.as_str();
    let verdict = match report.verdict {
        Verdict::Block => verdict.red().bold(),
        Verdict::Allow => verdict.green().bold(),
        Verdict::Inconclusive => verdict.yellow(),
    };
    println!("FINAL: {verdict}");
}

fn status_tag(status: EngineStatus) -> ColoredString {
    let tag = format!("[{status}]");
    match status {
        EngineStatus::Ok => tag.green(),
        EngineStatus::Skipped => tag.dimmed(),
        EngineStatus::Error => tag.red(),
    }
}

/// One line per engine: status, name, then scores, details or reason.
fn format_result(result: &EngineResult) -> String {
    let mut parts = vec![status_tag(result.status).to_string(), result.name.clone()];

    if let Some(scores) = &result.scores {
        parts.extend(scores.iter().map(|(k, v)| format!("{k}={v:.3}")));
    }
    if let Some(details) = &result.details {
        parts.extend(details.iter().map(|(k, v)| match v {
            Value::String(s) => format!("{k}={s}"),
            other => format!("{k}={other}"),
        }));
    }
    if let Some(reason) = &result.error {
        parts.push(format!("({reason})"));
    }
    parts.push(format!("{}ms", result.took_ms).dimmed().to_string());

    parts.join(" ")
}
