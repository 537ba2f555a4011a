//! Engine orchestration.
//!
//! Screening engines (the pHash lists) run first. A blocklist or allowlist
//! match decides the image on its own and the remaining engines are not run.
//! Otherwise the remaining engines run concurrently and the verdict stays
//! inconclusive; weighing classifier scores is left to the caller.

use std::fmt;
use std::path::Path;
use std::thread;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ListKind;
use crate::engine::{Engine, EngineResult, OpenNsfw2Engine, PhashListEngine};
use crate::frames::Frame;

/// Frames a remote engine may upload per image unless told otherwise.
pub const DEFAULT_MAX_API_FRAMES: usize = 2;

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Allow,
    Block,
    Inconclusive,
}

impl Verdict {
    pub const fn as_str(self) -> &'static str {
        match self {
            Verdict::Allow => "ALLOW",
            Verdict::Block => "BLOCK",
            Verdict::Inconclusive => "INCONCLUSIVE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict plus every engine result, screening engines first.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub verdict: Verdict,
    /// Name of the engine whose match decided the verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    pub results: Vec<EngineResult>,
}

impl PipelineReport {
    pub fn result(&self, name: &str) -> Option<&EngineResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

/// Ordered collection of engines.
pub struct Pipeline {
    screening: Vec<Box<dyn Engine>>,
    engines: Vec<Box<dyn Engine>>,
    max_api_frames: usize,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            screening: Vec::new(),
            engines: Vec::new(),
            max_api_frames: DEFAULT_MAX_API_FRAMES,
        }
    }

    /// Allowlist, blocklist and NSFW engines configured from the environment.
    pub fn from_env() -> Self {
        Self::new()
            .with_screening(PhashListEngine::allowlist_from_env())
            .with_screening(PhashListEngine::blocklist_from_env())
            .with_engine(OpenNsfw2Engine::from_env())
    }

    /// Add an engine whose match can decide the verdict.
    pub fn with_screening(mut self, engine: impl Engine + 'static) -> Self {
        self.screening.push(Box::new(engine));
        self
    }

    /// Add an engine that runs only when screening is inconclusive.
    pub fn with_engine(mut self, engine: impl Engine + 'static) -> Self {
        self.engines.push(Box::new(engine));
        self
    }

    pub fn with_max_api_frames(mut self, max_api_frames: usize) -> Self {
        self.max_api_frames = max_api_frames;
        self
    }

    pub fn engine_names(&self) -> Vec<&str> {
        self.screening
            .iter()
            .chain(self.engines.iter())
            .map(|e| e.name())
            .collect()
    }

    pub fn run(&self, path: &Path, frames: &[Frame]) -> PipelineReport {
        let mut results: Vec<EngineResult> = self
            .screening
            .iter()
            .map(|engine| engine.run(path, frames, self.max_api_frames))
            .collect();

        let decided = screening_verdict(&results);

        match decided {
            Some((verdict, decided_by)) => {
                info!(verdict = %verdict, engine = %decided_by, "Short-circuiting on list match");
                let started = Instant::now();
                let reason = format!("short-circuited by {decided_by} match");
                results.extend(
                    self.engines
                        .iter()
                        .map(|engine| EngineResult::skipped(engine.name(), reason.clone(), started)),
                );
                PipelineReport {
                    verdict,
                    decided_by: Some(decided_by),
                    results,
                }
            }
            None => {
                results.extend(run_engines(&self.engines, path, frames, self.max_api_frames));
                PipelineReport {
                    verdict: Verdict::Inconclusive,
                    decided_by: None,
                    results,
                }
            }
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// A blocklist match wins over an allowlist match.
fn screening_verdict(results: &[EngineResult]) -> Option<(Verdict, String)> {
    let matched = |kind: ListKind| {
        results
            .iter()
            .find(|r| r.score(kind.score_key()) == Some(1.0))
            .map(|r| r.name.clone())
    };

    matched(ListKind::Block)
        .map(|name| (Verdict::Block, name))
        .or_else(|| matched(ListKind::Allow).map(|name| (Verdict::Allow, name)))
}

/// Run engines concurrently, returning results in engine order.
///
/// A panicking engine is reported as an `error` result.
pub fn run_engines(
    engines: &[Box<dyn Engine>],
    path: &Path,
    frames: &[Frame],
    max_api_frames: usize,
) -> Vec<EngineResult> {
    thread::scope(|scope| {
        let handles: Vec<_> = engines
            .iter()
            .map(|engine| {
                let started = Instant::now();
                let handle = scope.spawn(move || engine.run(path, frames, max_api_frames));
                (engine, started, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(engine, started, handle)| {
                handle.join().unwrap_or_else(|_| {
                    warn!(engine = engine.name(), "Engine panicked");
                    EngineResult::error(engine.name(), "engine panicked", started)
                })
            })
            .collect()
    })
}
