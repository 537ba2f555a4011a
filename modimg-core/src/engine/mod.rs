//! Moderation engines.
//!
//! Every detector implements [`Engine`]. The pipeline holds them as trait
//! objects, so each engine can be built, tested and disabled on its own.
//!
//! ## Result contract
//!
//! An engine returns an [`EngineResult`] with status `ok`, `skipped` or
//! `error`. `skipped` means "no signal": the engine could not evaluate the
//! image (disabled, unconfigured, missing backend) and the caller carries on
//! with the other engines.

mod nsfw;
mod phash;
mod probe;

pub use nsfw::{NsfwBackend, OpenNsfw2Engine, NSFW_SCORE_KEY, OPENNSFW2_DISABLE_KEY};
pub use phash::{MatchedOn, PhashListEngine};
pub use probe::{BackendProbe, ProbeOutcome};

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::frames::Frame;

/// Whether an engine can run right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable(String),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }

    /// Human-readable reason, empty when available.
    pub fn reason(&self) -> &str {
        match self {
            Availability::Available => "",
            Availability::Unavailable(reason) => reason,
        }
    }
}

/// Engine outcome status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    Ok,
    Skipped,
    Error,
}

impl EngineStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            EngineStatus::Ok => "ok",
            EngineStatus::Skipped => "skipped",
            EngineStatus::Error => "error",
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one engine on one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResult {
    pub name: String,
    pub status: EngineStatus,
    /// Scores in `[0, 1]`, keyed by signal name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    /// Error or skip reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub took_ms: u64,
}

impl EngineResult {
    pub fn ok(
        name: impl Into<String>,
        scores: BTreeMap<String, f64>,
        details: Option<Map<String, Value>>,
        started: Instant,
    ) -> Self {
        Self {
            name: name.into(),
            status: EngineStatus::Ok,
            scores: Some(scores),
            details,
            error: None,
            took_ms: elapsed_ms(started),
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>, started: Instant) -> Self {
        Self {
            name: name.into(),
            status: EngineStatus::Skipped,
            scores: None,
            details: None,
            error: Some(reason.into()),
            took_ms: elapsed_ms(started),
        }
    }

    pub fn error(name: impl Into<String>, message: impl Into<String>, started: Instant) -> Self {
        Self {
            name: name.into(),
            status: EngineStatus::Error,
            scores: None,
            details: None,
            error: Some(message.into()),
            took_ms: elapsed_ms(started),
        }
    }

    pub fn score(&self, key: &str) -> Option<f64> {
        self.scores.as_ref()?.get(key).copied()
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref()?.get(key)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// A moderation detector.
///
/// Implementations must be thread-safe (`Send + Sync`): the pipeline runs
/// engines concurrently and shares frames between them read-only.
pub trait Engine: Send + Sync {
    /// Display name, also used as the result name.
    fn name(&self) -> &str;

    /// Cheap readiness check. Must not panic.
    fn available(&self) -> Availability;

    /// Evaluate the sampled frames of the image at `path`.
    ///
    /// `max_api_frames` bounds how many frames remote engines may upload;
    /// local engines are free to ignore it.
    fn run(&self, path: &Path, frames: &[Frame], max_api_frames: usize) -> EngineResult;
}
