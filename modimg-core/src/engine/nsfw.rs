//! Offline NSFW probability engine.
//!
//! The classifier itself is an optional backend behind [`NsfwBackend`]. The
//! engine probes for it lazily and reports `skipped` when none is present, so
//! a missing model never fails the pipeline.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, warn};

use super::probe::BackendProbe;
use super::{Availability, Engine, EngineResult};
use crate::config::env_flag;
use crate::frames::Frame;

pub const OPENNSFW2_DISABLE_KEY: &str = "OPENNSFW2_DISABLE";
pub const NSFW_SCORE_KEY: &str = "nsfw_probability";

const ENGINE_NAME: &str = "OpenNSFW2";

/// An NSFW classifier returning the probability that an image is explicit.
pub trait NsfwBackend: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, image: &DynamicImage) -> std::result::Result<f32, String>;
}

/// OpenNSFW2-style single-frame classifier engine.
#[derive(Debug)]
pub struct OpenNsfw2Engine {
    disabled: bool,
    backend: BackendProbe<dyn NsfwBackend>,
}

impl OpenNsfw2Engine {
    /// Engine without a bundled backend; it reports itself unavailable.
    pub fn new() -> Self {
        Self::with_probe(BackendProbe::missing(
            "opennsfw2 backend not available: no inference runtime compiled in",
        ))
    }

    /// Engine using `backend` directly.
    pub fn with_backend(backend: Arc<dyn NsfwBackend>) -> Self {
        Self::with_probe(BackendProbe::ready(backend))
    }

    pub fn with_probe(backend: BackendProbe<dyn NsfwBackend>) -> Self {
        Self {
            disabled: false,
            backend,
        }
    }

    /// Default engine honouring `OPENNSFW2_DISABLE=1`.
    pub fn from_env() -> Self {
        Self::new().disabled(env_flag(OPENNSFW2_DISABLE_KEY, &|key: &str| {
            std::env::var(key).ok()
        }))
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

impl Default for OpenNsfw2Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for OpenNsfw2Engine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn available(&self) -> Availability {
        if self.disabled {
            return Availability::Unavailable(format!("disabled via {OPENNSFW2_DISABLE_KEY}=1"));
        }
        match self.backend.get() {
            Ok(_) => Availability::Available,
            Err(reason) => Availability::Unavailable(reason.clone()),
        }
    }

    fn run(&self, _path: &Path, frames: &[Frame], _max_api_frames: usize) -> EngineResult {
        let started = Instant::now();

        if let Availability::Unavailable(reason) = self.available() {
            return EngineResult::skipped(ENGINE_NAME, reason, started);
        }
        let Ok(backend) = self.backend.get() else {
            return EngineResult::skipped(ENGINE_NAME, "backend not loaded", started);
        };
        let Some(frame) = frames.first() else {
            return EngineResult::skipped(ENGINE_NAME, "no frames to classify", started);
        };

        let probability = match backend.predict(&frame.image) {
            Ok(p) => p,
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "NSFW prediction failed");
                return EngineResult::error(
                    ENGINE_NAME,
                    format!("{} prediction failed: {e}", backend.name()),
                    started,
                );
            }
        };

        let clamped = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        debug!(backend = backend.name(), probability = clamped, "NSFW prediction");

        let mut scores = BTreeMap::new();
        scores.insert(NSFW_SCORE_KEY.to_string(), f64::from(clamped));
        EngineResult::ok(ENGINE_NAME, scores, None, started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineStatus;

    struct FixedBackend(std::result::Result<f32, String>);

    impl NsfwBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, _image: &DynamicImage) -> std::result::Result<f32, String> {
            self.0.clone()
        }
    }

    fn frame() -> Frame {
        Frame::new(0, DynamicImage::new_rgb8(4, 4))
    }

    fn run_with(result: std::result::Result<f32, String>) -> EngineResult {
        OpenNsfw2Engine::with_backend(Arc::new(FixedBackend(result)))
            .run(Path::new("x.png"), &[frame()], 2)
    }

    #[test]
    fn test_missing_backend_is_skipped() {
        let engine = OpenNsfw2Engine::new();
        assert!(!engine.available().is_available());
        let result = engine.run(Path::new("x.png"), &[frame()], 2);
        assert_eq!(result.status, EngineStatus::Skipped);
        assert!(result.error.unwrap().contains("not available"));
    }

    #[test]
    fn test_disabled() {
        let engine = OpenNsfw2Engine::with_backend(Arc::new(FixedBackend(Ok(0.5)))).disabled(true);
        assert_eq!(
            engine.available(),
            Availability::Unavailable("disabled via OPENNSFW2_DISABLE=1".into())
        );
    }

    #[test]
    fn test_probability_reported() {
        let result = run_with(Ok(0.25));
        assert_eq!(result.status, EngineStatus::Ok);
        assert_eq!(result.score(NSFW_SCORE_KEY), Some(0.25));
    }

    #[test]
    fn test_probability_clamped() {
        assert_eq!(run_with(Ok(1.7)).score(NSFW_SCORE_KEY), Some(1.0));
        assert_eq!(run_with(Ok(-0.2)).score(NSFW_SCORE_KEY), Some(0.0));
        assert_eq!(run_with(Ok(f32::NAN)).score(NSFW_SCORE_KEY), Some(0.0));
    }

    #[test]
    fn test_prediction_failure_is_error() {
        let result = run_with(Err("tensor shape mismatch".into()));
        assert_eq!(result.status, EngineStatus::Error);
        assert_eq!(
            result.error.as_deref(),
            Some("fixed prediction failed: tensor shape mismatch")
        );
    }

    #[test]
    fn test_no_frames_is_skipped() {
        let engine = OpenNsfw2Engine::with_backend(Arc::new(FixedBackend(Ok(0.1))));
        let result = engine.run(Path::new("x.png"), &[], 2);
        assert_eq!(result.status, EngineStatus::Skipped);
    }
}
