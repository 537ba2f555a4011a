//! modimg core - perceptual-hash list matching and image moderation engines
//!
//! This crate decides whether an image (or a sampled animation) matches an
//! allowlist or blocklist of perceptual fingerprints, and runs the remaining
//! moderation engines when it does not.
//!
//! # Features
//!
//! - DCT perceptual hashes (64/128 bit) and blockhash fingerprints
//! - Exact-match index and Hamming-distance search with first-wins tie-breaking
//! - Allow/block list engines that degrade to `skipped` instead of failing
//! - A pipeline that short-circuits on list matches
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use modimg_core::{load_frames, Pipeline, Verdict, DEFAULT_SAMPLE_FRAMES};
//!
//! # fn example() -> modimg_core::Result<()> {
//! let path = Path::new("upload.gif");
//! let frames = load_frames(path, DEFAULT_SAMPLE_FRAMES)?;
//!
//! let report = Pipeline::from_env().run(path, &frames);
//! if report.verdict == Verdict::Block {
//!     println!("blocked by {:?}", report.decided_by);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod frames;
pub mod phash;
pub mod pipeline;

// Re-export main types for convenience
pub use config::{ListKind, PhashEngineConfig};
pub use engine::{
    Availability, Engine, EngineResult, EngineStatus, MatchedOn, NsfwBackend, OpenNsfw2Engine,
    PhashListEngine,
};
pub use error::{ModerationError, Result};
pub use frames::{load_frames, Frame, DEFAULT_SAMPLE_FRAMES};
pub use phash::{
    best_match, hamming_distance, load_entry_list, load_exact_map, resolve_list_path,
    ExactMatchIndex, Fingerprint, HashAlgorithm, ListEntry, PerceptualHasher,
};
pub use pipeline::{Pipeline, PipelineReport, Verdict};
