//! Hash command implementation.
//!
//! Output is valid list-file text, so it can be appended to an allowlist or
//! blocklist as-is.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use modimg_core::{load_frames, Fingerprint, Frame, HashAlgorithm, PerceptualHasher};
use tracing::debug;

use crate::exit_codes::ExitCode;

/// Execute the hash command.
pub fn execute(
    file: PathBuf,
    algorithm: HashAlgorithm,
    sample_frames: usize,
    label: Option<String>,
) -> Result<ExitCode> {
    let frames = load_frames(&file, sample_frames)
        .with_context(|| format!("Failed to load image: {}", file.display()))?;

    if frames.is_empty() {
        bail!("No frames decoded from {}", file.display());
    }

    let hasher = PerceptualHasher::new(algorithm);
    for frame in first_and_last(&frames) {
        let fingerprint = hasher
            .hash_frame(frame)
            .with_context(|| format!("Failed to hash frame {}", frame.idx))?;

        debug!(frame = frame.idx, algorithm = %algorithm, hash = %fingerprint, "Hashed frame");

        println!("{}", list_line(&fingerprint, frame.idx, label.as_deref()));
    }

    Ok(ExitCode::success())
}

/// `<hex> [label]  # frame <idx>`. Without a label the list's default applies.
fn list_line(fingerprint: &Fingerprint, idx: usize, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{fingerprint} {label}  # frame {idx}"),
        None => format!("{fingerprint}  # frame {idx}"),
    }
}

/// The frames the list engines look at, without repeating a single frame.
fn first_and_last(frames: &[Frame]) -> Vec<&Frame> {
    match frames {
        [] => Vec::new(),
        [only] => vec![only],
        [first, .., last] => vec![first, last],
    }
}
