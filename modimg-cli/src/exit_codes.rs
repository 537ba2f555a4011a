//! Exit codes following sysexits.h conventions.
//!
//! Scripts can tell a blocked image apart from a broken input or a crash
//! without parsing output.

use modimg_core::ModerationError;

/// Image allowed or inconclusive.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Image matched the blocklist.
pub const BLOCKED: i32 = 2;

/// Input could not be decoded as an image.
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Represents an exit code with optional error context.
#[derive(Debug)]
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub const fn blocked() -> Self {
        Self {
            code: BLOCKED,
            message: None,
        }
    }

    /// Classify an error by the first `ModerationError` in its chain.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let code = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<ModerationError>())
            .map_or(GENERAL_ERROR, |e| match e {
                ModerationError::Io { .. } | ModerationError::ListUnavailable { .. } => INPUT_ERROR,
                ModerationError::Decode(_) | ModerationError::InvalidImage(_) => DATA_ERROR,
            });

        Self {
            code,
            message: Some(format!("{err:#}")),
        }
    }
}
