use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModerationError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("List unavailable ({path}): {source}")]
    ListUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, ModerationError>;
