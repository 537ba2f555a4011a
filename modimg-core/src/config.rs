//! Engine configuration loaded from environment variables.
//!
//! Every key can be supplied through the process environment (or a `.env`
//! file loaded by the binary). Alias keys are checked in order and the first
//! non-empty value wins.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::phash::HashAlgorithm;

/// Shared key selecting the fingerprint algorithm for both list engines.
pub const PHASH_ALGORITHM_KEY: &str = "PHASH_ALGORITHM";

/// Which list a pHash engine checks against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Allow,
    Block,
}

impl ListKind {
    pub const fn engine_name(self) -> &'static str {
        match self {
            ListKind::Allow => "pHash allowlist",
            ListKind::Block => "pHash blocklist",
        }
    }

    /// Label given to entries that carry none.
    pub const fn default_label(self) -> &'static str {
        match self {
            ListKind::Allow => "allow",
            ListKind::Block => "block",
        }
    }

    /// Allowlists default to exact matching; blocklists tolerate small edits.
    pub const fn default_max_distance(self) -> i64 {
        match self {
            ListKind::Allow => 0,
            ListKind::Block => 6,
        }
    }

    pub const fn score_key(self) -> &'static str {
        match self {
            ListKind::Allow => "phash_allow_match",
            ListKind::Block => "phash_block_match",
        }
    }

    /// Noun used in skip reasons.
    pub const fn noun(self) -> &'static str {
        match self {
            ListKind::Allow => "allowlist",
            ListKind::Block => "blocklist",
        }
    }

    pub const fn path_keys(self) -> &'static [&'static str] {
        match self {
            ListKind::Allow => &["PHASH_ALLOWLIST", "PHASH_ALLOWLIST_PATH"],
            ListKind::Block => &["PHASH_BLOCKLIST", "PHASH_BLOCKLIST_PATH"],
        }
    }

    pub const fn max_distance_keys(self) -> &'static [&'static str] {
        match self {
            ListKind::Allow => &["PHASH_ALLOW_MAX_DISTANCE", "PHASH_ALLOW_MAXDIST"],
            ListKind::Block => &[
                "PHASH_BLOCK_MAX_DISTANCE",
                "PHASH_MAXDIST",
                "PHASH_BLOCK_MAXDIST",
            ],
        }
    }

    pub const fn disable_key(self) -> &'static str {
        match self {
            ListKind::Allow => "PHASH_ALLOW_DISABLE",
            ListKind::Block => "PHASH_BLOCK_DISABLE",
        }
    }
}

/// Configuration for one pHash list engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhashEngineConfig {
    pub kind: ListKind,
    /// Raw configured path; resolved with [`crate::phash::resolve_list_path`].
    pub list_path: Option<String>,
    /// `<= 0` means exact matching only.
    pub max_distance: i64,
    pub disabled: bool,
    pub algorithm: HashAlgorithm,
}

impl PhashEngineConfig {
    /// Defaults for `kind` with no list configured.
    pub fn new(kind: ListKind) -> Self {
        Self {
            kind,
            list_path: None,
            max_distance: kind.default_max_distance(),
            disabled: false,
            algorithm: HashAlgorithm::default(),
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env(kind: ListKind) -> Self {
        Self::from_lookup(kind, |key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(kind: ListKind, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let algorithm = env_str_any(&[PHASH_ALGORITHM_KEY], &lookup)
            .and_then(|value| match value.parse::<HashAlgorithm>() {
                Ok(algorithm) => Some(algorithm),
                Err(e) => {
                    warn!(key = PHASH_ALGORITHM_KEY, error = %e, "Ignoring invalid hash algorithm");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            kind,
            list_path: env_str_any(kind.path_keys(), &lookup),
            max_distance: env_int_any(
                kind.max_distance_keys(),
                kind.default_max_distance(),
                &lookup,
            ),
            disabled: env_flag(kind.disable_key(), &lookup),
            algorithm,
        }
    }

    pub fn with_list_path(mut self, path: impl Into<String>) -> Self {
        self.list_path = Some(path.into());
        self
    }

    pub fn with_max_distance(mut self, max_distance: i64) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// First non-empty value among `keys`, trimmed.
pub fn env_str_any<F>(keys: &[&str], lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter().find_map(|key| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

/// First non-empty integer among `keys`, or `default`.
///
/// An unparsable value falls back to `default` rather than trying later keys.
pub fn env_int_any<F>(keys: &[&str], default: i64, lookup: &F) -> i64
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        let Some(value) = lookup(key).map(|v| v.trim().to_string()) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        return match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(key = *key, value = %value, default, "Ignoring non-integer value");
                default
            }
        };
    }
    default
}

/// `true` only when the key is set to `1`.
pub fn env_flag<F>(key: &str, lookup: &F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).is_some_and(|v| v.trim() == "1")
}
