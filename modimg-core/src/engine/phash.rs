//! pHash allowlist and blocklist engines.
//!
//! Both hash the first and last sampled frame and compare them with a list
//! file that is re-read on every run. A distance bound of zero uses the
//! exact-match index; a positive bound scans the flat entry list.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{Availability, Engine, EngineResult};
use crate::config::{ListKind, PhashEngineConfig};
use crate::error::Result;
use crate::frames::Frame;
use crate::phash::{
    best_match, load_entry_list, load_exact_map, resolve_list_path, Fingerprint, ListEntry,
    PerceptualHasher,
};

/// Which sampled frame produced the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchedOn {
    First,
    Last,
}

impl MatchedOn {
    pub const fn as_str(self) -> &'static str {
        match self {
            MatchedOn::First => "first",
            MatchedOn::Last => "last",
        }
    }
}

#[derive(Debug)]
struct FrameMatch {
    distance: u32,
    entry: ListEntry,
    matched_on: MatchedOn,
}

enum Lookup {
    EmptyList,
    Done(Option<FrameMatch>),
}

/// Offline list engine; the allow and block variants differ only in
/// [`ListKind`] defaults.
#[derive(Debug, Clone)]
pub struct PhashListEngine {
    config: PhashEngineConfig,
    hasher: PerceptualHasher,
}

impl PhashListEngine {
    pub fn new(config: PhashEngineConfig) -> Self {
        let hasher = PerceptualHasher::new(config.algorithm);
        Self { config, hasher }
    }

    /// Allowlist engine configured from the environment.
    pub fn allowlist_from_env() -> Self {
        Self::new(PhashEngineConfig::from_env(ListKind::Allow))
    }

    /// Blocklist engine configured from the environment.
    pub fn blocklist_from_env() -> Self {
        Self::new(PhashEngineConfig::from_env(ListKind::Block))
    }

    pub fn kind(&self) -> ListKind {
        self.config.kind
    }

    pub fn config(&self) -> &PhashEngineConfig {
        &self.config
    }

    /// Resolve the list path or explain why the engine cannot run.
    fn usable_path(&self) -> std::result::Result<PathBuf, String> {
        let kind = self.config.kind;
        if self.config.disabled {
            return Err(format!("disabled via {}=1", kind.disable_key()));
        }
        let Some(path) = resolve_list_path(self.config.list_path.as_deref()) else {
            return Err(format!("{} path not set", kind.noun()));
        };
        if !path.exists() {
            return Err(format!("{} not found ({})", kind.noun(), path.display()));
        }
        Ok(path)
    }

    fn lookup_exact(&self, path: &Path, first: &Fingerprint, last: &Fingerprint) -> Result<Lookup> {
        let index = load_exact_map(path, self.config.kind.default_label())?;
        if index.is_empty() {
            return Ok(Lookup::EmptyList);
        }

        let found = index
            .get(first)
            .map(|entry| (entry, MatchedOn::First))
            .or_else(|| index.get(last).map(|entry| (entry, MatchedOn::Last)))
            .map(|(entry, matched_on)| FrameMatch {
                distance: 0,
                entry: entry.clone(),
                matched_on,
            });
        Ok(Lookup::Done(found))
    }

    fn lookup_nearest(
        &self,
        path: &Path,
        first: &Fingerprint,
        last: &Fingerprint,
    ) -> Result<Lookup> {
        let entries = load_entry_list(path, self.config.kind.default_label())?;
        if entries.is_empty() {
            return Ok(Lookup::EmptyList);
        }

        let max = self.config.max_distance;
        let on_first = best_match(first.value(), first.bits(), &entries, max);
        let on_last = best_match(last.value(), last.bits(), &entries, max);

        // The last frame only wins when strictly closer.
        let best = match (on_first, on_last) {
            (Some(f), Some(l)) if l.distance < f.distance => Some((l, MatchedOn::Last)),
            (Some(f), _) => Some((f, MatchedOn::First)),
            (None, Some(l)) => Some((l, MatchedOn::Last)),
            (None, None) => None,
        };

        Ok(Lookup::Done(best.map(|(m, matched_on)| FrameMatch {
            distance: m.distance,
            entry: m.entry.clone(),
            matched_on,
        })))
    }
}

impl Engine for PhashListEngine {
    fn name(&self) -> &str {
        self.config.kind.engine_name()
    }

    fn available(&self) -> Availability {
        match self.usable_path() {
            Ok(_) => Availability::Available,
            Err(reason) => Availability::Unavailable(reason),
        }
    }

    fn run(&self, _path: &Path, frames: &[Frame], _max_api_frames: usize) -> EngineResult {
        let started = Instant::now();
        let kind = self.config.kind;
        let name = self.name();

        let list_path = match self.usable_path() {
            Ok(path) => path,
            Err(reason) => return EngineResult::skipped(name, reason, started),
        };

        let (Some(first_frame), Some(last_frame)) = (frames.first(), frames.last()) else {
            return EngineResult::skipped(name, "no frames to hash", started);
        };
        let hashed = self.hasher.hash_frame(first_frame).and_then(|first| {
            self.hasher
                .hash_frame(last_frame)
                .map(|last| (first, last))
        });
        let (first, last) = match hashed {
            Ok(pair) => pair,
            Err(e) => return EngineResult::skipped(name, e.to_string(), started),
        };

        let lookup = if self.config.max_distance <= 0 {
            self.lookup_exact(&list_path, &first, &last)
        } else {
            self.lookup_nearest(&list_path, &first, &last)
        };

        let found = match lookup {
            Ok(Lookup::Done(found)) => found,
            Ok(Lookup::EmptyList) => {
                return EngineResult::skipped(name, format!("{} empty", kind.noun()), started)
            }
            Err(e) => return EngineResult::skipped(name, e.to_string(), started),
        };

        let mut details = Map::new();
        let mut scores = BTreeMap::new();
        match found {
            Some(m) => {
                info!(
                    engine = name,
                    distance = m.distance,
                    matched_on = m.matched_on.as_str(),
                    label = %m.entry.label,
                    "List match"
                );
                scores.insert(kind.score_key().to_string(), 1.0);
                details.insert("match_hex".into(), m.entry.fingerprint.to_hex().into());
                details.insert("match_label".into(), m.entry.label.into());
                details.insert("distance".into(), Value::from(m.distance));
                details.insert("matched_on".into(), m.matched_on.as_str().into());
            }
            None => {
                debug!(engine = name, first = %first, last = %last, "No list match");
                scores.insert(kind.score_key().to_string(), 0.0);
            }
        }
        details.insert("first".into(), first.to_hex().into());
        details.insert("last".into(), last.to_hex().into());

        EngineResult::ok(name, scores, Some(details), started)
    }
}
