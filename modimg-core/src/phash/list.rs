//! Allow/block list loading.
//!
//! A list is plain text with one fingerprint per line:
//!
//! ```text
//! # known spam banner
//! 3f3f3f3f3f3f3f3f
//! c0ffee00c0ffee00 meme-template
//! 0x00ff00ff00ff00ff, scam  # trailing comment
//! ```
//!
//! The hex length sets the fingerprint width (digits x 4). A label may follow
//! the hex after whitespace, `,` or `;`; entries without one get the list's
//! default label. Blank lines, comments and malformed lines are skipped.
//!
//! Lists are read from disk on every call, so edits take effect on the next run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ModerationError, Result};

use super::codec::Fingerprint;

const COMMENT_MARKER: char = '#';

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ',' || c == ';'
}

/// One fingerprint from a list file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub fingerprint: Fingerprint,
    pub label: String,
}

impl ListEntry {
    pub fn new(fingerprint: Fingerprint, label: impl Into<String>) -> Self {
        Self {
            fingerprint,
            label: label.into(),
        }
    }

    pub fn bits(&self) -> u32 {
        self.fingerprint.bits()
    }
}

/// Exact-match lookup table keyed by width, then fingerprint value.
///
/// The first occurrence of a duplicated fingerprint is kept.
#[derive(Debug, Clone, Default)]
pub struct ExactMatchIndex {
    by_width: HashMap<u32, HashMap<u128, ListEntry>>,
    len: usize,
}

impl ExactMatchIndex {
    pub fn from_entries(entries: impl IntoIterator<Item = ListEntry>) -> Self {
        let mut index = Self::default();
        for entry in entries {
            index.insert(entry);
        }
        index
    }

    fn insert(&mut self, entry: ListEntry) {
        let bucket = self.by_width.entry(entry.bits()).or_default();
        if let std::collections::hash_map::Entry::Vacant(slot) =
            bucket.entry(entry.fingerprint.value())
        {
            slot.insert(entry);
            self.len += 1;
        }
    }

    /// Look up a fingerprint; absent widths and values are simply misses.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&ListEntry> {
        self.lookup(fingerprint.value(), fingerprint.bits())
    }

    pub fn lookup(&self, value: u128, bits: u32) -> Option<&ListEntry> {
        self.by_width.get(&bits)?.get(&value)
    }

    /// Number of distinct fingerprints.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Widths present in the index, ascending.
    pub fn widths(&self) -> Vec<u32> {
        let mut widths: Vec<u32> = self.by_width.keys().copied().collect();
        widths.sort_unstable();
        widths
    }
}

/// Normalize a configured list path.
///
/// Returns `None` for unset or blank values and expands a leading `~`. Does
/// not check whether the path exists.
pub fn resolve_list_path(configured: Option<&str>) -> Option<PathBuf> {
    let trimmed = configured?.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed == "~" || trimmed.starts_with("~/") {
        if let Some(base_dirs) = directories::BaseDirs::new() {
            let rest = trimmed.trim_start_matches('~').trim_start_matches('/');
            return Some(base_dirs.home_dir().join(rest));
        }
    }

    Some(PathBuf::from(trimmed))
}

/// Parse one list line. Returns `None` for blank, comment and malformed lines.
pub fn parse_line(line: &str, default_label: &str) -> Option<ListEntry> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(COMMENT_MARKER) {
        return None;
    }

    let (hex, rest) = match line.find(is_separator) {
        Some(pos) => line.split_at(pos),
        None => (line, ""),
    };

    let fingerprint = Fingerprint::from_hex(hex)?;

    let rest = rest
        .split_once(COMMENT_MARKER)
        .map_or(rest, |(before, _)| before);
    let label = rest.trim_matches(is_separator);
    let label = if label.is_empty() { default_label } else { label };

    Some(ListEntry::new(fingerprint, label))
}

/// Parse list text into entries, preserving file order.
pub fn parse_list(text: &str, default_label: &str) -> Vec<ListEntry> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let entry = parse_line(line, default_label);
            if entry.is_none() {
                let trimmed = line.trim();
                if !trimmed.is_empty() && !trimmed.starts_with(COMMENT_MARKER) {
                    debug!(line = idx + 1, content = trimmed, "Skipping malformed list line");
                }
            }
            entry
        })
        .collect()
}

fn read_list(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| ModerationError::ListUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Load a list as a flat entry list for distance-bounded search.
pub fn load_entry_list(path: &Path, default_label: &str) -> Result<Vec<ListEntry>> {
    let text = read_list(path)?;
    let entries = parse_list(&text, default_label);
    debug!(path = %path.display(), entries = entries.len(), "Loaded list");
    Ok(entries)
}

/// Load a list as an exact-match index.
pub fn load_exact_map(path: &Path, default_label: &str) -> Result<ExactMatchIndex> {
    let index = ExactMatchIndex::from_entries(load_entry_list(path, default_label)?);
    debug!(path = %path.display(), fingerprints = index.len(), widths = ?index.widths(), "Built exact-match index");
    Ok(index)
}
