//! Perceptual-hash matching.
//!
//! This module turns image frames into fixed-width fingerprints and matches
//! them against allow/block lists, either exactly through an index or within a
//! Hamming-distance bound.
//!
//! # Components
//!
//! - **Codec**: [`PerceptualHasher`] and [`Fingerprint`].
//! - **List store**: [`load_exact_map`], [`load_entry_list`] and the line parser.
//! - **Matcher**: [`hamming_distance`] and [`best_match`], a linear scan with
//!   first-in-list tie-breaking.

pub mod codec;
pub mod list;
pub mod matcher;

pub use codec::{Fingerprint, HashAlgorithm, PerceptualHasher, MAX_HASH_BITS};
pub use list::{
    load_entry_list, load_exact_map, parse_line, parse_list, resolve_list_path, ExactMatchIndex,
    ListEntry,
};
pub use matcher::{best_match, hamming_distance, Match};
