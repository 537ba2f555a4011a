//! Perceptual fingerprints for image frames.
//!
//! A fingerprint is a fixed-width bit-string stored as an unsigned integer
//! together with its width. Visually similar frames produce fingerprints with a
//! small Hamming distance, so re-encoded, resized or lightly cropped copies of a
//! listed image still match.
//!
//! # Algorithms
//!
//! - [`HashAlgorithm::PHash64`]: DCT perceptual hash, 64 bits (default).
//! - [`HashAlgorithm::PHash128`]: DCT perceptual hash, 128 bits.
//! - [`HashAlgorithm::Blockhash64`]: grid-based blockhash, 64 bits.
//!
//! # Usage
//!
//! ```no_run
//! use modimg_core::phash::{Fingerprint, HashAlgorithm, PerceptualHasher};
//!
//! let image_data = std::fs::read("image.jpg").unwrap();
//! let hasher = PerceptualHasher::new(HashAlgorithm::PHash64);
//! let fingerprint = hasher.hash_bytes(&image_data).unwrap();
//!
//! let listed = Fingerprint::from_hex("3f3f3f3f3f3f3f3f").unwrap();
//! let distance = fingerprint.distance(&listed).unwrap();
//! let similar = distance <= 6;
//! ```

use std::fmt;
use std::str::FromStr;

use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ModerationError, Result};
use crate::frames::Frame;

use super::matcher::hamming_distance;

/// Widest fingerprint that fits the integer representation.
pub const MAX_HASH_BITS: u32 = 128;

/// Perceptual hash algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// DCT-based perceptual hash over an 8x8 coefficient block.
    #[default]
    PHash64,
    /// DCT-based perceptual hash over a 16x8 coefficient block.
    PHash128,
    /// Blockhash grid algorithm, 64 bits.
    #[cfg(feature = "blockhash")]
    Blockhash64,
}

impl HashAlgorithm {
    /// Width in bits of the fingerprints this algorithm produces.
    pub const fn bit_size(self) -> u32 {
        match self {
            HashAlgorithm::PHash64 => 64,
            HashAlgorithm::PHash128 => 128,
            #[cfg(feature = "blockhash")]
            HashAlgorithm::Blockhash64 => 64,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::PHash64 => "phash64",
            HashAlgorithm::PHash128 => "phash128",
            #[cfg(feature = "blockhash")]
            HashAlgorithm::Blockhash64 => "blockhash64",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phash" | "phash64" => Ok(HashAlgorithm::PHash64),
            "phash128" => Ok(HashAlgorithm::PHash128),
            #[cfg(feature = "blockhash")]
            "blockhash" | "blockhash64" => Ok(HashAlgorithm::Blockhash64),
            other => Err(format!("unknown hash algorithm: {other}")),
        }
    }
}

/// A fixed-width perceptual fingerprint.
///
/// Widths are multiples of 4 between 4 and [`MAX_HASH_BITS`], so every
/// fingerprint has a canonical hex form of exactly `bits / 4` digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    value: u128,
    bits: u32,
}

impl Fingerprint {
    /// Create a fingerprint, rejecting unsupported widths and values that do
    /// not fit in `bits`.
    pub fn new(value: u128, bits: u32) -> Option<Self> {
        if bits == 0 || bits > MAX_HASH_BITS || bits % 4 != 0 {
            return None;
        }
        if bits < MAX_HASH_BITS && value >> bits != 0 {
            return None;
        }
        Some(Self { value, bits })
    }

    /// Build a fingerprint from big-endian hash bytes.
    pub fn from_be_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() * 8 > MAX_HASH_BITS as usize {
            return None;
        }
        let value = bytes
            .iter()
            .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte));
        Self::new(value, (bytes.len() * 8) as u32)
    }

    /// Parse a hex fingerprint. The width is the number of hex digits times 4.
    ///
    /// Accepts an optional `0x` prefix and either letter case.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let digits = hex_str
            .strip_prefix("0x")
            .or_else(|| hex_str.strip_prefix("0X"))
            .unwrap_or(hex_str);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let bits = u32::try_from(digits.len()).ok()?.checked_mul(4)?;
        if bits > MAX_HASH_BITS {
            return None;
        }
        let value = u128::from_str_radix(digits, 16).ok()?;
        Self::new(value, bits)
    }

    pub const fn value(&self) -> u128 {
        self.value
    }

    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Canonical form: lowercase, zero-padded to `bits / 4` digits.
    pub fn to_hex(&self) -> String {
        format!("{:0width$x}", self.value, width = (self.bits / 4) as usize)
    }

    /// Hamming distance to another fingerprint.
    ///
    /// Returns `None` when the widths differ, since such fingerprints come
    /// from different algorithms and are not comparable.
    pub fn distance(&self, other: &Self) -> Option<u32> {
        (self.bits == other.bits).then(|| hamming_distance(self.value, other.value))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Perceptual hasher configuration and computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptualHasher {
    algorithm: HashAlgorithm,
}

impl PerceptualHasher {
    /// Create a new perceptual hasher with the specified algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Compute a fingerprint from encoded image bytes (JPEG, PNG, GIF, WebP).
    pub fn hash_bytes(&self, image_data: &[u8]) -> Result<Fingerprint> {
        let image = image::load_from_memory(image_data)
            .map_err(|e| ModerationError::Decode(e.to_string()))?;

        self.hash_image(&image)
    }

    /// Compute the fingerprint of one sampled frame.
    pub fn hash_frame(&self, frame: &Frame) -> Result<Fingerprint> {
        self.hash_image(&frame.image)
    }

    /// Compute a fingerprint from a decoded image.
    ///
    /// Fails with [`ModerationError::InvalidImage`] for images without pixels.
    pub fn hash_image(&self, image: &DynamicImage) -> Result<Fingerprint> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ModerationError::InvalidImage(format!(
                "image has no pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }

        let bytes: Vec<u8> = match self.algorithm {
            HashAlgorithm::PHash64 => dct_hash(image, 8, 8),
            HashAlgorithm::PHash128 => dct_hash(image, 16, 8),
            #[cfg(feature = "blockhash")]
            HashAlgorithm::Blockhash64 => {
                let hash: [u8; 8] = blockhash::blockhash64(image).into();
                hash.to_vec()
            }
        };

        Fingerprint::from_be_bytes(&bytes).ok_or_else(|| {
            ModerationError::InvalidImage(format!(
                "{} produced {} hash bytes",
                self.algorithm,
                bytes.len()
            ))
        })
    }

    /// Get the algorithm used by this hasher.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

/// Classic pHash: each bit compares a low-frequency DCT coefficient with the
/// median coefficient.
fn dct_hash(image: &DynamicImage, width: u32, height: u32) -> Vec<u8> {
    let hasher = HasherConfig::new()
        .hash_size(width, height)
        .hash_alg(HashAlg::Median)
        .preproc_dct()
        .to_hasher();
    hasher.hash_image(image).as_bytes().to_vec()
}
