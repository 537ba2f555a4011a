//! Frame loading and sampling for still and animated images.

use std::io::Cursor;
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, DynamicImage, ImageError, ImageFormat, ImageResult};
use tracing::debug;

use crate::error::{ModerationError, Result};

/// Number of frames sampled from an animation when the caller has no opinion.
pub const DEFAULT_SAMPLE_FRAMES: usize = 12;

/// A decoded RGB frame and its position in the source sequence.
#[derive(Debug, Clone)]
pub struct Frame {
    pub idx: usize,
    pub image: DynamicImage,
}

impl Frame {
    pub fn new(idx: usize, image: DynamicImage) -> Self {
        Self { idx, image }
    }
}

/// Indices to keep from an animation of `n` frames.
///
/// Always includes the first and last frame and spreads the rest evenly.
/// Midpoints `j * (n - 1) / (sample_frames - 1)` are computed exactly and
/// round half to even.
pub fn sample_indices(n: usize, sample_frames: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    if n <= sample_frames || sample_frames <= 1 {
        return (0..n).collect();
    }

    let last = n - 1;
    let segments = sample_frames - 1;
    let mut indices: Vec<usize> = std::iter::once(0)
        .chain((1..segments).map(|j| div_round_half_even(j * last, segments)))
        .chain(std::iter::once(last))
        .map(|k| k.min(last))
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

fn div_round_half_even(num: usize, den: usize) -> usize {
    let (q, r) = (num / den, num % den);
    match (2 * r).cmp(&den) {
        std::cmp::Ordering::Less => q,
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Equal => q + q % 2,
    }
}

/// Read an image file and return its sampled frames.
pub fn load_frames(path: &Path, sample_frames: usize) -> Result<Vec<Frame>> {
    let data = std::fs::read(path).map_err(|source| ModerationError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), bytes = data.len(), "Read image");
    decode_frames(&data, sample_frames)
}

/// Decode encoded image bytes into sampled RGB frames.
///
/// Animated GIF, APNG and WebP inputs with more than one frame are sampled
/// with [`sample_indices`]; everything else is a single frame at index 0.
pub fn decode_frames(data: &[u8], sample_frames: usize) -> Result<Vec<Frame>> {
    let animated = match image::guess_format(data) {
        Ok(ImageFormat::Gif) => {
            sample_animation(|| GifDecoder::new(Cursor::new(data)), sample_frames)?
        }
        Ok(ImageFormat::Png) => {
            let decoder = PngDecoder::new(Cursor::new(data)).map_err(decode_error)?;
            if decoder.is_apng().map_err(decode_error)? {
                sample_animation(
                    || PngDecoder::new(Cursor::new(data)).and_then(PngDecoder::apng),
                    sample_frames,
                )?
            } else {
                None
            }
        }
        Ok(ImageFormat::WebP) => {
            let decoder = WebPDecoder::new(Cursor::new(data)).map_err(decode_error)?;
            if decoder.has_animation() {
                sample_animation(|| WebPDecoder::new(Cursor::new(data)), sample_frames)?
            } else {
                None
            }
        }
        _ => None,
    };

    if let Some(frames) = animated {
        return Ok(frames);
    }

    let image = image::load_from_memory(data).map_err(decode_error)?;
    Ok(vec![Frame::new(0, DynamicImage::ImageRgb8(image.to_rgb8()))])
}

/// Sample an animation without holding unsampled frames in memory.
///
/// The first pass counts frames, the second keeps only the sampled ones and
/// stops after the last of them. Returns `None` for single-frame animations.
fn sample_animation<'a, D, F>(open: F, sample_frames: usize) -> Result<Option<Vec<Frame>>>
where
    D: AnimationDecoder<'a>,
    F: Fn() -> ImageResult<D>,
{
    let total = open()
        .map_err(decode_error)?
        .into_frames()
        .try_fold(0usize, |n, frame| frame.map(|_| n + 1))
        .map_err(decode_error)?;
    if total <= 1 {
        return Ok(None);
    }

    let indices = sample_indices(total, sample_frames);
    debug!(total, sampled = indices.len(), "Sampling animation frames");

    let mut wanted = indices.iter().copied().peekable();
    let mut frames = Vec::with_capacity(indices.len());
    for (idx, frame) in open().map_err(decode_error)?.into_frames().enumerate() {
        let Some(&next) = wanted.peek() else {
            break;
        };
        let frame = frame.map_err(decode_error)?;
        if idx == next {
            wanted.next();
            let rgb = DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8();
            frames.push(Frame::new(idx, DynamicImage::ImageRgb8(rgb)));
        }
    }
    Ok(Some(frames))
}

fn decode_error(e: ImageError) -> ModerationError {
    ModerationError::Decode(e.to_string())
}
