// ============================================================
// Layer 3 — Bitmap Domain Types
// ============================================================
// Glyph bitmaps are grayscale intensity grids stored as
// [count, side, side] arrays. Sources are 160×160 renderings
// of the source font, targets are 80×80 renderings of the
// same characters in the target font.
//
// Pairing is positional: sources[i] and targets[i] always
// describe the same character. The data layer establishes
// that alignment; everything downstream only relies on it.

use anyhow::{bail, Result};
use ndarray::{Array3, ArrayView3, Axis};

/// Side length of a source glyph bitmap (network input)
pub const SOURCE_SIDE: usize = 160;

/// Side length of a target glyph bitmap (network output)
pub const TARGET_SIDE: usize = 80;

/// A batch of aligned source/target bitmaps with intensities in [0, 1].
#[derive(Debug, Clone)]
pub struct BitmapBatch {
    /// Shape: [count, SOURCE_SIDE, SOURCE_SIDE]
    pub sources: Array3<f32>,

    /// Shape: [count, TARGET_SIDE, TARGET_SIDE]
    pub targets: Array3<f32>,
}

impl BitmapBatch {
    /// Build a batch, rejecting arrays whose glyph counts disagree.
    pub fn new(sources: Array3<f32>, targets: Array3<f32>) -> Result<Self> {
        let (n_src, n_tgt) = (sources.len_of(Axis(0)), targets.len_of(Axis(0)));
        if n_src != n_tgt {
            bail!("Source and target glyph counts differ: {n_src} vs {n_tgt}");
        }
        Ok(Self { sources, targets })
    }

    pub fn len(&self) -> usize {
        self.sources.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out the pairs at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            sources: self.sources.select(Axis(0), indices),
            targets: self.targets.select(Axis(0), indices),
        }
    }
}

/// Convert a [0, 1] network output to an 8-bit intensity.
///
/// The value is scaled by 255 and truncated, then clamped so a
/// rounding overshoot past 255 saturates instead of wrapping to 0.
pub fn to_pixel(value: f32) -> u8 {
    (value * 255.0).trunc().clamp(0.0, 255.0) as u8
}

/// Map raw 8-bit intensities to [0, 1] floats.
pub fn normalize(raw: ArrayView3<u8>) -> Array3<f32> {
    raw.mapv(|v| f32::from(v) / 255.0)
}
