// ============================================================
// Layer 4 — Font Bitmap Loader
// ============================================================
// Reads pre-rendered glyph bitmaps from NumPy .npy files.
//
// File layout expected on disk:
//   shape [count, side, side], dtype uint8, C order
//   one glyph per leading index, 0 = background, 255 = ink
//
// Source fonts are rendered at 160×160, target fonts at 80×80.
// The same character must sit at the same index in both files.

use anyhow::{bail, Context, Result};
use ndarray::{Array3, Axis};
use ndarray_npy::{read_npy, write_npy};
use std::path::Path;

use crate::domain::bitmap::normalize;

/// Load a glyph bitmap file, normalised to [0, 1] floats.
pub fn read_font_data(path: impl AsRef<Path>) -> Result<Array3<f32>> {
    let raw = read_raw_bitmaps(path)?;
    Ok(normalize(raw.view()))
}

/// Load a glyph bitmap file as raw 8-bit intensities.
pub fn read_raw_bitmaps(path: impl AsRef<Path>) -> Result<Array3<u8>> {
    let path = path.as_ref();
    if !path.exists() {
        bail!("Font bitmap file '{}' does not exist", path.display());
    }

    let raw: Array3<u8> = read_npy(path)
        .with_context(|| format!("Cannot read bitmap array from '{}'", path.display()))?;

    let (_, h, w) = raw.dim();
    if h != w {
        bail!("Bitmaps in '{}' are not square: {h}x{w}", path.display());
    }

    tracing::debug!(
        "Read {} bitmaps of {}x{} from '{}'",
        raw.len_of(Axis(0)), h, w, path.display()
    );
    Ok(raw)
}

/// Persist 8-bit bitmaps as a .npy file.
pub fn write_bitmaps(path: impl AsRef<Path>, bitmaps: &Array3<u8>) -> Result<()> {
    let path = path.as_ref();
    write_npy(path, bitmaps)
        .with_context(|| format!("Cannot write bitmap array to '{}'", path.display()))
}
