// ============================================================
// Layer 6 — Grid Renderer
// ============================================================
// Lays a stack of glyph bitmaps out row by row into a single
// grayscale PNG, `per_row` glyphs across. Used for training
// frames and for inference previews.

use anyhow::{bail, Context, Result};
use image::{GrayImage, Luma};
use ndarray::ArrayView3;
use std::path::Path;

/// Write `bitmaps` ([count, h, w]) as one grid image.
///
/// With `rescale` the values are treated as [0, 1] intensities and
/// multiplied by 255; without it they are already in [0, 255].
pub fn render_fonts_image(
    bitmaps: ArrayView3<f32>,
    path:    impl AsRef<Path>,
    per_row: usize,
    rescale: bool,
) -> Result<()> {
    let path = path.as_ref();
    let (count, h, w) = bitmaps.dim();
    if count == 0 {
        bail!("Nothing to render into '{}'", path.display());
    }

    let per_row = per_row.clamp(1, count);
    let rows    = count.div_ceil(per_row);
    let mut canvas = GrayImage::new((per_row * w) as u32, (rows * h) as u32);

    for (i, glyph) in bitmaps.outer_iter().enumerate() {
        let (ox, oy) = ((i % per_row) * w, (i / per_row) * h);
        for ((y, x), &v) in glyph.indexed_iter() {
            let v = if rescale { v * 255.0 } else { v };
            canvas.put_pixel((ox + x) as u32, (oy + y) as u32, Luma([v.clamp(0.0, 255.0) as u8]));
        }
    }

    canvas
        .save(path)
        .with_context(|| format!("Cannot write image '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_grid_dimensions_and_placement() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.png");

        // 5 glyphs of 3x2, 2 per row → 3 rows
        let bitmaps = Array3::from_shape_fn((5, 3, 2), |(i, _, _)| i as f32 / 4.0);
        render_fonts_image(bitmaps.view(), &path, 2, true).unwrap();

        let img = image::open(&path).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (4, 9));
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        // glyph 3 sits in row 1, column 1
        assert_eq!(img.get_pixel(2, 3)[0], 191);
        // glyph 4 is alone on the last row
        assert_eq!(img.get_pixel(0, 6)[0], 255);
        assert_eq!(img.get_pixel(3, 8)[0], 0);
    }

    #[test]
    fn test_prescaled_values_are_not_rescaled() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.png");

        let bitmaps = Array3::from_elem((1, 2, 2), 200.0f32);
        render_fonts_image(bitmaps.view(), &path, 10, false).unwrap();

        let img = image::open(&path).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(1, 1)[0], 200);
    }

    #[test]
    fn test_empty_stack_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bitmaps = Array3::<f32>::zeros((0, 2, 2));
        assert!(render_fonts_image(bitmaps.view(), dir.path().join("x.png"), 10, true).is_err());
    }
}
