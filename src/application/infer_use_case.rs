// ============================================================
// Layer 2 — InferUseCase
// ============================================================
//   Step 1: Validate the configuration
//   Step 2: Create the bitmap output directory
//   Step 3: Locate the checkpoint and restore the network
//   Step 4: Predict every source glyph
//   Step 5: Persist the .npy array and preview grids

use anyhow::{bail, Context, Result};
use ndarray::{s, Array3, Axis};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::loader::{read_font_data, write_bitmaps};
use crate::domain::model_size::ModelSize;
use crate::infra::{checkpoint::resolve_checkpoint, render::render_fonts_image};
use crate::ml::{
    inferencer::{InferBackend, Inferencer, DEFAULT_BATCH_SIZE},
    model::GlyphNetConfig,
};

pub const OUTPUT_NAME: &str = "target.bitmap.npy";

const IMAGES_PER_GRID: usize = 100;
const IMAGES_PER_ROW:  usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferConfig {
    pub model:       ModelSize,
    pub alpha:       f64,
    pub source_font: Option<String>,
    pub ckpt:        Option<String>,
    pub bitmap_dir:  String,
    pub batch_size:  usize,
}

impl Default for InferConfig {
    fn default() -> Self {
        Self {
            model:       ModelSize::Medium,
            alpha:       -1.0,
            source_font: None,
            ckpt:        None,
            bitmap_dir:  "/tmp/bitmap".to_string(),
            batch_size:  DEFAULT_BATCH_SIZE,
        }
    }
}

impl InferConfig {
    pub fn validate(&self) -> Result<()> {
        if self.source_font.is_none() {
            bail!("source_font not specified");
        }
        if self.ckpt.is_none() {
            bail!("ckpt not specified");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        Ok(())
    }

    pub fn network(&self) -> GlyphNetConfig {
        GlyphNetConfig::new().with_size(self.model).with_alpha(self.alpha)
    }
}

/// Files written by one inference run.
#[derive(Debug)]
pub struct InferOutput {
    pub bitmaps: PathBuf,
    pub grids:   Vec<PathBuf>,
}

pub struct InferUseCase {
    config: InferConfig,
}

impl InferUseCase {
    pub fn new(config: InferConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<InferOutput> {
        let cfg = &self.config;
        cfg.validate()?;

        fs::create_dir_all(&cfg.bitmap_dir)
            .with_context(|| format!("Cannot create bitmap dir '{}'", cfg.bitmap_dir))?;

        let (Some(source), Some(ckpt)) = (&cfg.source_font, &cfg.ckpt) else {
            bail!("source_font or ckpt not specified");
        };

        let ckpt = resolve_checkpoint(ckpt)?;

        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        let inferencer = Inferencer::<InferBackend, _>::from_checkpoint(
            &cfg.network(),
            ckpt,
            &device,
            cfg.batch_size,
        )?;

        let sources = read_font_data(source)?;
        tracing::info!("Inferring {} glyphs from '{}'", sources.len_of(Axis(0)), source);
        let predictions = inferencer.predict(sources.view())?;

        persist_predictions(&predictions, &cfg.bitmap_dir)
    }
}

/// Write the predicted bitmaps and render them in grids of 100.
pub fn persist_predictions(bitmaps: &Array3<u8>, dir: impl AsRef<Path>) -> Result<InferOutput> {
    let dir  = dir.as_ref();
    let path = dir.join(OUTPUT_NAME);
    write_bitmaps(&path, bitmaps)?;
    tracing::info!("Bitmaps saved at '{}'", path.display());

    let count = bitmaps.len_of(Axis(0));
    let mut grids = Vec::with_capacity(count.div_ceil(IMAGES_PER_GRID));
    for start in (0..count).step_by(IMAGES_PER_GRID) {
        let end   = (start + IMAGES_PER_GRID).min(count);
        let chunk = bitmaps.slice(s![start..end, .., ..]).mapv(f32::from);
        let grid  = dir.join(format!("fonts_{start:04}_to_{end:04}.png"));
        render_fonts_image(chunk.view(), &grid, IMAGES_PER_ROW, false)?;
        grids.push(grid);
    }
    tracing::info!("Rendered {} preview grids in '{}'", grids.len(), dir.display());

    Ok(InferOutput { bitmaps: path, grids })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::read_raw_bitmaps;

    #[test]
    fn test_validate_requires_font_and_checkpoint() {
        let cfg = InferConfig::default();
        assert!(cfg.validate().is_err());

        let cfg = InferConfig { source_font: Some("a.npy".into()), ..InferConfig::default() };
        assert!(cfg.validate().is_err());

        let cfg = InferConfig {
            source_font: Some("a.npy".into()),
            ckpt:        Some("/tmp/checkpoints".into()),
            ..InferConfig::default()
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.batch_size, 64);
    }

    #[test]
    fn test_persist_writes_array_and_grids() {
        let dir     = tempfile::tempdir().unwrap();
        let bitmaps = Array3::from_shape_fn((130, 4, 4), |(i, _, _)| (i % 256) as u8);

        let out = persist_predictions(&bitmaps, dir.path()).unwrap();

        assert_eq!(read_raw_bitmaps(&out.bitmaps).unwrap(), bitmaps);
        assert_eq!(
            out.grids,
            vec![
                dir.path().join("fonts_0000_to_0100.png"),
                dir.path().join("fonts_0100_to_0130.png"),
            ]
        );

        // 100 glyphs of 4×4, 10 per row
        let first = image::open(&out.grids[0]).unwrap().to_luma8();
        assert_eq!(first.dimensions(), (40, 40));
        let last = image::open(&out.grids[1]).unwrap().to_luma8();
        assert_eq!(last.dimensions(), (40, 12));
    }

    #[test]
    fn test_missing_checkpoint_is_fatal() {
        let dir  = tempfile::tempdir().unwrap();
        let font = dir.path().join("source.npy");
        write_bitmaps(&font, &Array3::zeros((2, 4, 4))).unwrap();

        let cfg = InferConfig {
            source_font: Some(font.display().to_string()),
            ckpt:        Some(dir.path().join("missing").display().to_string()),
            bitmap_dir:  dir.path().join("bitmap").display().to_string(),
            ..InferConfig::default()
        };
        assert!(InferUseCase::new(cfg).execute().is_err());
    }
}
