// ============================================================
// Layer 4 — Font Dataset Manager
// ============================================================
// Loads a source font and a target font bitmap file, keeps the
// first `num_examples` aligned pairs, and splits them at a
// fixed point into training and validation regions.

use anyhow::{bail, Result};
use ndarray::{s, Axis};
use std::path::Path;

use crate::data::{
    loader::read_font_data,
    splitter::{split_train_val, EpochSampler},
};
use crate::domain::{bitmap::BitmapBatch, traits::GlyphSource};

pub struct FontDataManager {
    train:      BitmapBatch,
    validation: BitmapBatch,
    sampler:    EpochSampler,
}

impl FontDataManager {
    /// Read both fonts from disk and split at `split`.
    pub fn new(
        source_font:  impl AsRef<Path>,
        target_font:  impl AsRef<Path>,
        num_examples: usize,
        split:        usize,
    ) -> Result<Self> {
        let sources = read_font_data(source_font)?;
        let targets = read_font_data(target_font)?;

        let available = sources.len_of(Axis(0)).min(targets.len_of(Axis(0)));
        if available < num_examples {
            bail!(
                "Requested {num_examples} examples but the fonts only share {available} glyphs"
            );
        }

        let pairs = BitmapBatch::new(
            sources.slice(s![..num_examples, .., ..]).to_owned(),
            targets.slice(s![..num_examples, .., ..]).to_owned(),
        )?;
        Self::from_pairs(pairs, split, EpochSampler::new(split))
    }

    /// Build from pairs already in memory. Targets must be exactly
    /// half the source size, which is what the network's 2×2 pool emits.
    pub fn from_pairs(pairs: BitmapBatch, split: usize, sampler: EpochSampler) -> Result<Self> {
        let (_, sh, sw) = pairs.sources.dim();
        let (_, th, tw) = pairs.targets.dim();
        if th * 2 != sh || tw * 2 != sw {
            bail!("Target glyphs are {th}x{tw} but source glyphs are {sh}x{sw}; targets must be half the source size");
        }

        let (train, validation) = split_train_val(&pairs, split)?;
        tracing::info!(
            "Font dataset ready: {} training pairs, {} validation pairs",
            train.len(),
            validation.len()
        );
        Ok(Self { train, validation, sampler })
    }
}

impl GlyphSource for FontDataManager {
    fn next_train_batch(&mut self, n: usize) -> Result<BitmapBatch> {
        let indices = self.sampler.next_indices(n);
        Ok(self.train.select(&indices))
    }

    fn validation(&self) -> &BitmapBatch {
        &self.validation
    }

    fn train_len(&self) -> usize {
        self.train.len()
    }
}
