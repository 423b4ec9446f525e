// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::{bail, Result};
use burn::prelude::*;
use ndarray::{Array3, ArrayView3, Axis};
use std::path::Path;

use crate::data::batcher::{to_array, GlyphBatcher};
use crate::domain::{bitmap::to_pixel, mode::ExecutionMode};
use crate::infra::checkpoint::load_checkpoint;
use crate::ml::model::{GlyphModel, GlyphNet, GlyphNetConfig};

pub type InferBackend = burn::backend::Wgpu;

pub const DEFAULT_BATCH_SIZE: usize = 64;

const LOG_EVERY_BATCHES: usize = 10;

pub struct Inferencer<B: Backend, M: GlyphModel<B>> {
    model:      M,
    batcher:    GlyphBatcher<B>,
    batch_size: usize,
}

impl<B: Backend> Inferencer<B, GlyphNet<B>> {
    /// Build the network described by `net_cfg` and restore its
    /// parameters from a checkpoint directory (or a checkpoint root).
    pub fn from_checkpoint(
        net_cfg:    &GlyphNetConfig,
        path:       impl AsRef<Path>,
        device:     &B::Device,
        batch_size: usize,
    ) -> Result<Self> {
        let model: GlyphNet<B> = net_cfg.init(device);
        let (model, state) = load_checkpoint(path, model, device)?;
        tracing::info!("Model loaded from checkpoint (step {})", state.step);
        Self::new(model, device.clone(), batch_size)
    }
}

impl<B: Backend, M: GlyphModel<B>> Inferencer<B, M> {
    pub fn new(model: M, device: B::Device, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            bail!("Inference batch size must be at least 1");
        }
        Ok(Self { model, batcher: GlyphBatcher::new(device), batch_size })
    }

    /// Predict a target glyph for every source bitmap, in input order,
    /// as 8-bit pixels.
    pub fn predict(&self, sources: ArrayView3<f32>) -> Result<Array3<u8>> {
        let (count, h, w) = sources.dim();
        let mut outputs: Vec<Array3<u8>> = Vec::with_capacity(count.div_ceil(self.batch_size));

        for (i, chunk) in sources.axis_chunks_iter(Axis(0), self.batch_size).enumerate() {
            let input = self.batcher.bitmaps(chunk);
            let pred  = self.model.forward(input, ExecutionMode::Inference);
            outputs.push(to_array(pred)?.mapv(to_pixel));

            if (i + 1) % LOG_EVERY_BATCHES == 0 {
                tracing::info!("Inferred {} / {} glyphs", ((i + 1) * self.batch_size).min(count), count);
            }
        }

        if outputs.is_empty() {
            return Ok(Array3::zeros((0, h.div_ceil(2), w.div_ceil(2))));
        }
        let views: Vec<_> = outputs.iter().map(|a| a.view()).collect();
        Ok(ndarray::concatenate(Axis(0), &views)?)
    }
}
