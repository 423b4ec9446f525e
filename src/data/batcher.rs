// ============================================================
// Layer 4 — Glyph Batcher
// ============================================================
// Converts host-side ndarray bitmaps into Burn tensors on a
// chosen device.
//
// How batching works here:
//   Input:  Array3<f32> of shape [N, H, W]
//   Output: Tensor<B, 3> of shape [N, H, W]
//
//   The array is flattened in row-major order and reshaped on
//   the device, exactly mirroring its logical layout.
//
// The batcher is generic over the backend so the same code
// feeds the autodiff backend (optimizer steps) and the plain
// inner backend (evaluation, inference).

use burn::{prelude::*, tensor::TensorData};
use ndarray::{Array3, ArrayView3};

use crate::domain::bitmap::BitmapBatch;

// ─── GlyphBatch ───────────────────────────────────────────────────────────────
/// A batch of glyph pairs ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct GlyphBatch<B: Backend> {
    /// Source bitmaps, shape: [batch_size, 160, 160]
    pub sources: Tensor<B, 3>,

    /// Target bitmaps, shape: [batch_size, 80, 80]
    pub targets: Tensor<B, 3>,
}

// ─── GlyphBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct GlyphBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> GlyphBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn batch(&self, pairs: &BitmapBatch) -> GlyphBatch<B> {
        GlyphBatch {
            sources: self.bitmaps(pairs.sources.view()),
            targets: self.bitmaps(pairs.targets.view()),
        }
    }

    /// Upload a stack of bitmaps as a [N, H, W] tensor.
    pub fn bitmaps(&self, bitmaps: ArrayView3<f32>) -> Tensor<B, 3> {
        let (n, h, w) = bitmaps.dim();
        let flat: Vec<f32> = bitmaps.iter().copied().collect();
        Tensor::from_data(TensorData::new(flat, [n, h, w]), &self.device)
    }
}

/// Download a [N, H, W] tensor back into host memory.
pub fn to_array<B: Backend>(tensor: Tensor<B, 3>) -> anyhow::Result<Array3<f32>> {
    let [n, h, w] = tensor.dims();
    let flat = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read tensor data: {e:?}"))?;
    Ok(Array3::from_shape_vec((n, h, w), flat)?)
}
