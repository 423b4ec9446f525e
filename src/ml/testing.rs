// Small stand-ins for loop-level tests. The full GlyphNet is far
// too heavy for the CPU test backend at 160×160.

use burn::{module::Ignored, prelude::*, tensor::activation};
use ndarray::Array3;

use crate::data::{dataset::FontDataManager, splitter::EpochSampler};
use crate::domain::{bitmap::BitmapBatch, mode::ExecutionMode};
use crate::ml::{
    layers::{dropout, max_pool_2x2, Activation, SameMaxPool2d},
    model::{ConvBlock, GlyphModel},
};

/// One 3×3 block, pooling, dropout, sigmoid. Same contract as GlyphNet.
#[derive(Module, Debug)]
pub struct PoolNet<B: Backend> {
    pub block: ConvBlock<B>,
    pub pool:  Ignored<SameMaxPool2d>,
}

impl<B: Backend> PoolNet<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            block: ConvBlock::new(3, 1, 2, Activation::Relu, device),
            pool:  Ignored(max_pool_2x2()),
        }
    }
}

impl<B: Backend> GlyphModel<B> for PoolNet<B> {
    fn forward(&self, sources: Tensor<B, 3>, mode: ExecutionMode) -> Tensor<B, 3> {
        let [batch, h, w] = sources.dims();
        let x = self.block.forward(sources.reshape([batch, 1, h, w]), mode);
        // collapse the two channels back to one
        let x = x.mean_dim(1);
        let x = activation::sigmoid(dropout(self.pool.0.forward(x), mode));
        let [batch, _, out_h, out_w] = x.dims();
        x.reshape([batch, out_h, out_w])
    }
}

/// `count` pairs of side×side sources and (side/2)×(side/2) targets.
/// Glyph `i` is a diagonal band whose offset depends on `i`, so pairs
/// are distinguishable and the target is a 2× downsample of the source.
pub fn synthetic_pairs(count: usize, side: usize) -> BitmapBatch {
    let ink = |i: usize, y: usize, x: usize, scale: usize| {
        if (x * scale + y * scale + i) % 5 < 2 { 1.0 } else { 0.0 }
    };
    let sources = Array3::from_shape_fn((count, side, side), |(i, y, x)| ink(i, y, x, 1));
    let targets = Array3::from_shape_fn((count, side / 2, side / 2), |(i, y, x)| ink(i, y, x, 2));
    BitmapBatch::new(sources, targets).unwrap()
}

pub fn synthetic_dataset(count: usize, split: usize, side: usize) -> FontDataManager {
    FontDataManager::from_pairs(synthetic_pairs(count, side), split, EpochSampler::seeded(split, 42))
        .unwrap()
}
