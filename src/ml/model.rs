use burn::{
    module::Ignored,
    prelude::*,
    tensor::activation,
};

use crate::domain::{mode::ExecutionMode, model_size::ModelSize};
use crate::ml::layers::{
    dropout, max_pool_2x2, Activation, BatchNorm, SameConv2d, SameConv2dConfig, SameMaxPool2d,
};

/// Anything that maps a stack of source bitmaps [batch, H, W] to
/// predicted target bitmaps [batch, H/2, W/2] with values in [0, 1].
pub trait GlyphModel<B: Backend>: Module<B> {
    fn forward(&self, sources: Tensor<B, 3>, mode: ExecutionMode) -> Tensor<B, 3>;
}

// (kernel, in_channels, out_channels, fixed layer count)
// `None` means the group depth follows the model size class.
const GROUPS: [(usize, usize, usize, Option<usize>); 4] = [
    (64,  1,   8, Some(2)),
    (32,  8,  32, None),
    (16, 32,  64, None),
    (7,  64, 128, None),
];

#[derive(Config, Debug)]
pub struct GlyphNetConfig {
    #[config(default = "ModelSize::Medium")]
    pub size:  ModelSize,
    /// Leaky ReLU slope; negative selects plain ReLU
    #[config(default = "-1.0")]
    pub alpha: f64,
}

impl GlyphNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GlyphNet<B> {
        let activation = Activation::from_slope(self.alpha);
        let layers     = self.size.layers();

        let groups = GROUPS
            .iter()
            .map(|&(kernel, in_ch, out_ch, fixed)| {
                BlockGroup::new(kernel, in_ch, out_ch, fixed.unwrap_or(layers), activation, device)
            })
            .collect();

        let head = vec![
            ConvBlock::new(3, 128, 128, activation, device),
            ConvBlock::new(3, 128, 1, activation, device),
        ];

        GlyphNet { groups, head, pool: Ignored(max_pool_2x2()) }
    }
}

// ─── ConvBlock ────────────────────────────────────────────────────────────────
/// conv2d → batch norm → activation
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv:       SameConv2d<B>,
    pub norm:       BatchNorm<B>,
    pub activation: Ignored<Activation>,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(
        kernel:     usize,
        in_ch:      usize,
        out_ch:     usize,
        activation: Activation,
        device:     &B::Device,
    ) -> Self {
        Self {
            conv:       SameConv2dConfig::new(in_ch, out_ch, kernel).init(device),
            norm:       BatchNorm::new(out_ch, device),
            activation: Ignored(activation),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>, mode: ExecutionMode) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.norm.forward(x, mode);
        self.activation.0.forward(x)
    }
}

// ─── BlockGroup ───────────────────────────────────────────────────────────────
/// `layers` ConvBlocks sharing one kernel size. Only the first
/// changes the channel count.
#[derive(Module, Debug)]
pub struct BlockGroup<B: Backend> {
    pub blocks: Vec<ConvBlock<B>>,
}

impl<B: Backend> BlockGroup<B> {
    pub fn new(
        kernel:     usize,
        in_ch:      usize,
        out_ch:     usize,
        layers:     usize,
        activation: Activation,
        device:     &B::Device,
    ) -> Self {
        let blocks = (0..layers)
            .map(|i| {
                let from = if i == 0 { in_ch } else { out_ch };
                ConvBlock::new(kernel, from, out_ch, activation, device)
            })
            .collect();
        Self { blocks }
    }

    pub fn forward(&self, x: Tensor<B, 4>, mode: ExecutionMode) -> Tensor<B, 4> {
        self.blocks.iter().fold(x, |x, block| block.forward(x, mode))
    }
}

// ─── GlyphNet ─────────────────────────────────────────────────────────────────
//   [batch, 160, 160]
//     → 64×64 group (2 blocks,  1 →   8)
//     → 32×32 group (N blocks,  8 →  32)
//     → 16×16 group (N blocks, 32 →  64)
//     →   7×7 group (N blocks, 64 → 128)
//     → 3×3 block 128 → 128, 3×3 block 128 → 1
//     → 2×2 max pool (SAME) → dropout → sigmoid
//   [batch, 80, 80]
#[derive(Module, Debug)]
pub struct GlyphNet<B: Backend> {
    pub groups: Vec<BlockGroup<B>>,
    pub head:   Vec<ConvBlock<B>>,
    pub pool:   Ignored<SameMaxPool2d>,
}

impl<B: Backend> GlyphNet<B> {
    /// Blocks per group, in pipeline order
    pub fn group_depths(&self) -> Vec<usize> {
        self.groups.iter().map(|g| g.blocks.len()).collect()
    }
}

impl<B: Backend> GlyphModel<B> for GlyphNet<B> {
    fn forward(&self, sources: Tensor<B, 3>, mode: ExecutionMode) -> Tensor<B, 3> {
        let [batch, h, w] = sources.dims();
        let x = sources.reshape([batch, 1, h, w]);

        let x = self.groups.iter().fold(x, |x, group| group.forward(x, mode));
        let x = self.head.iter().fold(x, |x, block| block.forward(x, mode));

        let x = self.pool.0.forward(x);
        let x = dropout(x, mode);
        let x = activation::sigmoid(x);

        let [batch, _, out_h, out_w] = x.dims();
        x.reshape([batch, out_h, out_w])
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bitmap::{SOURCE_SIDE, TARGET_SIDE};
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_group_depth_follows_size_class() {
        let device = Default::default();
        for size in [ModelSize::Small, ModelSize::Medium, ModelSize::Big] {
            let net = GlyphNetConfig::new().with_size(size).init::<TestBackend>(&device);
            let n   = size.layers();
            assert_eq!(net.group_depths(), vec![2, n, n, n]);
            assert_eq!(net.head.len(), 2);
        }
    }

    #[test]
    fn test_channel_progression() {
        let device = Default::default();
        let net = GlyphNetConfig::new().with_size(ModelSize::Small).init::<TestBackend>(&device);

        let widths: Vec<[usize; 4]> = net
            .groups
            .iter()
            .flat_map(|g| g.blocks.iter())
            .chain(net.head.iter())
            .map(|b| b.conv.conv.weight.dims())
            .collect();

        // [out, in, k, k]
        assert_eq!(widths[0], [8, 1, 64, 64]);
        assert_eq!(widths[1], [8, 8, 64, 64]);
        assert_eq!(widths[2], [32, 8, 32, 32]);
        assert_eq!(widths[3], [32, 32, 32, 32]);
        assert_eq!(widths[6], [128, 64, 7, 7]);
        assert_eq!(widths[8], [128, 128, 3, 3]);
        assert_eq!(widths[9], [1, 128, 3, 3]);
    }

    #[test]
    fn test_output_is_half_the_input_for_every_size() {
        let device = Default::default();
        for size in [ModelSize::Small, ModelSize::Medium, ModelSize::Big] {
            let net = GlyphNetConfig::new().with_size(size).init::<TestBackend>(&device);
            let x   = Tensor::<TestBackend, 3>::random([2, 4, 4], Distribution::Default, &device);
            let y   = net.forward(x, ExecutionMode::Inference);
            assert_eq!(y.dims(), [2, 2, 2]);

            let values = y.into_data().to_vec::<f32>().unwrap();
            assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_leaky_configuration_trains_a_step() {
        let device = Default::default();
        let net = GlyphNetConfig::new()
            .with_size(ModelSize::Small)
            .with_alpha(0.2)
            .init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::random([3, 4, 4], Distribution::Default, &device);
        let y = net.forward(x, ExecutionMode::Training { keep_prob: 0.9 });
        assert_eq!(y.dims(), [3, 2, 2]);
    }

    #[test]
    fn test_full_resolution_shape_walk() {
        use crate::ml::layers::same_padding;

        let device = Default::default();
        for size in [ModelSize::Small, ModelSize::Medium, ModelSize::Big] {
            let net = GlyphNetConfig::new().with_size(size).init::<TestBackend>(&device);

            // every SAME conv keeps 160×160
            for block in net.groups.iter().flat_map(|g| g.blocks.iter()).chain(net.head.iter()) {
                let conv = &block.conv;
                let (before, after) = same_padding(SOURCE_SIDE, conv.kernel, conv.stride);
                let out = (SOURCE_SIDE + before + after - conv.kernel) / conv.stride + 1;
                assert_eq!(out, SOURCE_SIDE, "kernel {}", conv.kernel);
            }

            // the last block and the pool run for real at full size
            let x = Tensor::<TestBackend, 4>::zeros([1, 128, SOURCE_SIDE, SOURCE_SIDE], &device);
            let x = net.head[1].forward(x, ExecutionMode::Inference);
            assert_eq!(x.dims(), [1, 1, SOURCE_SIDE, SOURCE_SIDE]);
            assert_eq!(net.pool.0.forward(x).dims(), [1, 1, TARGET_SIDE, TARGET_SIDE]);
        }
    }

    // Full resolution pass. Slow on the CPU backend.
    #[test]
    #[ignore]
    fn test_full_resolution_output_shape() {
        let device = Default::default();
        let net = GlyphNetConfig::new().with_size(ModelSize::Small).init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::zeros([1, SOURCE_SIDE, SOURCE_SIDE], &device);
        let y = net.forward(x, ExecutionMode::Inference);
        assert_eq!(y.dims(), [1, TARGET_SIDE, TARGET_SIDE]);
    }
}
