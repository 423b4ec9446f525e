// ============================================================
// Layer 5 — Layer Primitives
// ============================================================
// Building blocks the network is assembled from:
//
//   SameConv2d  — 2D convolution + bias with TensorFlow style
//                 SAME padding (also for even kernel sizes)
//   BatchNorm   — per-channel normalization with an explicit
//                 training / inference code path
//   Activation  — ReLU or leaky ReLU
//   SameMaxPool2d — 2×2 / stride 2 max pooling, SAME padded
//   dropout
//
// All tensors are NCHW: [batch, channels, height, width].

use burn::{
    module::{Ignored, Param, RunningState},
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Initializer, PaddingConfig2d,
    },
    prelude::*,
    tensor::{activation, Distribution},
};
use serde::{Deserialize, Serialize};

use crate::domain::mode::ExecutionMode;

/// Std dev of the zero-centred normal used for conv kernels
pub const WEIGHT_STD: f64 = 0.01;
/// Initial value of every conv bias
pub const BIAS_INIT: f64 = 0.1;
/// Decay of the batch-norm moving averages
pub const BN_DECAY: f64 = 0.9;
pub const BN_EPSILON: f64 = 1e-3;

// ─── Convolution ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Padding {
    /// Output spatial size is ceil(input / stride)
    Same,
    /// No padding at all
    Valid,
}

/// (before, after) padding along one axis, TensorFlow SAME rules.
/// Odd totals put the extra row/column after the input.
pub fn same_padding(input: usize, kernel: usize, stride: usize) -> (usize, usize) {
    let out   = input.div_ceil(stride);
    let total = ((out.max(1) - 1) * stride + kernel).saturating_sub(input);
    (total / 2, total - total / 2)
}

#[derive(Config, Debug)]
pub struct SameConv2dConfig {
    pub in_channels:  usize,
    pub out_channels: usize,
    pub kernel:       usize,
    #[config(default = 1)]
    pub stride:       usize,
    #[config(default = "Padding::Same")]
    pub padding:      Padding,
}

impl SameConv2dConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SameConv2d<B> {
        let mut conv = Conv2dConfig::new(
            [self.in_channels, self.out_channels],
            [self.kernel, self.kernel],
        )
        .with_stride([self.stride, self.stride])
        .with_padding(PaddingConfig2d::Valid)
        .with_initializer(Initializer::Normal { mean: 0.0, std: WEIGHT_STD })
        .init(device);

        conv.bias = Some(Initializer::Constant { value: BIAS_INIT }.init([self.out_channels], device));

        SameConv2d {
            conv,
            kernel:  self.kernel,
            stride:  self.stride,
            padding: Ignored(self.padding),
        }
    }
}

#[derive(Module, Debug)]
pub struct SameConv2d<B: Backend> {
    pub conv:    Conv2d<B>,
    pub kernel:  usize,
    pub stride:  usize,
    pub padding: Ignored<Padding>,
}

impl<B: Backend> SameConv2d<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = match self.padding.0 {
            Padding::Valid => x,
            Padding::Same  => {
                let [_, _, h, w] = x.dims();
                zero_pad(
                    x,
                    same_padding(h, self.kernel, self.stride),
                    same_padding(w, self.kernel, self.stride),
                )
            }
        };
        self.conv.forward(x)
    }
}

/// Surround the spatial dims with zeros.
fn zero_pad<B: Backend>(
    x: Tensor<B, 4>,
    (top, bottom): (usize, usize),
    (left, right): (usize, usize),
) -> Tensor<B, 4> {
    if top + bottom + left + right == 0 {
        return x;
    }
    let [n, c, h, w] = x.dims();
    let device = x.device();
    Tensor::zeros([n, c, h + top + bottom, w + left + right], &device)
        .slice_assign([0..n, 0..c, top..top + h, left..left + w], x)
}

/// Like `zero_pad`, but the border holds `value`.
fn constant_pad<B: Backend>(
    x: Tensor<B, 4>,
    (top, bottom): (usize, usize),
    (left, right): (usize, usize),
    value: f32,
) -> Tensor<B, 4> {
    if top + bottom + left + right == 0 {
        return x;
    }
    let [n, c, h, w] = x.dims();
    let device = x.device();
    Tensor::full([n, c, h + top + bottom, w + left + right], value, &device)
        .slice_assign([0..n, 0..c, top..top + h, left..left + w], x)
}

// ─── Batch Normalization ──────────────────────────────────────────────────────
// Two code paths selected by ExecutionMode:
//   training  → normalise with this batch's mean/variance and
//               fold them into the moving averages
//   inference → normalise with the moving averages only

#[derive(Module, Debug)]
pub struct BatchNorm<B: Backend> {
    pub gamma:        Param<Tensor<B, 1>>,
    pub beta:         Param<Tensor<B, 1>>,
    pub running_mean: RunningState<Tensor<B, 1>>,
    pub running_var:  RunningState<Tensor<B, 1>>,
    pub decay:        f64,
    pub epsilon:      f64,
}

impl<B: Backend> BatchNorm<B> {
    pub fn new(channels: usize, device: &B::Device) -> Self {
        Self {
            gamma:        Initializer::Ones.init([channels], device),
            beta:         Initializer::Zeros.init([channels], device),
            running_mean: RunningState::new(Tensor::zeros([channels], device)),
            running_var:  RunningState::new(Tensor::ones([channels], device)),
            decay:        BN_DECAY,
            epsilon:      BN_EPSILON,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>, mode: ExecutionMode) -> Tensor<B, 4> {
        match mode {
            ExecutionMode::Training { .. } => self.forward_train(x),
            ExecutionMode::Inference       => self.forward_inference(x),
        }
    }

    fn forward_train(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, channels, _, _] = x.dims();

        // moments over batch and spatial dims, biased variance
        let mean     = x.clone().mean_dim(0).mean_dim(2).mean_dim(3);
        let centered = x - mean.clone();
        let var      = centered.clone().powf_scalar(2.0).mean_dim(0).mean_dim(2).mean_dim(3);

        self.update_moving_averages(mean.reshape([channels]), var.clone().reshape([channels]));
        self.scale_and_shift(centered, var)
    }

    fn forward_inference(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, channels, _, _] = x.dims();
        let mean = self.running_mean.value_sync().reshape([1, channels, 1, 1]);
        let var  = self.running_var.value_sync().reshape([1, channels, 1, 1]);
        self.scale_and_shift(x - mean, var)
    }

    fn update_moving_averages(&self, mean: Tensor<B, 1>, var: Tensor<B, 1>) {
        let keep = 1.0 - self.decay;
        let mean = self.running_mean.value_sync().mul_scalar(self.decay)
            .add(mean.detach().mul_scalar(keep));
        let var  = self.running_var.value_sync().mul_scalar(self.decay)
            .add(var.detach().mul_scalar(keep));
        self.running_mean.update(mean.detach());
        self.running_var.update(var.detach());
    }

    fn scale_and_shift(&self, centered: Tensor<B, 4>, var: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, channels, _, _] = centered.dims();
        let std   = var.add_scalar(self.epsilon).sqrt();
        let gamma = self.gamma.val().reshape([1, channels, 1, 1]);
        let beta  = self.beta.val().reshape([1, channels, 1, 1]);
        centered.div(std).mul(gamma).add(beta)
    }
}

// ─── Activation ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    Relu,
    Leaky { alpha: f64 },
}

impl Activation {
    /// Negative slopes select plain ReLU.
    pub fn from_slope(alpha: f64) -> Self {
        if alpha < 0.0 { Activation::Relu } else { Activation::Leaky { alpha } }
    }

    pub fn forward<B: Backend, const D: usize>(self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Relu            => activation::relu(x),
            Activation::Leaky { alpha } => leaky_relu(x, alpha),
        }
    }
}

/// max(x, alpha * x)
pub fn leaky_relu<B: Backend, const D: usize>(x: Tensor<B, D>, alpha: f64) -> Tensor<B, D> {
    x.clone().max_pair(x.mul_scalar(alpha))
}

// ─── Pooling / Dropout ────────────────────────────────────────────────────────

/// Max pooling with TensorFlow SAME padding: output is
/// ceil(input / stride). The border is -inf so it never wins
/// against a real (possibly negative) activation.
/// Holds no parameters; models keep it as `Ignored<SameMaxPool2d>`.
#[derive(Clone, Debug)]
pub struct SameMaxPool2d {
    pub pool:   MaxPool2d,
    pub kernel: usize,
    pub stride: usize,
}

impl SameMaxPool2d {
    pub fn forward<B: Backend>(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, h, w] = x.dims();
        let x = constant_pad(
            x,
            same_padding(h, self.kernel, self.stride),
            same_padding(w, self.kernel, self.stride),
            f32::NEG_INFINITY,
        );
        self.pool.forward(x)
    }
}

/// 2×2 max pooling with stride 2, SAME padded. Odd sizes round up.
pub fn max_pool_2x2() -> SameMaxPool2d {
    SameMaxPool2d {
        pool:   MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        kernel: 2,
        stride: 2,
    }
}

/// Inverted dropout: survivors are scaled by 1 / keep_prob so the
/// expected activation matches inference, where this is the identity.
pub fn dropout<B: Backend, const D: usize>(x: Tensor<B, D>, mode: ExecutionMode) -> Tensor<B, D> {
    match mode {
        ExecutionMode::Training { keep_prob } if keep_prob < 1.0 => {
            let mask = Tensor::random(x.shape(), Distribution::Bernoulli(keep_prob), &x.device());
            x.mul(mask).div_scalar(keep_prob)
        }
        _ => x,
    }
}
