// ============================================================
// Layer 5 — Losses
// ============================================================
// combined = mean |target - predicted|            (reconstruction)
//          + tv_weight * total_variation(predicted) (smoothness)
//
// Absolute error keeps glyph edges sharp where squared error
// blurs them. The total-variation term penalises neighbouring
// pixels that disagree, which suppresses speckle noise.

use burn::prelude::*;

use crate::infra::metrics::LossMetrics;

/// Per-term losses of one forward pass, still on the device.
pub struct LossBreakdown<B: Backend> {
    pub pixel:    Tensor<B, 1>,
    /// Already multiplied by the regularisation weight
    pub tv:       Tensor<B, 1>,
    pub combined: Tensor<B, 1>,
}

impl<B: Backend> LossBreakdown<B> {
    /// Pull the scalars back to the host.
    pub fn to_metrics(self, step: usize) -> LossMetrics {
        LossMetrics {
            step,
            pixel_abs_loss: self.pixel.into_scalar().elem::<f64>(),
            tv_loss:        self.tv.into_scalar().elem::<f64>(),
            combined_loss:  self.combined.into_scalar().elem::<f64>(),
        }
    }
}

pub fn pixel_abs_loss<B: Backend>(predicted: Tensor<B, 3>, target: Tensor<B, 3>) -> Tensor<B, 1> {
    (target - predicted).abs().mean()
}

/// Σ(vertical diffs²)/2 / height + Σ(horizontal diffs²)/2 / width,
/// summed over the whole batch.
pub fn total_variation_loss<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 1> {
    let [n, h, w] = x.dims();
    let device = x.device();
    if h < 2 || w < 2 {
        return Tensor::zeros([1], &device);
    }

    let down  = x.clone().slice([0..n, 1..h, 0..w]) - x.clone().slice([0..n, 0..h - 1, 0..w]);
    let right = x.clone().slice([0..n, 0..h, 1..w]) - x.slice([0..n, 0..h, 0..w - 1]);

    half_squared_sum(down).div_scalar(h as f64) + half_squared_sum(right).div_scalar(w as f64)
}

fn half_squared_sum<B: Backend>(t: Tensor<B, 3>) -> Tensor<B, 1> {
    t.powf_scalar(2.0).sum().div_scalar(2.0)
}

pub fn combined_loss<B: Backend>(
    predicted: Tensor<B, 3>,
    target:    Tensor<B, 3>,
    tv_weight: f64,
) -> LossBreakdown<B> {
    let pixel    = pixel_abs_loss(predicted.clone(), target);
    let tv       = total_variation_loss(predicted).mul_scalar(tv_weight);
    let combined = pixel.clone() + tv.clone();
    LossBreakdown { pixel, tv, combined }
}
