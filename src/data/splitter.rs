// ============================================================
// Layer 4 — Train/Validation Splitter and Sampler
// ============================================================
// The split point is fixed when the dataset is built:
//   - Training region:   pairs [0, split)
//   - Validation region: pairs [split, total)
// It never moves during a run, so validation glyphs are never
// seen by the optimizer.
//
// Training batches are drawn epoch by epoch: the training
// indices are shuffled (Fisher-Yates via SliceRandom), handed
// out in order, and reshuffled once exhausted.

use anyhow::{bail, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::bitmap::BitmapBatch;

/// Split `pairs` at `split` into (train, validation).
pub fn split_train_val(pairs: &BitmapBatch, split: usize) -> Result<(BitmapBatch, BitmapBatch)> {
    let total = pairs.len();
    if split == 0 || split > total {
        bail!("Split point {split} out of range for {total} pairs");
    }

    let train_idx: Vec<usize> = (0..split).collect();
    let val_idx:   Vec<usize> = (split..total).collect();

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        train_idx.len(),
        val_idx.len(),
    );

    Ok((pairs.select(&train_idx), pairs.select(&val_idx)))
}

/// Hands out shuffled training indices, one epoch at a time.
pub struct EpochSampler {
    order:  Vec<usize>,
    cursor: usize,
    epoch:  usize,
    rng:    StdRng,
}

impl EpochSampler {
    pub fn new(len: usize) -> Self {
        Self::with_rng(len, StdRng::from_entropy())
    }

    /// Deterministic sampler for reproducible runs
    pub fn seeded(len: usize, seed: u64) -> Self {
        Self::with_rng(len, StdRng::seed_from_u64(seed))
    }

    fn with_rng(len: usize, rng: StdRng) -> Self {
        let mut sampler = Self { order: (0..len).collect(), cursor: 0, epoch: 0, rng };
        sampler.order.shuffle(&mut sampler.rng);
        sampler
    }

    /// Next `n` indices. Wraps into a freshly shuffled epoch when the
    /// current one runs out, so a batch may straddle two epochs.
    pub fn next_indices(&mut self, n: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(n);
        if self.order.is_empty() {
            return out;
        }
        while out.len() < n {
            if self.cursor == self.order.len() {
                self.order.shuffle(&mut self.rng);
                self.cursor  = 0;
                self.epoch  += 1;
                tracing::debug!("Starting training epoch {}", self.epoch);
            }
            let take = (n - out.len()).min(self.order.len() - self.cursor);
            out.extend_from_slice(&self.order[self.cursor..self.cursor + take]);
            self.cursor += take;
        }
        out
    }

    /// Completed passes over the training region
    pub fn epoch(&self) -> usize {
        self.epoch
    }
}
