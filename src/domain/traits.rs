// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training loop only needs two things from a dataset:
// fresh training batches and the fixed validation region.
// Anything that can provide those (the .npy backed
// FontDataManager, an in-memory synthetic set in tests)
// implements GlyphSource and plugs straight into the trainer.

use anyhow::Result;

use crate::domain::bitmap::BitmapBatch;

// ─── GlyphSource ──────────────────────────────────────────────────────────────
/// A split dataset of aligned source/target glyph bitmaps.
///
/// Implementations:
///   - FontDataManager → two .npy bitmap files on disk
pub trait GlyphSource {
    /// Draw `n` pairs from the training region.
    fn next_train_batch(&mut self, n: usize) -> Result<BitmapBatch>;

    /// The whole validation region. Never used for gradients.
    fn validation(&self) -> &BitmapBatch;

    /// Number of pairs in the training region
    fn train_len(&self) -> usize;
}
