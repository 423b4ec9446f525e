// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network code lives here: layers, the model, the losses,
// the training loop and the inference engine.
//
//   layers.rs     — SAME-padded convolution, batch norm with
//                   explicit train/inference paths, activations,
//                   pooling and dropout
//
//   model.rs      — GlyphNet: four groups of conv blocks with
//                   shrinking kernels, a two-block head, 2×2
//                   max pool and a sigmoid output
//
//   loss.rs       — mean absolute pixel error plus weighted
//                   total variation
//
//   trainer.rs    — RMSProp loop with periodic evaluation,
//                   frame capture and keep-last-K checkpoints
//
//   inferencer.rs — restores a checkpoint and maps source
//                   bitmaps to 8-bit target bitmaps in batches
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Building blocks shared by every model
pub mod layers;

/// The glyph-to-glyph network
pub mod model;

/// Reconstruction and smoothness losses
pub mod loss;

/// Full training loop with evaluation and checkpointing
pub mod trainer;

/// Inference engine: loads a checkpoint and predicts bitmaps
pub mod inferencer;

#[cfg(test)]
pub(crate) mod testing;
