// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the training and inference
// workflows:
//
//   checkpoint.rs — Saving and loading model parameters with
//                   Burn's full-precision recorder, plus keep-last-N
//                   retention of checkpoint snapshots.
//
//   metrics.rs    — Per-split loss CSVs written at every
//                   evaluation step.
//
//   render.rs     — Grid PNG rendering of glyph bitmaps.
//
//   frames.rs     — Training frame capture and GIF compilation.
//
// Reference: Burn Book §5 (Checkpointing)
//            Rust Book §9 (Error Handling with anyhow)

/// Model checkpoint saving, loading, and retention
pub mod checkpoint;

/// Loss CSV logger
pub mod metrics;

/// Bitmap grid rendering
pub mod render;

/// Visualization frames and GIF compilation
pub mod frames;
