// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the .npy bitmap files on disk and the
// tensor batches the network consumes.
//
// The pipeline flows in this order:
//
//   source.npy / target.npy
//       │
//       ▼
//   loader            → reads uint8 bitmaps, normalises to [0, 1]
//       │
//       ▼
//   FontDataManager   → aligns pairs, fixed train/validation split
//       │
//       ▼
//   EpochSampler      → shuffled training indices per epoch
//       │
//       ▼
//   GlyphBatcher      → ndarray bitmaps → Burn tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads and writes .npy glyph bitmap files
pub mod loader;

/// Paired font dataset with a fixed validation region
pub mod dataset;

/// Converts bitmap batches to tensors
pub mod batcher;

/// Fixed-point split and epoch-shuffled sampling
pub mod splitter;
