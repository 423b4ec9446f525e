// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe what the system works with:
// glyph bitmaps, the model size class, the execution mode of
// a forward pass, and the dataset abstraction.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// Glyph bitmap batches and pixel conversions
pub mod bitmap;

// Training vs. inference behaviour of a forward pass
pub mod mode;

// small / medium / big network depth
pub mod model_size;

// Core abstractions (traits) that other layers implement
pub mod traits;
