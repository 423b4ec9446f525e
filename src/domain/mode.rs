// ============================================================
// Layer 3 — Execution Mode
// ============================================================
// Every forward pass is told explicitly whether it is part of
// an optimizer step or an evaluation. Batch normalization and
// dropout are the only layers that behave differently.

/// How a forward pass should treat batch norm and dropout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExecutionMode {
    /// Batch statistics, moving averages updated, dropout active.
    Training {
        /// Probability that a unit survives dropout
        keep_prob: f64,
    },

    /// Moving-average statistics only, dropout disabled.
    Inference,
}
