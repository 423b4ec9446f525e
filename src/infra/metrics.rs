// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records evaluation losses to a CSV file every time the
// training loop evaluates (every 10 steps). One logger per
// split, so a run produces:
//
//   <summary_dir>/train/metrics.csv
//   <summary_dir>/validation/metrics.csv
//
// Example CSV output:
//   step,pixel_abs_loss,tv_loss,combined_loss
//   10,0.412345,0.000812,0.413157
//   20,0.398765,0.000794,0.399559
//
// Reading the curves:
//   - combined_loss should fall steadily on both splits
//   - validation rising while train falls → overfitting
//   - tv_loss climbing → output getting noisier

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

/// Loss values of one evaluation pass, already on the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossMetrics {
    pub step: usize,

    /// Mean absolute pixel difference
    pub pixel_abs_loss: f64,

    /// Weighted total-variation penalty
    pub tv_loss: f64,

    /// pixel_abs_loss + tv_loss
    pub combined_loss: f64,
}

impl LossMetrics {
    pub fn is_improvement(&self, best_combined: f64) -> bool {
        self.combined_loss < best_combined
    }
}

/// Appends loss rows to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the directory and write the header for a fresh file.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create summary dir '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "step,pixel_abs_loss,tv_loss,combined_loss")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &LossMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6}",
            m.step,
            m.pixel_abs_loss,
            m.tv_loss,
            m.combined_loss,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
