// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration      (this layer)
//   Step 2: Prepare output directories      (this layer)
//   Step 3: Load and split the font pairs   (Layer 4 - data)
//   Step 4: Run the training loop           (Layer 5 - ml)
//
// Nothing touches the filesystem or a device until Step 1
// has passed.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::data::dataset::FontDataManager;
use crate::domain::model_size::ModelSize;
use crate::ml::{
    model::GlyphNetConfig,
    trainer::{run_training, TrainReport},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub source_font:      Option<String>,
    pub target_font:      Option<String>,
    pub model:            ModelSize,
    pub num_examples:     usize,
    pub num_validations:  usize,
    pub lr:               f64,
    pub keep_prob:        f64,
    pub num_iter:         usize,
    pub tv_weight:        f64,
    pub alpha:            f64,
    pub checkpoint_steps: usize,
    pub num_checkpoints:  usize,
    pub batch_size:       usize,
    pub ckpt_dir:         String,
    /// Checkpoint to resume from
    pub ckpt:             Option<String>,
    pub capture_frame:    bool,
    pub frame_dir:        String,
    pub summary_dir:      String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            source_font:      None,
            target_font:      None,
            model:            ModelSize::Medium,
            num_examples:     2000,
            num_validations:  50,
            lr:               0.01,
            keep_prob:        0.9,
            num_iter:         1000,
            tv_weight:        0.0002,
            alpha:            -1.0,
            checkpoint_steps: 50,
            num_checkpoints:  5,
            batch_size:       16,
            ckpt_dir:         "/tmp/checkpoints".to_string(),
            ckpt:             None,
            capture_frame:    true,
            frame_dir:        "/tmp/frames".to_string(),
            summary_dir:      "/tmp/summary".to_string(),
        }
    }
}

impl TrainConfig {
    /// Reject configurations the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.source_font.is_none() || self.target_font.is_none() {
            bail!("source_font or target_font not specified");
        }
        if self.num_validations == 0 || self.num_validations >= self.num_examples {
            bail!(
                "num_validations must be in 1..{} (got {})",
                self.num_examples, self.num_validations
            );
        }
        if !(self.keep_prob > 0.0 && self.keep_prob <= 1.0) {
            bail!("keep_prob must be in (0, 1] (got {})", self.keep_prob);
        }
        if self.lr <= 0.0 {
            bail!("lr must be positive (got {})", self.lr);
        }
        if self.tv_weight < 0.0 {
            bail!("tv weight must not be negative (got {})", self.tv_weight);
        }
        if self.batch_size == 0 || self.checkpoint_steps == 0 || self.num_checkpoints == 0 {
            bail!("batch_size, ckpt_steps and num_ckpt must all be at least 1");
        }
        Ok(())
    }

    /// Index where the training region ends and validation begins
    pub fn split(&self) -> usize {
        self.num_examples - self.num_validations
    }

    pub fn network(&self) -> GlyphNetConfig {
        GlyphNetConfig::new().with_size(self.model).with_alpha(self.alpha)
    }

    /// Start every run from clean frame and summary directories.
    pub fn prepare_directories(&self) -> Result<()> {
        if self.capture_frame {
            remove_dir_if_exists(&self.frame_dir)?;
            fs::create_dir_all(&self.frame_dir)
                .with_context(|| format!("Cannot create frame dir '{}'", self.frame_dir))?;
        }
        remove_dir_if_exists(&self.summary_dir)?;
        fs::create_dir_all(&self.ckpt_dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", self.ckpt_dir))?;
        Ok(())
    }
}

fn remove_dir_if_exists(dir: &str) -> Result<()> {
    if Path::new(dir).exists() {
        fs::remove_dir_all(dir).with_context(|| format!("Cannot remove '{dir}'"))?;
    }
    Ok(())
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;

        // ── Step 1: Validate ─────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Pre-flight ───────────────────────────────────────────────
        cfg.prepare_directories()?;

        // ── Step 3: Load font pairs ──────────────────────────────────────────
        // validate() guarantees both fonts are present
        let (Some(source), Some(target)) = (&cfg.source_font, &cfg.target_font) else {
            bail!("source_font or target_font not specified");
        };
        tracing::info!("Loading font pairs: '{}' → '{}'", source, target);
        let mut data = FontDataManager::new(source, target, cfg.num_examples, cfg.split())?;

        // ── Step 4: Train ────────────────────────────────────────────────────
        run_training(cfg, &mut data)
    }
}
