// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `infer`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for unknown subcommands
//   - type conversion (string → usize, f64, ModelSize)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{ArgAction, Args, Subcommand};

use crate::application::{infer_use_case::InferConfig, train_use_case::TrainConfig};
use crate::domain::model_size::ModelSize;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a model that rewrites a source font in a target font's style
    Train(TrainArgs),

    /// Render every glyph of a source font with a trained checkpoint
    Infer(InferArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Model size class: small, medium or big
    #[arg(long, default_value = "medium")]
    pub model: ModelSize,

    /// Source font bitmaps (.npy, [N, 160, 160] uint8)
    #[arg(long)]
    pub source_font: Option<String>,

    /// Target font bitmaps (.npy, [N, 80, 80] uint8)
    #[arg(long)]
    pub target_font: Option<String>,

    /// Number of glyph pairs used in total
    #[arg(long, default_value_t = 2000)]
    pub num_examples: usize,

    /// How many of those pairs are held out for validation
    #[arg(long, default_value_t = 50)]
    pub num_validations: usize,

    #[arg(long, default_value_t = 0.01)]
    pub lr: f64,

    /// Probability of keeping an activation in dropout
    #[arg(long, default_value_t = 0.9)]
    pub keep_prob: f64,

    /// Number of optimizer steps
    #[arg(long = "iter", default_value_t = 1000)]
    pub num_iter: usize,

    /// Weight of the total variation loss
    #[arg(long = "tv", default_value_t = 0.0002)]
    pub tv_weight: f64,

    /// Leaky ReLU slope; negative means plain ReLU
    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    pub alpha: f64,

    /// Save a checkpoint every N steps
    #[arg(long = "ckpt-steps", default_value_t = 50)]
    pub checkpoint_steps: usize,

    /// Number of checkpoints to keep
    #[arg(long = "num-ckpt", default_value_t = 5)]
    pub num_checkpoints: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Directory to save checkpoints
    #[arg(long, default_value = "/tmp/checkpoints")]
    pub ckpt_dir: String,

    /// Checkpoint to resume training from
    #[arg(long)]
    pub ckpt: Option<String>,

    /// Render validation predictions every 10 steps and compile a GIF
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub capture_frame: bool,

    #[arg(long, default_value = "/tmp/frames")]
    pub frame_dir: String,

    /// Directory for the per-split loss CSVs
    #[arg(long, default_value = "/tmp/summary")]
    pub summary_dir: String,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            source_font:      a.source_font,
            target_font:      a.target_font,
            model:            a.model,
            num_examples:     a.num_examples,
            num_validations:  a.num_validations,
            lr:               a.lr,
            keep_prob:        a.keep_prob,
            num_iter:         a.num_iter,
            tv_weight:        a.tv_weight,
            alpha:            a.alpha,
            checkpoint_steps: a.checkpoint_steps,
            num_checkpoints:  a.num_checkpoints,
            batch_size:       a.batch_size,
            ckpt_dir:         a.ckpt_dir,
            ckpt:             a.ckpt,
            capture_frame:    a.capture_frame,
            frame_dir:        a.frame_dir,
            summary_dir:      a.summary_dir,
        }
    }
}

/// All arguments for the `infer` command
#[derive(Args, Debug)]
pub struct InferArgs {
    /// Must match the size class the checkpoint was trained with
    #[arg(long, default_value = "medium")]
    pub model: ModelSize,

    /// Must match the slope the checkpoint was trained with
    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    pub alpha: f64,

    /// Source font bitmaps to rewrite
    #[arg(long)]
    pub source_font: Option<String>,

    /// Checkpoint directory, or a checkpoint root with an index
    #[arg(long)]
    pub ckpt: Option<String>,

    /// Where target.bitmap.npy and the preview grids are written
    #[arg(long, default_value = "/tmp/bitmap")]
    pub bitmap_dir: String,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,
}

impl From<InferArgs> for InferConfig {
    fn from(a: InferArgs) -> Self {
        InferConfig {
            model:       a.model,
            alpha:       a.alpha,
            source_font: a.source_font,
            ckpt:        a.ckpt,
            bitmap_dir:  a.bitmap_dir,
            batch_size:  a.batch_size,
        }
    }
}
