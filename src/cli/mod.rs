// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`: learns a source → target font mapping
//   2. `infer`: rewrites a whole source font with a checkpoint
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InferArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "glyph-rewrite",
    version = "0.1.0",
    about = "Train a CNN to rewrite glyphs of one font in the style of another, then apply it."
)]
pub struct Cli {
    /// The subcommand to run (train or infer)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => Self::run_train(args),
            Commands::Infer(args) => Self::run_infer(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training: {} model, {} steps", args.model, args.num_iter);

        let report = TrainUseCase::new(args.into()).execute()?;

        if let Some(last) = report.losses.last() {
            println!(
                "Final validation loss {:.6} at step {}",
                last.validation.combined_loss, last.step
            );
        }
        println!("Training complete. Checkpoints kept: {:?}", report.checkpoints);
        if let Some(gif) = report.gif {
            println!("Transition animation: {}", gif.display());
        }
        Ok(())
    }

    fn run_infer(args: InferArgs) -> Result<()> {
        use crate::application::infer_use_case::InferUseCase;

        let output = InferUseCase::new(args.into()).execute()?;

        println!("\nBitmaps: {}", output.bitmaps.display());
        println!("Preview grids: {}", output.grids.len());
        Ok(())
    }
}
