// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Step-driven loop, 1..=num_iter:
//
//   every step       draw a training batch
//   every 10 steps   evaluate on the validation region and on the
//                    current batch (inference mode), log, capture
//                    a frame
//   every N steps    checkpoint (keep-last-K)
//   every step       one RMSProp update (training mode)
//
// Key Burn insight:
//   - Updates run on the autodiff backend
//   - model.valid() returns the model on the inner backend, so
//     evaluation builds no gradient graph
//   - The eval batcher must therefore use the inner backend too

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer, RmsPropConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::path::{Path, PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::{to_array, GlyphBatcher};
use crate::domain::{mode::ExecutionMode, traits::GlyphSource};
use crate::infra::{
    checkpoint::{load_checkpoint, CheckpointManager},
    frames::FrameRecorder,
    metrics::{LossMetrics, MetricsLogger},
};
use crate::ml::{
    loss::combined_loss,
    model::{GlyphModel, GlyphNet},
};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Evaluation cadence in steps
pub const EVAL_EVERY: usize = 10;

// TensorFlow's RMSProp defaults
const RMS_DECAY:   f32 = 0.9;
const RMS_EPSILON: f32 = 1e-10;

/// Losses recorded at one evaluation step
#[derive(Debug, Clone, Copy)]
pub struct LossRecord {
    pub step:       usize,
    pub validation: LossMetrics,
    pub train:      LossMetrics,
}

#[derive(Debug, Default)]
pub struct TrainReport {
    pub losses:      Vec<LossRecord>,
    /// Steps of the checkpoints still on disk, oldest first
    pub checkpoints: Vec<usize>,
    pub gif:         Option<PathBuf>,
}

/// Train a GlyphNet on the default GPU device.
pub fn run_training<S: GlyphSource>(cfg: &TrainConfig, source: &mut S) -> Result<TrainReport> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);

    let net_cfg = cfg.network();
    let mut model: GlyphNet<TrainBackend> = net_cfg.init(&device);
    tracing::info!(
        "Model ready: {} size, block groups {:?}",
        net_cfg.size,
        model.group_depths()
    );

    let mut resume_from = None;
    if let Some(ckpt) = &cfg.ckpt {
        let (restored, state) = load_checkpoint(ckpt, model, &device)?;
        model       = restored;
        resume_from = Some(state.step);
        tracing::info!("Resuming training at step {}", state.step);
    }

    let mut ckpt_manager = CheckpointManager::open(&cfg.ckpt_dir, cfg.num_checkpoints)?;
    let (_, report) = train_loop::<TrainBackend, _, _>(cfg, model, resume_from, source, &mut ckpt_manager, &device)?;
    Ok(report)
}

/// The training loop proper, generic over backend, model and dataset.
///
/// `resume_from` is the step stored in the checkpoint the model was
/// restored from. That step's evaluation and checkpoint already
/// happened, so only its optimizer update is replayed.
pub fn train_loop<B, M, S>(
    cfg:          &TrainConfig,
    mut model:    M,
    resume_from:  Option<usize>,
    source:       &mut S,
    ckpt_manager: &mut CheckpointManager,
    device:       &B::Device,
) -> Result<(M, TrainReport)>
where
    B: AutodiffBackend,
    M: GlyphModel<B> + AutodiffModule<B>,
    M::InnerModule: GlyphModel<B::InnerBackend>,
    S: GlyphSource,
{
    // ── RMSProp optimiser ────────────────────────────────────────────────────
    // v = ρ*v + (1-ρ)*g²
    // θ = θ - lr * g / (√v + ε)
    let mut optim = RmsPropConfig::new()
        .with_alpha(RMS_DECAY)
        .with_momentum(0.0)
        .with_epsilon(RMS_EPSILON)
        .init();

    let train_batcher = GlyphBatcher::<B>::new(device.clone());
    let eval_batcher  = GlyphBatcher::<B::InnerBackend>::new(device.clone());

    let summary    = Path::new(&cfg.summary_dir);
    let train_log  = MetricsLogger::new(summary.join("train"))?;
    let val_log    = MetricsLogger::new(summary.join("validation"))?;
    let mut frames = cfg.capture_frame.then(|| FrameRecorder::new(&cfg.frame_dir));

    tracing::info!(
        "Training on {} pairs, validating on {}, batch size {}",
        source.train_len(),
        source.validation().len(),
        cfg.batch_size,
    );
    if cfg.alpha >= 0.0 {
        tracing::info!("leaky relu is used. alpha {:.2}", cfg.alpha);
    }

    let mut report   = TrainReport::default();
    let mut best_val = f64::INFINITY;
    let train_mode   = ExecutionMode::Training { keep_prob: cfg.keep_prob };

    for step in resume_from.unwrap_or(1)..=cfg.num_iter {
        let pairs   = source.next_train_batch(cfg.batch_size)?;
        let resumed = resume_from == Some(step);

        // ── Evaluation ───────────────────────────────────────────────────────
        if step % EVAL_EVERY == 0 && !resumed {
            let model_valid = model.valid();

            let val_batch = eval_batcher.batch(source.validation());
            let val_pred  = model_valid.forward(val_batch.sources, ExecutionMode::Inference);
            let val_loss  = combined_loss(val_pred.clone(), val_batch.targets, cfg.tv_weight)
                .to_metrics(step);

            let train_batch = eval_batcher.batch(&pairs);
            let train_pred  = model_valid.forward(train_batch.sources, ExecutionMode::Inference);
            let train_loss  = combined_loss(train_pred, train_batch.targets, cfg.tv_weight)
                .to_metrics(step);

            if let Some(frames) = frames.as_mut() {
                frames.capture(step, to_array(val_pred)?.view())?;
            }

            val_log.log(&val_loss)?;
            train_log.log(&train_loss)?;
            println!(
                "step {}, validation loss {:.6}, training loss {:.6}",
                step, val_loss.combined_loss, train_loss.combined_loss,
            );
            if val_loss.is_improvement(best_val) {
                best_val = val_loss.combined_loss;
                tracing::debug!("New best validation loss {:.6} at step {}", best_val, step);
            }

            report.losses.push(LossRecord { step, validation: val_loss, train: train_loss });
        }

        // ── Checkpoint ───────────────────────────────────────────────────────
        if step % cfg.checkpoint_steps == 0 && !resumed {
            ckpt_manager.save(&model, step)?;
        }

        // ── Optimizer step ───────────────────────────────────────────────────
        let batch  = train_batcher.batch(&pairs);
        let pred   = model.forward(batch.sources, train_mode);
        let loss   = combined_loss(pred, batch.targets, cfg.tv_weight).combined;
        let grads  = loss.backward();
        let grads  = GradientsParams::from_grads(grads, &model);
        model = optim.step(cfg.lr, model, grads);
    }

    if let Some(frames) = frames.as_ref() {
        tracing::info!("compile frames in {} to gif", cfg.frame_dir);
        report.gif = frames.compile_gif()?;
        if let Some(gif) = &report.gif {
            tracing::info!("gif saved at {}", gif.display());
        }
    }

    report.checkpoints = ckpt_manager.retained_steps();
    tracing::info!("Training complete!");
    Ok((model, report))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::frames::GIF_NAME;
    use crate::ml::testing::{synthetic_dataset, PoolNet};
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn config(root: &Path, num_iter: usize, capture_frame: bool) -> TrainConfig {
        TrainConfig {
            source_font:      Some("unused-source.npy".into()),
            target_font:      Some("unused-target.npy".into()),
            num_iter,
            capture_frame,
            ckpt_dir:         root.join("ckpt").display().to_string(),
            frame_dir:        root.join("frames").display().to_string(),
            summary_dir:      root.join("summary").display().to_string(),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_full_schedule_checkpoints_and_losses() {
        let root = tempfile::tempdir().unwrap();
        let cfg  = config(root.path(), 1000, false);
        std::fs::create_dir_all(&cfg.frame_dir).unwrap();

        // 2000 pairs, 1950 train / 50 validation
        let mut data   = synthetic_dataset(2000, 1950, 8);
        let device     = Default::default();
        let model      = PoolNet::<TestBackend>::new(&device);
        let mut ckpt   = CheckpointManager::open(&cfg.ckpt_dir, cfg.num_checkpoints).unwrap();

        let (_, report) = train_loop::<TestBackend, _, _>(&cfg, model, None, &mut data, &mut ckpt, &device).unwrap();

        assert_eq!(report.checkpoints, vec![800, 850, 900, 950, 1000]);
        let dirs = std::fs::read_dir(&cfg.ckpt_dir)
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().is_dir())
            .count();
        assert_eq!(dirs, 5);

        let steps: Vec<usize> = report.losses.iter().map(|r| r.step).collect();
        assert_eq!(steps, (1..=100).map(|i| i * 10).collect::<Vec<_>>());
        assert!(report.losses.iter().all(|r| r.validation.combined_loss.is_finite()));
        assert!(report.gif.is_none());

        let csv = std::fs::read_to_string(root.path().join("summary/validation/metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 101);
    }

    #[test]
    fn test_frames_are_captured_and_compiled() {
        let root = tempfile::tempdir().unwrap();
        let cfg  = config(root.path(), 30, true);
        std::fs::create_dir_all(&cfg.frame_dir).unwrap();

        let mut data = synthetic_dataset(40, 30, 8);
        let device   = Default::default();
        let model    = PoolNet::<TestBackend>::new(&device);
        let mut ckpt = CheckpointManager::open(&cfg.ckpt_dir, cfg.num_checkpoints).unwrap();

        let (_, report) = train_loop::<TestBackend, _, _>(&cfg, model, None, &mut data, &mut ckpt, &device).unwrap();

        let frame_dir = Path::new(&cfg.frame_dir);
        for step in [10, 20, 30] {
            assert!(frame_dir.join(format!("step_{step:04}.png")).exists());
        }
        assert_eq!(report.gif, Some(frame_dir.join(GIF_NAME)));
        assert!(report.checkpoints.is_empty());
    }

    #[test]
    fn test_resume_skips_the_restored_step() {
        let root = tempfile::tempdir().unwrap();
        let mut cfg = config(root.path(), 100, false);
        cfg.checkpoint_steps = 20;

        let mut data = synthetic_dataset(60, 50, 8);
        let device   = Default::default();
        let mut ckpt = CheckpointManager::open(&cfg.ckpt_dir, cfg.num_checkpoints).unwrap();

        // first run stops at 40
        cfg.num_iter = 40;
        let model = PoolNet::<TestBackend>::new(&device);
        let (_, first) = train_loop::<TestBackend, _, _>(&cfg, model, None, &mut data, &mut ckpt, &device).unwrap();
        assert_eq!(first.checkpoints, vec![20, 40]);

        // second run picks up from the step-40 checkpoint
        cfg.num_iter = 100;
        let fresh = PoolNet::<TestBackend>::new(&device);
        let (restored, state) = load_checkpoint(Path::new(&cfg.ckpt_dir), fresh, &device).unwrap();
        assert_eq!(state.step, 40);

        let (_, second) =
            train_loop::<TestBackend, _, _>(&cfg, restored, Some(state.step), &mut data, &mut ckpt, &device).unwrap();
        let steps: Vec<usize> = second.losses.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![50, 60, 70, 80, 90, 100]);
        assert_eq!(second.checkpoints, vec![20, 40, 60, 80, 100]);
    }
}
