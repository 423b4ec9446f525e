// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model parameters using Burn's
// full-precision MessagePack recorder, and keeps only the most recent N
// checkpoints on disk.
//
// What gets saved per checkpoint:
//   model.ckpt-<step>/
//     params.<ext>   ← all learned parameters and BN running stats
//     state.json     ← the training step the snapshot was taken at
//
// Alongside the snapshots:
//   checkpoint.json  ← retained checkpoints, oldest first
//
// A snapshot is written into `model.ckpt-<step>.tmp/` and
// renamed into place once complete, so a reader never sees a
// half-written checkpoint directory.
//
// Retention is an explicit bounded log (CheckpointLog). Every
// save appends a handle; once the log exceeds its capacity the
// oldest handle is evicted and its directory deleted.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

/// Index of retained checkpoints inside the checkpoint directory
pub const INDEX_FILE: &str = "checkpoint.json";

const PREFIX:      &str = "model.ckpt";
const STATE_FILE:  &str = "state.json";
// Recorder appends its own extension
const PARAMS_FILE: &str = "params";

/// f32 parameters stored as-is, so a restored model is bit-identical
type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

// ─── CheckpointHandle ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointHandle {
    pub step: usize,
    /// Directory name relative to the checkpoint directory
    pub name: String,
}

impl CheckpointHandle {
    pub fn for_step(step: usize) -> Self {
        Self { step, name: format!("{PREFIX}-{step}") }
    }
}

// ─── CheckpointLog ────────────────────────────────────────────────────────────
/// Keep-last-N eviction policy over checkpoint handles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointLog {
    capacity: usize,
    entries:  VecDeque<CheckpointHandle>,
}

impl CheckpointLog {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), entries: VecDeque::new() }
    }

    /// Append `handle` and return every handle pushed out by it.
    /// Re-recording a step replaces the earlier entry for it.
    pub fn record(&mut self, handle: CheckpointHandle) -> Vec<CheckpointHandle> {
        self.entries.retain(|h| h.step != handle.step);
        self.entries.push_back(handle);
        self.enforce()
    }

    /// Change the capacity, returning handles that no longer fit.
    pub fn resize(&mut self, capacity: usize) -> Vec<CheckpointHandle> {
        self.capacity = capacity.max(1);
        self.enforce()
    }

    fn enforce(&mut self) -> Vec<CheckpointHandle> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.entries.pop_front() {
                evicted.push(oldest);
            }
        }
        evicted
    }

    pub fn latest(&self) -> Option<&CheckpointHandle> {
        self.entries.back()
    }

    pub fn steps(&self) -> Vec<usize> {
        self.entries.iter().map(|h| h.step).collect()
    }
}

/// Metadata stored next to the parameters of one checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub step: usize,
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
pub struct CheckpointManager {
    dir: PathBuf,
    log: CheckpointLog,
}

impl CheckpointManager {
    /// Open (or create) a checkpoint directory keeping at most `keep`
    /// checkpoints. An existing index is picked up so retention spans runs.
    pub fn open(dir: impl Into<PathBuf>, keep: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;

        let index = dir.join(INDEX_FILE);
        let mut log = if index.exists() {
            let json = fs::read_to_string(&index)
                .with_context(|| format!("Cannot read '{}'", index.display()))?;
            serde_json::from_str::<CheckpointLog>(&json)
                .with_context(|| format!("Malformed checkpoint index '{}'", index.display()))?
        } else {
            CheckpointLog::new(keep)
        };

        let evicted = log.resize(keep);
        let manager = Self { dir, log };
        manager.remove(&evicted)?;
        if !evicted.is_empty() {
            manager.write_index()?;
        }

        tracing::debug!(
            "Checkpoint dir '{}' holds {} checkpoints",
            manager.dir.display(),
            manager.log.steps().len()
        );
        Ok(manager)
    }

    /// Snapshot `model` as the checkpoint for `step`.
    pub fn save<B: Backend, M: Module<B>>(&mut self, model: &M, step: usize) -> Result<PathBuf> {
        let handle = CheckpointHandle::for_step(step);
        let target = self.dir.join(&handle.name);
        let staging = self.dir.join(format!("{}.tmp", handle.name));

        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)
            .with_context(|| format!("Cannot create '{}'", staging.display()))?;

        CheckpointRecorder::new()
            .record(model.clone().into_record(), staging.join(PARAMS_FILE))
            .with_context(|| format!("Failed to save checkpoint to '{}'", staging.display()))?;

        let state = serde_json::to_string_pretty(&CheckpointState { step })?;
        fs::write(staging.join(STATE_FILE), state)
            .with_context(|| format!("Failed to write state for step {step}"))?;

        if target.exists() {
            fs::remove_dir_all(&target)?;
        }
        fs::rename(&staging, &target)
            .with_context(|| format!("Cannot move checkpoint into '{}'", target.display()))?;

        let evicted = self.log.record(handle);
        self.remove(&evicted)?;
        self.write_index()?;

        tracing::info!("checkpoint at step {} -> '{}'", step, target.display());
        Ok(target)
    }

    /// Steps of the retained checkpoints, oldest first
    pub fn retained_steps(&self) -> Vec<usize> {
        self.log.steps()
    }

    fn remove(&self, evicted: &[CheckpointHandle]) -> Result<()> {
        for handle in evicted {
            let path = self.dir.join(&handle.name);
            if path.exists() {
                fs::remove_dir_all(&path)
                    .with_context(|| format!("Cannot evict checkpoint '{}'", path.display()))?;
            }
            tracing::debug!("Evicted checkpoint for step {}", handle.step);
        }
        Ok(())
    }

    fn write_index(&self) -> Result<()> {
        let path = self.dir.join(INDEX_FILE);
        fs::write(&path, serde_json::to_string_pretty(&self.log)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }
}

/// Accept either a checkpoint directory or a checkpoint root with an
/// index, in which case the newest retained checkpoint is used.
pub fn resolve_checkpoint(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.join(STATE_FILE).is_file() {
        return Ok(path.to_path_buf());
    }

    let index = path.join(INDEX_FILE);
    if index.is_file() {
        let json = fs::read_to_string(&index)
            .with_context(|| format!("Cannot read '{}'", index.display()))?;
        let log: CheckpointLog = serde_json::from_str(&json)?;
        if let Some(latest) = log.latest() {
            return Ok(path.join(&latest.name));
        }
    }

    bail!("No checkpoint found at '{}'", path.display())
}

/// Restore parameters saved by `CheckpointManager::save` into `model`.
pub fn load_checkpoint<B: Backend, M: Module<B>>(
    path:   impl AsRef<Path>,
    model:  M,
    device: &B::Device,
) -> Result<(M, CheckpointState)> {
    let path = resolve_checkpoint(path)?;

    let state_path = path.join(STATE_FILE);
    let json = fs::read_to_string(&state_path)
        .with_context(|| format!("Cannot read '{}'", state_path.display()))?;
    let state: CheckpointState = serde_json::from_str(&json)?;

    let record = CheckpointRecorder::new()
        .load(path.join(PARAMS_FILE), device)
        .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

    tracing::info!("Restored checkpoint '{}' (step {})", path.display(), state.step);
    Ok((model.load_record(record), state))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mode::ExecutionMode;
    use crate::ml::{model::GlyphModel, testing::PoolNet};
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, Tensor};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_log_evicts_oldest() {
        let mut log = CheckpointLog::new(2);
        assert!(log.record(CheckpointHandle::for_step(10)).is_empty());
        assert!(log.record(CheckpointHandle::for_step(20)).is_empty());

        let evicted = log.record(CheckpointHandle::for_step(30));
        assert_eq!(evicted, vec![CheckpointHandle::for_step(10)]);
        assert_eq!(log.steps(), vec![20, 30]);
        assert_eq!(log.latest().unwrap().name, "model.ckpt-30");
    }

    #[test]
    fn test_log_rerecord_replaces() {
        let mut log = CheckpointLog::new(3);
        log.record(CheckpointHandle::for_step(1));
        log.record(CheckpointHandle::for_step(2));
        log.record(CheckpointHandle::for_step(1));
        assert_eq!(log.steps(), vec![2, 1]);
    }

    #[test]
    fn test_retention_on_disk() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model  = PoolNet::<TestBackend>::new(&device);

        let mut manager = CheckpointManager::open(dir.path(), 3).unwrap();
        for step in 1..=8 {
            manager.save(&model, step * 5).unwrap();
        }

        assert_eq!(manager.retained_steps(), vec![30, 35, 40]);
        let mut on_disk: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(PREFIX))
            .collect();
        on_disk.sort();
        assert_eq!(on_disk, vec!["model.ckpt-30", "model.ckpt-35", "model.ckpt-40"]);
    }

    #[test]
    fn test_reopen_respects_smaller_retention() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model  = PoolNet::<TestBackend>::new(&device);

        let mut manager = CheckpointManager::open(dir.path(), 4).unwrap();
        for step in [50, 100, 150, 200] {
            manager.save(&model, step).unwrap();
        }

        let reopened = CheckpointManager::open(dir.path(), 2).unwrap();
        assert_eq!(reopened.retained_steps(), vec![150, 200]);
        assert!(!dir.path().join("model.ckpt-50").exists());
        assert!(dir.path().join("model.ckpt-200").exists());
    }

    #[test]
    fn test_round_trip_restores_outputs() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model  = PoolNet::<TestBackend>::new(&device);

        // move the batch-norm running stats away from their initial values
        let warmup = Tensor::<TestBackend, 3>::random([4, 8, 8], Distribution::Default, &device);
        let _ = model.forward(warmup, ExecutionMode::Training { keep_prob: 1.0 });

        let mut manager = CheckpointManager::open(dir.path(), 5).unwrap();
        let saved = manager.save(&model, 70).unwrap();

        let fresh = PoolNet::<TestBackend>::new(&device);
        let (restored, state) = load_checkpoint(&saved, fresh, &device).unwrap();
        assert_eq!(state.step, 70);

        let x = Tensor::<TestBackend, 3>::random([2, 8, 8], Distribution::Default, &device);
        let a = model.forward(x.clone(), ExecutionMode::Inference);
        let b = restored.forward(x, ExecutionMode::Inference);
        assert_eq!(
            a.into_data().to_vec::<f32>().unwrap(),
            b.into_data().to_vec::<f32>().unwrap(),
        );

        let weights = |m: &PoolNet<TestBackend>| {
            m.block.conv.conv.weight.val().into_data().to_vec::<f32>().unwrap()
        };
        let running = |m: &PoolNet<TestBackend>| {
            m.block.norm.running_mean.value().into_data().to_vec::<f32>().unwrap()
        };
        assert_eq!(weights(&model), weights(&restored));
        assert_eq!(running(&model), running(&restored));
    }

    #[test]
    fn test_resolve_from_root_uses_latest() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model  = PoolNet::<TestBackend>::new(&device);

        let mut manager = CheckpointManager::open(dir.path(), 2).unwrap();
        manager.save(&model, 10).unwrap();
        manager.save(&model, 20).unwrap();

        let resolved = resolve_checkpoint(dir.path()).unwrap();
        assert_eq!(resolved, dir.path().join("model.ckpt-20"));
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model  = PoolNet::<TestBackend>::new(&device);
        let result = load_checkpoint(dir.path().join("model.ckpt-5"), model, &device);
        assert!(result.is_err());
    }
}
