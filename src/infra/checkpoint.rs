// ============================================================
// Layer 6 — Snapshot Store
// ============================================================
// Saves and restores trained models, one folder per run:
//
//   models/
//     BS32-GN-S1/
//       model.mpk.gz   ← all learned parameters (and BN running stats)
//       config.json    ← ResNetConfig used to build the model
//       stats.json     ← per-channel input mean/std of the training set
//     BS32-BN-S1/
//       ...
//
// The config is saved beside the weights because the record
// alone cannot rebuild the network: loading needs a model of
// the right architecture to pour the weights into.
//
// Weights are stored at full precision so a reproduction
// evaluates exactly the parameters the sweep measured.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::data::preprocessor::ChannelStats;
use crate::domain::run_key::RunKey;
use crate::ml::model::{ResNet, ResNetConfig};

type SnapshotRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const WEIGHTS_FILE: &str = "model";
const CONFIG_FILE:  &str = "config.json";
const STATS_FILE:   &str = "stats.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn run_dir(&self, key: &RunKey) -> PathBuf {
        self.dir.join(key.to_string())
    }

    /// Save a trained model and its config under `models/<key>/`.
    /// An existing snapshot for the same key is overwritten.
    pub fn save_model<B: Backend>(
        &self,
        key:    &RunKey,
        model:  &ResNet<B>,
        config: &ResNetConfig,
    ) -> Result<PathBuf> {
        let dir = self.run_dir(key);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create snapshot directory '{}'", dir.display()))?;

        let config_path = dir.join(CONFIG_FILE);
        fs::write(&config_path, serde_json::to_string_pretty(config)?)
            .with_context(|| format!("Cannot write '{}'", config_path.display()))?;

        let weights_path = dir.join(WEIGHTS_FILE);
        SnapshotRecorder::new()
            .record(model.clone().into_record(), weights_path.clone())
            .with_context(|| format!("Failed to save snapshot to '{}'", weights_path.display()))?;

        tracing::debug!("Saved snapshot '{}'", dir.display());
        Ok(dir)
    }

    /// Rebuild the model saved for `key` on `device`.
    pub fn load_model<B: Backend>(
        &self,
        key:    &RunKey,
        device: &B::Device,
    ) -> Result<(ResNetConfig, ResNet<B>)> {
        let dir    = self.run_dir(key);
        let config = self.load_config(&dir)?;
        let model: ResNet<B> = config.init(device)?;

        let weights_path = dir.join(WEIGHTS_FILE);
        let record = SnapshotRecorder::new()
            .load(weights_path.clone(), device)
            .with_context(|| format!("Cannot load snapshot '{}'", weights_path.display()))?;

        Ok((config, model.load_record(record)))
    }

    /// Save the input statistics the model was trained with.
    pub fn save_stats(&self, key: &RunKey, stats: &ChannelStats) -> Result<()> {
        let dir = self.run_dir(key);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create snapshot directory '{}'", dir.display()))?;
        let path = dir.join(STATS_FILE);
        fs::write(&path, serde_json::to_string_pretty(stats)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }

    pub fn load_stats(&self, key: &RunKey) -> Result<ChannelStats> {
        let path = self.run_dir(key).join(STATS_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read input statistics '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid input statistics '{}'", path.display()))
    }

    fn load_config(&self, dir: &Path) -> Result<ResNetConfig> {
        let path = dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read model config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid model config '{}'", path.display()))
    }

    /// Every snapshot folder whose name parses as a RunKey, sorted.
    /// Foreign folders are skipped with a warning.
    pub fn list_runs(&self) -> Result<Vec<RunKey>> {
        let entries = fs::read_dir(&self.dir).with_context(|| {
            format!(
                "Cannot read snapshot directory '{}'. Have you run 'train' first?",
                self.dir.display()
            )
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            match name.parse::<RunKey>() {
                Ok(key) => keys.push(key),
                Err(e)  => tracing::warn!("Skipping '{}': {}", name, e),
            }
        }

        keys.sort_by_key(|k| (k.seed, std::cmp::Reverse(k.batch_size), k.norm));
        Ok(keys)
    }
}
