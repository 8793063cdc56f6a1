// ============================================================
// Layer 2 — SweepUseCase
// ============================================================
// Runs the main experiment: every (seed, batch size, norm)
// combination trained once from scratch and evaluated on the
// CIFAR-10 test split.
//
//   Step 1: Prepare output folders    (optionally wiping logs)
//   Step 2: Load CIFAR-10             (Layer 4 - data)
//   Step 3: Adapt input statistics    (Layer 4 - data)
//   Step 4: Resume the result tables  (Layer 6 - infra)
//   Step 5: For each combination not yet in the table:
//             train                   (Layer 5 - ml)
//             append + rewrite tables (Layer 6 - infra)
//             save the snapshot       (Layer 6 - infra)
//
// Runs are strictly sequential. The tables are rewritten after
// every run, so a crashed sweep restarts where it stopped.
//
// Reference: Burn Book §5 (Training)

use anyhow::{ensure, Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::data::{dataset::ImageDataset, loader::Cifar10Loader, preprocessor::ChannelStats};
use crate::domain::{
    norm_kind::NormKind,
    records::SweepRecord,
    run_key::RunKey,
    traits::{ImageSource, Split},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    curves::CurveLog,
    metrics::MetricsLogger,
    results::ResultTable,
};
use crate::ml::{
    model::ResNetConfig,
    schedule::scaled_learning_rate,
    trainer::{train_model, TrainSettings},
};

/// Number of final epochs averaged into `accuracy_5`.
const RECENT_EPOCHS: usize = 5;

// ─── Sweep Configuration ──────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub data_dir:         String,
    pub results_path:     String,
    pub curves_path:      String,
    pub models_dir:       String,
    pub logs_dir:         String,
    pub seeds:            Vec<u64>,
    pub batch_sizes:      Vec<usize>,
    pub norms:            Vec<NormKind>,
    pub epochs:           usize,
    pub num_groups:       usize,
    pub stage_widths:     Vec<usize>,
    pub blocks_per_stage: usize,
    /// Ignore earlier results and wipe the logs folder
    pub restart:          bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            data_dir:         "data".to_string(),
            results_path:     "results.csv".to_string(),
            curves_path:      "results.json".to_string(),
            models_dir:       "models".to_string(),
            logs_dir:         "logs".to_string(),
            seeds:            vec![1],
            batch_sizes:      vec![128, 32, 16, 8, 4, 2],
            norms:            NormKind::ALL.to_vec(),
            epochs:           100,
            num_groups:       8,
            stage_widths:     vec![16, 32, 64],
            blocks_per_stage: 3,
            restart:          false,
        }
    }
}

impl SweepConfig {
    pub fn model_config(&self, norm: NormKind) -> ResNetConfig {
        ResNetConfig::new(norm)
            .with_num_groups(self.num_groups)
            .with_stage_widths(self.stage_widths.clone())
            .with_blocks_per_stage(self.blocks_per_stage)
    }

    /// Every combination in sweep order: seed, then batch size, then norm.
    pub fn run_keys(&self) -> Vec<RunKey> {
        let mut keys = Vec::new();
        for &seed in &self.seeds {
            for &batch_size in &self.batch_sizes {
                for &norm in &self.norms {
                    keys.push(RunKey::new(batch_size, norm, seed));
                }
            }
        }
        keys
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.seeds.is_empty(), "at least one seed is required");
        ensure!(!self.batch_sizes.is_empty(), "at least one batch size is required");
        ensure!(!self.norms.is_empty(), "at least one normalization kind is required");
        for norm in &self.norms {
            self.model_config(*norm).validate()?;
        }
        Ok(())
    }
}

/// What a sweep did, for the CLI summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepSummary {
    pub trained: Vec<SweepRecord>,
    pub skipped: Vec<RunKey>,
}

// ─── SweepUseCase ─────────────────────────────────────────────────────────────
pub struct SweepUseCase {
    config: SweepConfig,
}

impl SweepUseCase {
    pub fn new(config: SweepConfig) -> Self {
        Self { config }
    }

    /// Run the sweep on CIFAR-10 with the GPU backend.
    pub fn execute(&self) -> Result<SweepSummary> {
        let device = crate::ml::default_device();
        let source = Cifar10Loader::new(&self.config.data_dir);
        self.run::<crate::ml::TrainBackend>(&source, &device)
    }

    pub fn run<B: AutodiffBackend>(
        &self,
        source: &impl ImageSource,
        device: &B::Device,
    ) -> Result<SweepSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Output folders ────────────────────────────────────────────
        let logs_dir = Path::new(&cfg.logs_dir);
        if cfg.restart && logs_dir.exists() {
            tracing::info!("Restart requested: removing '{}'", logs_dir.display());
            fs::remove_dir_all(logs_dir)
                .with_context(|| format!("Cannot remove '{}'", logs_dir.display()))?;
        }
        fs::create_dir_all(logs_dir)
            .with_context(|| format!("Cannot create '{}'", logs_dir.display()))?;
        let config_path = logs_dir.join("sweep_config.json");
        fs::write(&config_path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write '{}'", config_path.display()))?;

        // ── Step 2: Data ──────────────────────────────────────────────────────
        let train_images = source.load_split(Split::Train)?;
        let test_images  = source.load_split(Split::Test)?;

        // ── Step 3: Input statistics from the training split only ─────────────
        let stats = ChannelStats::adapt(&train_images);
        let train = ImageDataset::new(train_images);
        let test  = ImageDataset::new(test_images);

        // ── Step 4: Resume ────────────────────────────────────────────────────
        let (mut table, mut curves) = if cfg.restart {
            (
                ResultTable::<SweepRecord>::empty(&cfg.results_path),
                CurveLog::empty(&cfg.curves_path),
            )
        } else {
            (
                ResultTable::<SweepRecord>::load_or_empty(&cfg.results_path),
                CurveLog::load_or_empty(&cfg.curves_path),
            )
        };
        let snapshots = CheckpointManager::new(&cfg.models_dir);

        // ── Step 5: Sweep ─────────────────────────────────────────────────────
        let mut summary = SweepSummary::default();
        for key in cfg.run_keys() {
            if table.contains(&key) {
                tracing::info!("Skipping {}: already in '{}'", key, table.path().display());
                summary.skipped.push(key);
                continue;
            }

            let record = self.run_one::<B>(&key, &train, &test, stats, &snapshots, &mut curves, device)?;
            table.push(record.clone());
            table.save()?;
            curves.save()?;
            summary.trained.push(record);
        }

        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_one<B: AutodiffBackend>(
        &self,
        key:       &RunKey,
        train:     &ImageDataset,
        test:      &ImageDataset,
        stats:     ChannelStats,
        snapshots: &CheckpointManager,
        curves:    &mut CurveLog,
        device:    &B::Device,
    ) -> Result<SweepRecord> {
        let cfg       = &self.config;
        let model_cfg = cfg.model_config(key.norm);
        let lr        = scaled_learning_rate(key.batch_size);
        let settings  = TrainSettings::new(key.batch_size, cfg.epochs, lr, key.seed);

        tracing::info!("Training {} ({}, initial lr {})", key, key.norm, lr);
        let logger  = MetricsLogger::create(Path::new(&cfg.logs_dir).join(key.to_string()))?;
        let outcome = train_model::<B>(
            &model_cfg,
            &settings,
            train.clone(),
            test.clone(),
            stats,
            Some(&logger),
            device,
        )?;

        let record = SweepRecord {
            seed:           key.seed,
            batch_size:     key.batch_size,
            norm:           key.norm,
            accuracy_final: outcome.final_accuracy(),
            accuracy_5:     outcome.mean_recent_accuracy(RECENT_EPOCHS),
        };
        curves.push(key, outcome.loss_curve(), record.accuracy_final);

        snapshots.save_model(key, &outcome.model, &model_cfg)?;
        snapshots.save_stats(key, &stats)?;

        tracing::info!(
            "{} finished: final accuracy {:.4}, last-{} mean {:.4}",
            key,
            record.accuracy_final,
            RECENT_EPOCHS,
            record.accuracy_5,
        );
        Ok(record)
    }
}
