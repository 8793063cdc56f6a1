// ============================================================
// Layer 2 — ReproduceUseCase
// ============================================================
// Re-evaluates every saved snapshot on the test split and
// writes a second result table, then redraws the chart from it.
//
//   models/BS32-GN-S1/  →  seed=1, batch_size=32, norm=Group Norm
//
// Each model is evaluated with its own batch size. Only the
// final weights are on disk, so only the final accuracy can be
// reproduced; the last-5-epoch mean is not.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{ensure, Result};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::application::plot_use_case::{PlotConfig, PlotUseCase};
use crate::data::{dataset::ImageDataset, loader::Cifar10Loader};
use crate::domain::{
    records::ReproducedRecord,
    traits::{ImageSource, Split},
};
use crate::infra::{checkpoint::CheckpointManager, results::ResultTable};
use crate::ml::{
    evaluator::{eval_loader, evaluate},
    model::ResNet,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReproduceConfig {
    pub data_dir:    String,
    pub models_dir:  String,
    pub output_path: String,
    pub chart_path:  String,
}

impl Default for ReproduceConfig {
    fn default() -> Self {
        Self {
            data_dir:    "data".to_string(),
            models_dir:  "models".to_string(),
            output_path: "results_reproduced.csv".to_string(),
            chart_path:  "results_reproduced.svg".to_string(),
        }
    }
}

pub struct ReproduceUseCase {
    config: ReproduceConfig,
}

impl ReproduceUseCase {
    pub fn new(config: ReproduceConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<ReproducedRecord>> {
        let device = crate::ml::default_device();
        let source = Cifar10Loader::new(&self.config.data_dir);
        self.run::<crate::ml::EvalBackend>(&source, &device)
    }

    pub fn run<B: Backend>(
        &self,
        source: &impl ImageSource,
        device: &B::Device,
    ) -> Result<Vec<ReproducedRecord>> {
        let cfg       = &self.config;
        let snapshots = CheckpointManager::new(&cfg.models_dir);
        let keys      = snapshots.list_runs()?;
        ensure!(!keys.is_empty(), "No snapshots found in '{}'", cfg.models_dir);

        let test  = ImageDataset::new(source.load_split(Split::Test)?);
        let mut table = ResultTable::<ReproducedRecord>::empty(&cfg.output_path);

        for key in keys {
            println!("evaluating {key}");
            let (_, model): (_, ResNet<B>) = snapshots.load_model(&key, device)?;
            let stats  = snapshots.load_stats(&key)?;
            let loader = eval_loader::<B>(test.clone(), stats, key.batch_size, device.clone());
            let eval   = evaluate(&model, loader.as_ref());

            tracing::info!("{}: accuracy {:.4} on {} images", key, eval.accuracy, eval.samples);
            table.push(ReproducedRecord {
                seed:       key.seed,
                batch_size: key.batch_size,
                norm:       key.norm,
                accuracy:   eval.accuracy,
            });
        }
        table.save()?;

        PlotUseCase::new(PlotConfig {
            input_path:  cfg.output_path.clone(),
            output_path: cfg.chart_path.clone(),
            column:      None,
            with_std:    true,
            title:       "Reproduced test error vs batch size".to_string(),
        })
        .execute()?;

        Ok(table.rows().to_vec())
    }
}
