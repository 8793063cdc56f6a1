// ============================================================
// Layer 2 — GroupSearchUseCase
// ============================================================
// Picks the Group Norm group count on held-out training data:
//
//   Step 1: Load the training split          (Layer 4 - data)
//   Step 2: Hold out the first 6000 images   (Layer 4 - data)
//   Step 3: For each candidate G:
//             train a GN ResNet              (Layer 5 - ml)
//             record the holdout accuracy
//             rewrite hp.json                (so a crash keeps it)
//
// G = 1 (layer norm) and G = C (instance norm) are left out of
// the default candidates on purpose.

use anyhow::{ensure, Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::data::{
    dataset::ImageDataset,
    loader::Cifar10Loader,
    preprocessor::ChannelStats,
    splitter::split_holdout,
};
use crate::domain::{
    norm_kind::NormKind,
    traits::{ImageSource, Split},
};
use crate::ml::{
    model::ResNetConfig,
    trainer::{train_model, TrainSettings},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSearchConfig {
    pub data_dir:         String,
    pub output_path:      String,
    pub candidates:       Vec<usize>,
    pub holdout:          usize,
    pub batch_size:       usize,
    pub learning_rate:    f64,
    pub epochs:           usize,
    pub seed:             u64,
    pub stage_widths:     Vec<usize>,
    pub blocks_per_stage: usize,
}

impl Default for GroupSearchConfig {
    fn default() -> Self {
        Self {
            data_dir:         "data".to_string(),
            output_path:      "hp.json".to_string(),
            candidates:       vec![8, 4, 2],
            holdout:          6000,
            batch_size:       32,
            learning_rate:    0.1,
            epochs:           50,
            seed:             1,
            stage_widths:     vec![16, 32, 64],
            blocks_per_stage: 3,
        }
    }
}

/// Contents of hp.json: parallel arrays, one entry per finished candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSearchResult {
    pub group_size: Vec<usize>,
    pub accuracy:   Vec<f64>,
}

impl GroupSearchResult {
    /// Candidate with the highest holdout accuracy.
    pub fn best(&self) -> Option<(usize, f64)> {
        self.group_size
            .iter()
            .copied()
            .zip(self.accuracy.iter().copied())
            .fold(None, |best, (g, acc)| match best {
                Some((_, b)) if b >= acc => best,
                _ => Some((g, acc)),
            })
    }

    fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string(self)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }
}

pub struct GroupSearchUseCase {
    config: GroupSearchConfig,
}

impl GroupSearchUseCase {
    pub fn new(config: GroupSearchConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<GroupSearchResult> {
        let device = crate::ml::default_device();
        let source = Cifar10Loader::new(&self.config.data_dir);
        self.run::<crate::ml::TrainBackend>(&source, &device)
    }

    pub fn run<B: AutodiffBackend>(
        &self,
        source: &impl ImageSource,
        device: &B::Device,
    ) -> Result<GroupSearchResult> {
        let cfg = &self.config;
        ensure!(!cfg.candidates.is_empty(), "no group counts to try");

        // fail on an indivisible candidate before spending hours on the others
        let model_cfgs = cfg
            .candidates
            .iter()
            .map(|&g| {
                let model_cfg = ResNetConfig::new(NormKind::Group)
                    .with_num_groups(g)
                    .with_stage_widths(cfg.stage_widths.clone())
                    .with_blocks_per_stage(cfg.blocks_per_stage);
                model_cfg.validate().map(|_| model_cfg)
            })
            .collect::<Result<Vec<_>>>()?;

        let images       = source.load_split(Split::Train)?;
        let (train, val) = split_holdout(images, cfg.holdout);
        ensure!(!val.is_empty(), "holdout of {} leaves no validation images", cfg.holdout);
        tracing::info!("Group search: {} training, {} holdout images", train.len(), val.len());

        let stats = ChannelStats::adapt(&train);
        let train = ImageDataset::new(train);
        let val   = ImageDataset::new(val);

        let settings = TrainSettings::new(cfg.batch_size, cfg.epochs, cfg.learning_rate, cfg.seed);
        let mut result = GroupSearchResult::default();

        for model_cfg in model_cfgs {
            tracing::info!("Trying {} groups", model_cfg.num_groups);
            let outcome = train_model::<B>(
                &model_cfg,
                &settings,
                train.clone(),
                val.clone(),
                stats,
                None,
                device,
            )?;

            result.group_size.push(model_cfg.num_groups);
            result.accuracy.push(outcome.final_accuracy());
            result.save(Path::new(&cfg.output_path))?;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::SyntheticSource;
    use burn::backend::{Autodiff, NdArray};

    #[test]
    fn test_best_prefers_first_on_ties() {
        let r = GroupSearchResult { group_size: vec![8, 4, 2], accuracy: vec![0.8, 0.9, 0.9] };
        assert_eq!(r.best(), Some((4, 0.9)));
        assert_eq!(GroupSearchResult::default().best(), None);
    }

    #[test]
    fn test_search_writes_hp_json() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = GroupSearchConfig {
            output_path:      tmp.path().join("hp.json").to_string_lossy().into_owned(),
            candidates:       vec![4, 2],
            holdout:          4,
            batch_size:       4,
            epochs:           1,
            stage_widths:     vec![4],
            blocks_per_stage: 1,
            ..GroupSearchConfig::default()
        };

        let result = GroupSearchUseCase::new(cfg.clone())
            .run::<Autodiff<NdArray>>(&SyntheticSource::new(12, 0), &Default::default())
            .unwrap();
        assert_eq!(result.group_size, vec![4, 2]);

        let saved: GroupSearchResult =
            serde_json::from_str(&fs::read_to_string(&cfg.output_path).unwrap()).unwrap();
        assert_eq!(saved, result);
    }

    #[test]
    fn test_indivisible_candidate_is_rejected_up_front() {
        let cfg = GroupSearchConfig { candidates: vec![8, 3], ..GroupSearchConfig::default() };
        let err = GroupSearchUseCase::new(cfg)
            .run::<Autodiff<NdArray>>(&SyntheticSource::new(8, 0), &Default::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("evenly divide"));
    }
}
