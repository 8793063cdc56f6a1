// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Trains one ResNet for one (batch size, norm, seed) run.
//
//   - training uses the autodiff backend B
//   - model.valid() returns the model on B::InnerBackend, which
//     also switches BatchNorm to its running statistics
//   - validation batches are built on the inner backend too
//
// Per epoch: SGD steps with the scheduled learning rate, then a
// full pass over the validation set. The returned history gives
// the loss curve, the final accuracy and the mean accuracy of
// the last epochs.
//
// Reference: Burn Book §5 (Training)

use anyhow::{ensure, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::{batcher::ImageBatcher, dataset::ImageDataset, preprocessor::ChannelStats};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::evaluator::{count_correct, eval_loader, evaluate};
use crate::ml::model::{ResNet, ResNetConfig};
use crate::ml::schedule::StepDecay;

/// Optimisation hyperparameters of a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainSettings {
    pub epochs:       usize,
    pub batch_size:   usize,
    pub schedule:     StepDecay,
    pub momentum:     f64,
    /// λ of the λ‖w‖² term added to the loss (BatchNorm excluded)
    pub l2_penalty:   f64,
    pub seed:         u64,
    pub num_workers:  usize,
}

impl TrainSettings {
    pub fn new(batch_size: usize, epochs: usize, initial_lr: f64, seed: u64) -> Self {
        Self {
            epochs,
            batch_size,
            schedule:     StepDecay::new(initial_lr),
            momentum:     0.9,
            l2_penalty:   1e-4,
            seed,
            num_workers:  1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.epochs > 0, "epochs must be at least 1");
        ensure!(self.batch_size > 0, "batch size must be at least 1");
        ensure!(self.schedule.initial_lr > 0.0, "learning rate must be positive");
        Ok(())
    }
}

pub struct TrainOutcome<B: AutodiffBackend> {
    pub model:   ResNet<B>,
    pub history: Vec<EpochMetrics>,
}

impl<B: AutodiffBackend> TrainOutcome<B> {
    /// Validation accuracy after the last epoch.
    pub fn final_accuracy(&self) -> f64 {
        self.history.last().map(|m| m.val_acc).unwrap_or(0.0)
    }

    /// Mean validation accuracy over the last `n` epochs (fewer if
    /// the run was shorter).
    pub fn mean_recent_accuracy(&self, n: usize) -> f64 {
        let start  = self.history.len().saturating_sub(n);
        let recent = &self.history[start..];
        if recent.is_empty() {
            return 0.0;
        }
        recent.iter().map(|m| m.val_acc).sum::<f64>() / recent.len() as f64
    }

    pub fn loss_curve(&self) -> Vec<f64> {
        self.history.iter().map(|m| m.train_loss).collect()
    }
}

pub fn train_model<B: AutodiffBackend>(
    model_cfg: &ResNetConfig,
    settings:  &TrainSettings,
    train:     ImageDataset,
    valid:     ImageDataset,
    stats:     ChannelStats,
    logger:    Option<&MetricsLogger>,
    device:    &B::Device,
) -> Result<TrainOutcome<B>> {
    settings.validate()?;
    ensure!(!train.images().is_empty(), "training set is empty");

    // ── Build model ───────────────────────────────────────────────────────────
    B::seed(settings.seed);
    let mut model: ResNet<B> = model_cfg.init(device)?;
    tracing::info!(
        "Model ready: {:?}, {} params, widths {:?}",
        model_cfg.norm,
        model.num_params(),
        model_cfg.stage_widths
    );

    // ── SGD with momentum (no dampening) ──────────────────────────────────────
    let optim_cfg = SgdConfig::new()
        .with_momentum(Some(
            MomentumConfig::new()
                .with_momentum(settings.momentum)
                .with_dampening(0.0),
        ));
    let mut optim = optim_cfg.init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_batcher = ImageBatcher::<B>::train(device.clone(), stats, settings.seed);
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(settings.batch_size)
        .shuffle(settings.seed)
        .num_workers(settings.num_workers)
        .build(train);
    let valid_loader = eval_loader::<B::InnerBackend>(valid, stats, settings.batch_size, device.clone());

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut history = Vec::with_capacity(settings.epochs);
    for epoch in 0..settings.epochs {
        let lr = settings.schedule.lr_at(epoch);

        let mut loss_sum = 0.0f64;
        let mut correct  = 0usize;
        let mut seen     = 0usize;

        for batch in train_loader.iter() {
            let n = batch.targets.dims()[0];
            let (ce, logits) = model.forward_loss(batch.images, batch.targets.clone());

            loss_sum += ce.clone().into_scalar().elem::<f64>() * n as f64;
            correct  += count_correct(logits, batch.targets);
            seen     += n;

            let loss  = ce + model.l2_penalty().mul_scalar(settings.l2_penalty);
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
        }

        let eval = evaluate(&model.valid(), valid_loader.as_ref());
        let metrics = EpochMetrics {
            epoch:      epoch + 1,
            lr,
            train_loss: loss_sum / seen.max(1) as f64,
            train_acc:  correct as f64 / seen.max(1) as f64,
            val_loss:   eval.loss,
            val_acc:    eval.accuracy,
        };

        println!(
            "Epoch {:>3}/{} | lr={:.5} | train_loss={:.4} | train_acc={:.1}% | val_loss={:.4} | val_acc={:.1}%",
            metrics.epoch, settings.epochs, lr,
            metrics.train_loss, metrics.train_acc * 100.0,
            metrics.val_loss, metrics.val_acc * 100.0,
        );

        if let Some(logger) = logger {
            logger.log(&metrics)?;
        }
        history.push(metrics);
    }

    Ok(TrainOutcome { model, history })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{image::{LabeledImage, IMAGE_BYTES}, norm_kind::NormKind};
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn toy_images(n: usize) -> Vec<LabeledImage> {
        (0..n)
            .map(|i| {
                let label = (i % 2) as u8;
                LabeledImage::new(vec![if label == 0 { 20 } else { 220 }; IMAGE_BYTES], label)
            })
            .collect()
    }

    #[test]
    fn test_short_run_produces_history() {
        let device = Default::default();
        let cfg = ResNetConfig::new(NormKind::Group)
            .with_num_groups(2)
            .with_stage_widths(vec![4])
            .with_blocks_per_stage(1);
        let settings = TrainSettings::new(2, 2, 0.05, 1);

        let images = toy_images(4);
        let stats  = ChannelStats::adapt(&images);
        let tmp    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(tmp.path()).unwrap();

        let outcome = train_model::<TestBackend>(
            &cfg,
            &settings,
            ImageDataset::new(images.clone()),
            ImageDataset::new(images),
            stats,
            Some(&logger),
            &device,
        )
        .unwrap();

        assert_eq!(outcome.history.len(), 2);
        assert_eq!(outcome.loss_curve().len(), 2);
        assert!(outcome.loss_curve().iter().all(|l| l.is_finite()));
        let acc = outcome.final_accuracy();
        assert!((0.0..=1.0).contains(&acc));

        let logged = std::fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(logged.lines().count(), 3);
    }

    #[test]
    fn test_zero_epochs_is_rejected() {
        assert!(TrainSettings::new(2, 0, 0.1, 1).validate().is_err());
    }

    #[test]
    fn test_recent_accuracy_window() {
        let device = Default::default();
        let model: ResNet<TestBackend> = ResNetConfig::new(NormKind::Batch)
            .with_stage_widths(vec![4])
            .with_blocks_per_stage(1)
            .init(&device)
            .unwrap();
        let history = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7]
            .iter()
            .enumerate()
            .map(|(i, &acc)| EpochMetrics {
                epoch: i + 1, lr: 0.1, train_loss: 1.0, train_acc: acc, val_loss: 1.0, val_acc: acc,
            })
            .collect();
        let outcome = TrainOutcome { model, history };

        assert!((outcome.final_accuracy() - 0.7).abs() < 1e-12);
        assert!((outcome.mean_recent_accuracy(5) - 0.5).abs() < 1e-12);
        assert!((outcome.mean_recent_accuracy(50) - 0.4).abs() < 1e-12);
    }
}
