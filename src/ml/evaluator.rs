// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Average cross-entropy and accuracy of a model over every batch
// of a DataLoader. Used for per-epoch validation, for the final
// test accuracy and by the reproduce step.
//
// Loss is weighted by batch size so a short last batch does
// not count as much as a full one.

use std::sync::Arc;

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};

use crate::data::{
    batcher::{ImageBatch, ImageBatcher},
    dataset::ImageDataset,
    preprocessor::ChannelStats,
};
use crate::ml::model::ResNet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub loss:     f64,
    pub accuracy: f64,
    pub samples:  usize,
}

/// A non-shuffling, non-augmenting loader over `dataset`.
pub fn eval_loader<B: Backend>(
    dataset:    ImageDataset,
    stats:      ChannelStats,
    batch_size: usize,
    device:     B::Device,
) -> Arc<dyn DataLoader<ImageBatch<B>>> {
    DataLoaderBuilder::new(ImageBatcher::<B>::eval(device, stats))
        .batch_size(batch_size)
        .num_workers(1)
        .build(dataset)
}

/// Number of rows whose argmax matches the target class.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns [batch, 1]; flatten to [batch] before comparing
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

pub fn evaluate<B: Backend>(model: &ResNet<B>, loader: &dyn DataLoader<ImageBatch<B>>) -> Evaluation {
    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    let mut samples  = 0usize;

    for batch in loader.iter() {
        let n = batch.targets.dims()[0];
        let (loss, logits) = model.forward_loss(batch.images, batch.targets.clone());

        loss_sum += loss.into_scalar().elem::<f64>() * n as f64;
        correct  += count_correct(logits, batch.targets);
        samples  += n;
    }

    if samples == 0 {
        return Evaluation { loss: f64::NAN, accuracy: 0.0, samples };
    }
    Evaluation {
        loss:     loss_sum / samples as f64,
        accuracy: correct as f64 / samples as f64,
        samples,
    }
}
