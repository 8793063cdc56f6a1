// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<LabeledImage>
// into device tensors:
//
//   images:  [N, 3, 32, 32] float, standardised (and augmented
//            when the batcher is built for training)
//   targets: [N] int class indices
//
// All preprocessing runs on the CPU into one flat Vec<f32>,
// then a single tensor is created and reshaped. That is one
// host→device copy per batch instead of one per image.
//
// Augmentation needs randomness inside `batch(&self, ..)`, so
// the RNG lives behind Arc<Mutex<..>>. Seeding it from the run
// seed makes the augmentation stream reproducible.
//
// Reference: Burn Book §4 (Batcher)

use std::sync::{Arc, Mutex};

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::data::augment::{pad_flip_crop, CropWindow};
use crate::data::preprocessor::ChannelStats;
use crate::domain::image::{LabeledImage, IMAGE_CHANNELS, IMAGE_SIDE};

// ─── ImageBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Shape: [batch_size, 3, 32, 32]
    pub images: Tensor<B, 4>,

    /// Shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    device: B::Device,
    stats:  ChannelStats,
    /// `Some` only for training batchers
    rng:    Option<Arc<Mutex<StdRng>>>,
}

impl<B: Backend> ImageBatcher<B> {
    /// Batcher for validation / test data: standardise only.
    pub fn eval(device: B::Device, stats: ChannelStats) -> Self {
        Self { device, stats, rng: None }
    }

    /// Batcher for training data: standardise, then pad/flip/crop.
    pub fn train(device: B::Device, stats: ChannelStats, seed: u64) -> Self {
        let rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        Self { device, stats, rng: Some(rng) }
    }

    fn preprocess(&self, items: &[LabeledImage]) -> Vec<f32> {
        let mut flat = Vec::with_capacity(items.len() * IMAGE_CHANNELS * IMAGE_SIDE * IMAGE_SIDE);

        match &self.rng {
            Some(rng) => {
                // a poisoned lock only means another batch panicked;
                // the RNG state itself is still usable
                let mut rng = rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                for item in items {
                    let window = CropWindow::random(&mut *rng);
                    flat.extend(pad_flip_crop(&self.stats.standardize(item), window));
                }
            }
            None => {
                for item in items {
                    flat.extend(self.stats.standardize(item));
                }
            }
        }
        flat
    }
}

impl<B: Backend> Batcher<LabeledImage, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<LabeledImage>) -> ImageBatch<B> {
        let batch_size = items.len();
        let flat       = self.preprocess(&items);

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(flat, [batch_size, IMAGE_CHANNELS, IMAGE_SIDE, IMAGE_SIDE])
                .convert::<B::FloatElem>(),
            &self.device,
        );

        let labels: Vec<i32> = items.iter().map(|item| item.label as i32).collect();
        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ImageBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::IMAGE_BYTES;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn images() -> Vec<LabeledImage> {
        (0..3u8)
            .map(|i| LabeledImage::new(vec![i * 40; IMAGE_BYTES], i + 1))
            .collect()
    }

    #[test]
    fn test_batch_shapes_and_targets() {
        let device  = Default::default();
        let batcher = ImageBatcher::<TestBackend>::eval(device, ChannelStats::default());
        let batch   = batcher.batch(images());

        assert_eq!(batch.images.dims(), [3, 3, 32, 32]);
        assert_eq!(batch.targets.dims(), [3]);
        let targets = batch.targets.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(targets, vec![1, 2, 3]);
    }

    #[test]
    fn test_eval_batch_is_standardised() {
        let stats   = ChannelStats { mean: [40.0; 3], std: [40.0; 3] };
        let batcher = ImageBatcher::<TestBackend>::eval(Default::default(), stats);
        let batch   = batcher.batch(images());

        let values = batch.images.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        // image 0 is all zeros → (0 - 40) / 40
        assert!((values[0] + 1.0).abs() < 1e-6);
        // image 2 is all 80 → (80 - 40) / 40
        assert!((values[2 * IMAGE_BYTES] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_train_batches_are_reproducible_per_seed() {
        let make = || {
            let b = ImageBatcher::<TestBackend>::train(Default::default(), ChannelStats::default(), 11);
            let ramp: Vec<u8> = (0..IMAGE_BYTES).map(|i| (i % 251) as u8).collect();
            b.batch(vec![LabeledImage::new(ramp, 0)])
                .images
                .into_data()
                .convert::<f32>()
                .to_vec::<f32>()
                .unwrap()
        };
        assert_eq!(make(), make());
    }
}
