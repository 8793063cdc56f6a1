// ============================================================
// Layer 4 — Input Standardisation
// ============================================================
// Instead of scaling pixels by 1/255, every input channel is
// standardised with statistics measured once over the whole
// training split:
//
//   x' = (x - mean_c) / std_c
//
// The statistics are computed ("adapted") from training data
// only and then reused unchanged for validation and test
// batches, so no test information leaks into preprocessing.
//
// Reference: Rust Book §13 (Iterators)

use serde::{Deserialize, Serialize};

use crate::domain::image::{LabeledImage, IMAGE_CHANNELS, IMAGE_PIXELS};

/// Per-channel mean and standard deviation in raw pixel units (0..=255).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: [f32; IMAGE_CHANNELS],
    pub std:  [f32; IMAGE_CHANNELS],
}

impl ChannelStats {
    /// Measure per-channel statistics over a set of images.
    ///
    /// Uses f64 accumulators: 50 000 images × 1024 pixels per
    /// channel overflows f32 precision long before the end.
    pub fn adapt(images: &[LabeledImage]) -> Self {
        let mut sum    = [0.0f64; IMAGE_CHANNELS];
        let mut sq_sum = [0.0f64; IMAGE_CHANNELS];

        for image in images {
            for c in 0..IMAGE_CHANNELS {
                for &p in image.channel(c) {
                    let v = p as f64;
                    sum[c]    += v;
                    sq_sum[c] += v * v;
                }
            }
        }

        let count = (images.len() * IMAGE_PIXELS).max(1) as f64;
        let mut mean = [0.0f32; IMAGE_CHANNELS];
        let mut std  = [1.0f32; IMAGE_CHANNELS];
        for c in 0..IMAGE_CHANNELS {
            let m   = sum[c] / count;
            let var = (sq_sum[c] / count - m * m).max(0.0);
            mean[c] = m as f32;
            // a constant channel keeps std = 1 so standardising is a shift only
            std[c]  = if var > 0.0 { var.sqrt() as f32 } else { 1.0 };
        }

        tracing::debug!("Adapted input statistics: mean={:?} std={:?}", mean, std);
        Self { mean, std }
    }

    /// Standardise one CHW image into a fresh f32 buffer.
    pub fn standardize(&self, image: &LabeledImage) -> Vec<f32> {
        let mut out = Vec::with_capacity(image.pixels.len());
        for c in 0..IMAGE_CHANNELS {
            let (m, s) = (self.mean[c], self.std[c]);
            out.extend(image.channel(c).iter().map(|&p| (p as f32 - m) / s));
        }
        out
    }
}

impl Default for ChannelStats {
    fn default() -> Self {
        Self { mean: [0.0; IMAGE_CHANNELS], std: [1.0; IMAGE_CHANNELS] }
    }
}
