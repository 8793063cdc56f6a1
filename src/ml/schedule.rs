// ============================================================
// Layer 5 — Learning Rate Schedule
// ============================================================
// Two rules from the ResNet recipe:
//
//   linear scaling:  lr(bs) = 0.1 · bs / 32
//   step decay:      lr(epoch) = lr / 10^(epoch / 30)
//
// Epochs are counted from 0, so epochs 0..29 use the full rate,
// 30..59 a tenth of it, and so on.
//
// Reference: He et al. (2016) §4.2, Goyal et al. (2017) linear scaling rule

use serde::{Deserialize, Serialize};

pub const REFERENCE_LR:         f64   = 0.1;
pub const REFERENCE_BATCH_SIZE: usize = 32;

/// Initial learning rate scaled linearly with batch size.
pub fn scaled_learning_rate(batch_size: usize) -> f64 {
    REFERENCE_LR * batch_size as f64 / REFERENCE_BATCH_SIZE as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepDecay {
    pub initial_lr: f64,
    pub drop_every: usize,
    pub factor:     f64,
}

impl StepDecay {
    pub fn new(initial_lr: f64) -> Self {
        Self { initial_lr, drop_every: 30, factor: 10.0 }
    }

    pub fn lr_at(&self, epoch: usize) -> f64 {
        let drops = (epoch / self.drop_every.max(1)) as i32;
        self.initial_lr / self.factor.powi(drops)
    }
}
