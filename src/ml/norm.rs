// ============================================================
// Layer 5 — Normalization Wrapper
// ============================================================
// One module type that holds either a GroupNormalization or a
// Burn BatchNorm, so the ResNet can be written once and built
// with either layer.
//
// BatchNorm uses the Keras defaults the study was designed
// around: running statistics updated with weight 0.01 per batch
// (Burn's `momentum` is the weight of the NEW batch) and ε = 1e-3.

use anyhow::Result;
use burn::{
    nn::{BatchNorm, BatchNormConfig, Initializer},
    prelude::*,
};

use crate::domain::norm_kind::NormKind;
use crate::ml::group_norm::{GroupNormalization, GroupNormalizationConfig};

const BATCH_NORM_MOMENTUM: f64 = 0.01;
const BATCH_NORM_EPSILON:  f64 = 1e-3;

/// How to build one normalization layer.
#[derive(Debug, Clone, Copy)]
pub struct NormSpec {
    pub kind:       NormKind,
    pub num_groups: usize,
    /// Initialise γ to zeros (GN only) for the last norm of a
    /// residual branch.
    pub zero_gamma: bool,
}

impl NormSpec {
    pub fn new(kind: NormKind, num_groups: usize) -> Self {
        Self { kind, num_groups, zero_gamma: false }
    }

    pub fn zero_gamma(self) -> Self {
        Self { zero_gamma: true, ..self }
    }

    pub fn init<B: Backend>(&self, channels: usize, device: &B::Device) -> Result<Normalization<B>> {
        let layer = match self.kind {
            NormKind::Group => {
                let gamma = if self.zero_gamma { Initializer::Zeros } else { Initializer::Ones };
                let gn = GroupNormalizationConfig::new(self.num_groups, channels)
                    .with_gamma_initializer(gamma)
                    .init(device)?;
                Normalization { group: Some(gn), batch: None }
            }
            NormKind::Batch => {
                let bn = BatchNormConfig::new(channels)
                    .with_momentum(BATCH_NORM_MOMENTUM)
                    .with_epsilon(BATCH_NORM_EPSILON)
                    .init(device);
                Normalization { group: None, batch: Some(bn) }
            }
        };
        Ok(layer)
    }
}

/// Exactly one of the two fields is set.
#[derive(Module, Debug)]
pub struct Normalization<B: Backend> {
    group: Option<GroupNormalization<B>>,
    batch: Option<BatchNorm<B, 2>>,
}

impl<B: Backend> Normalization<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match (&self.group, &self.batch) {
            (Some(gn), _)    => gn.forward(x),
            (None, Some(bn)) => bn.forward(x),
            (None, None)     => x,
        }
    }

    /// L2 term for Group Norm γ/β. BatchNorm parameters carry no
    /// regulariser, so a BN layer contributes nothing.
    pub fn l2_penalty(&self) -> Option<Tensor<B, 1>> {
        self.group.as_ref().map(|gn| gn.l2_penalty())
    }
}
