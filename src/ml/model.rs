// ============================================================
// Layer 5 — ResNet-20 for CIFAR-10
// ============================================================
// The network from He et al. §4.2 with n = 3 blocks per stage:
//
//   stem:    conv3×3(16) → norm
//   stage 1: 3 × block(16)   at 32×32
//   stage 2: 3 × block(32)   at 16×16  (first block strides 2)
//   stage 3: 3 × block(64)   at  8×8   (first block strides 2)
//   head:    global average pool → dense(10)
//
// One block:
//
//   x ─ conv3×3(stride) ─ ReLU ─ norm ─ conv3×3 ─ norm(γ=0 for GN) ─┐
//   │                                                               + ─ ReLU
//   └──────────── [1×1 projection if width or stride changes] ──────┘
//
// The norm before the addition starts with γ = 0 under Group
// Norm, so every residual branch is the identity at init.
// Convolutions carry no bias (the following norm has one) and
// are He-normal initialised from the backend RNG, which the
// trainer seeds per run.
//
// Reference: He et al. (2016) Deep Residual Learning
//            Wu & He (2018) Group Normalization §4

use anyhow::{ensure, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        Initializer, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::norm_kind::NormKind;
use crate::ml::group_norm::check_groups;
use crate::ml::norm::{NormSpec, Normalization};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ResNetConfig {
    pub norm: NormKind,
    /// Only used when `norm` is Group Norm
    #[config(default = 8)]
    pub num_groups: usize,
    #[config(default = 3)]
    pub in_channels: usize,
    #[config(default = 10)]
    pub num_classes: usize,
    #[config(default = "vec![16, 32, 64]")]
    pub stage_widths: Vec<usize>,
    #[config(default = 3)]
    pub blocks_per_stage: usize,
}

fn he_normal() -> Initializer {
    Initializer::KaimingNormal { gain: 2f64.sqrt(), fan_out_only: false }
}

fn conv(in_channels: usize, out_channels: usize, kernel: usize, stride: usize) -> Conv2dConfig {
    let pad = kernel / 2;
    Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(pad, pad))
        .with_bias(false)
        .with_initializer(he_normal())
}

impl ResNetConfig {
    /// Check the architecture before any weights are allocated.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.stage_widths.is_empty(), "ResNet needs at least one stage");
        ensure!(self.blocks_per_stage > 0, "ResNet needs at least one block per stage");
        ensure!(self.num_classes > 0, "ResNet needs at least one output class");
        if self.norm == NormKind::Group {
            for &width in &self.stage_widths {
                check_groups(width, self.num_groups)?;
            }
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ResNet<B>> {
        self.validate()?;
        let spec = NormSpec::new(self.norm, self.num_groups);

        let first_width = self.stage_widths[0];
        let stem        = conv(self.in_channels, first_width, 3, 1).init(device);
        let stem_norm   = spec.init(first_width, device)?;

        let mut blocks   = Vec::with_capacity(self.stage_widths.len() * self.blocks_per_stage);
        let mut in_width = first_width;
        for (stage, &width) in self.stage_widths.iter().enumerate() {
            for j in 0..self.blocks_per_stage {
                let downscale = stage > 0 && j == 0;
                blocks.push(self.build_block(spec, in_width, width, downscale, device)?);
                in_width = width;
            }
        }

        let pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let head = LinearConfig::new(in_width, self.num_classes).init(device);

        Ok(ResNet { stem, stem_norm, blocks, pool, head })
    }

    fn build_block<B: Backend>(
        &self,
        spec:      NormSpec,
        in_width:  usize,
        width:     usize,
        downscale: bool,
        device:    &B::Device,
    ) -> Result<ResidualBlock<B>> {
        let stride   = if downscale { 2 } else { 1 };
        let shortcut = (in_width != width || downscale)
            .then(|| conv(in_width, width, 1, stride).init(device));

        Ok(ResidualBlock {
            conv1: conv(in_width, width, 3, stride).init(device),
            norm1: spec.init(width, device)?,
            conv2: conv(width, width, 3, 1).init(device),
            norm2: spec.zero_gamma().init(width, device)?,
            shortcut,
        })
    }
}

#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    pub conv1:    Conv2d<B>,
    pub norm1:    Normalization<B>,
    pub conv2:    Conv2d<B>,
    pub norm2:    Normalization<B>,
    pub shortcut: Option<Conv2d<B>>,
}

impl<B: Backend> ResidualBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let y = self.conv1.forward(x.clone());
        let y = self.norm1.forward(relu(y));
        let y = self.norm2.forward(self.conv2.forward(y));

        let skip = match &self.shortcut {
            Some(projection) => projection.forward(x),
            None             => x,
        };
        relu(skip + y)
    }

    fn l2_penalty(&self) -> Tensor<B, 1> {
        let mut total = sum_squares(self.conv1.weight.val()) + sum_squares(self.conv2.weight.val());
        if let Some(projection) = &self.shortcut {
            total = total + sum_squares(projection.weight.val());
        }
        for norm in [&self.norm1, &self.norm2] {
            if let Some(penalty) = norm.l2_penalty() {
                total = total + penalty;
            }
        }
        total
    }
}

fn sum_squares<B: Backend, const D: usize>(t: Tensor<B, D>) -> Tensor<B, 1> {
    t.clone().mul(t).sum()
}

#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    pub stem:      Conv2d<B>,
    pub stem_norm: Normalization<B>,
    pub blocks:    Vec<ResidualBlock<B>>,
    pub pool:      AdaptiveAvgPool2d,
    pub head:      Linear<B>,
}

impl<B: Backend> ResNet<B> {
    /// images: [batch, 3, H, W] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = self.stem_norm.forward(self.stem.forward(images));
        for block in &self.blocks {
            x = block.forward(x);
        }
        let x = self.pool.forward(x).flatten::<2>(1, 3); // [batch, width]
        self.head.forward(x)
    }

    /// Mean cross-entropy of the logits against integer class targets.
    pub fn forward_loss(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss   = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }

    /// Sum of squares of every regularised parameter: conv and
    /// dense kernels, the dense bias and Group Norm γ/β.
    /// BatchNorm γ/β and running statistics are left out.
    pub fn l2_penalty(&self) -> Tensor<B, 1> {
        let mut total = sum_squares(self.stem.weight.val()) + sum_squares(self.head.weight.val());
        if let Some(bias) = &self.head.bias {
            total = total + sum_squares(bias.val());
        }
        if let Some(penalty) = self.stem_norm.l2_penalty() {
            total = total + penalty;
        }
        for block in &self.blocks {
            total = total + block.l2_penalty();
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn tiny(norm: NormKind) -> ResNetConfig {
        ResNetConfig::new(norm)
            .with_num_groups(2)
            .with_stage_widths(vec![4, 8])
            .with_blocks_per_stage(1)
    }

    #[test]
    fn test_default_is_resnet20() {
        let cfg = ResNetConfig::new(NormKind::Group);
        assert_eq!(cfg.stage_widths, vec![16, 32, 64]);
        assert_eq!(cfg.blocks_per_stage, 3);
        // stem + 9 blocks × 2 convs + head = 20 weighted layers
        assert_eq!(1 + cfg.stage_widths.len() * cfg.blocks_per_stage * 2 + 1, 20);
    }

    #[test]
    fn test_logits_shape_for_both_norms() {
        let device = Default::default();
        for norm in NormKind::ALL {
            let model  = tiny(norm).init::<TestBackend>(&device).unwrap();
            let images = Tensor::<TestBackend, 4>::random([2, 3, 32, 32], Distribution::Default, &device);
            assert_eq!(model.forward(images).dims(), [2, 10]);
        }
    }

    #[test]
    fn test_projection_only_where_shape_changes() {
        let model = tiny(NormKind::Batch).init::<TestBackend>(&Default::default()).unwrap();
        assert!(model.blocks[0].shortcut.is_none());
        assert!(model.blocks[1].shortcut.is_some());
    }

    #[test]
    fn test_group_norm_block_starts_as_identity() {
        let device = Default::default();
        let model  = tiny(NormKind::Group).init::<TestBackend>(&device).unwrap();
        // non-negative input, no projection: relu(x + 0) == x
        let x   = Tensor::<TestBackend, 4>::random([1, 4, 8, 8], Distribution::Uniform(0.0, 1.0), &device);
        let out = model.blocks[0].forward(x.clone());
        let diff = (out - x).abs().max().into_scalar().elem::<f32>();
        assert!(diff < 1e-6, "max diff {diff}");
    }

    #[test]
    fn test_invalid_group_count_is_rejected_before_init() {
        let cfg = ResNetConfig::new(NormKind::Group).with_num_groups(5);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("5 groups"));
        // the same group count is irrelevant for batch norm
        assert!(ResNetConfig::new(NormKind::Batch).with_num_groups(5).validate().is_ok());
    }

    fn squares(values: Vec<f32>) -> f64 {
        values.iter().map(|&v| (v as f64) * (v as f64)).sum()
    }

    fn tensor_squares<const D: usize>(t: Tensor<TestBackend, D>) -> f64 {
        squares(t.into_data().convert::<f32>().to_vec::<f32>().unwrap())
    }

    #[test]
    fn test_l2_penalty_skips_batch_norm_parameters() {
        let model = tiny(NormKind::Batch).init::<TestBackend>(&Default::default()).unwrap();

        let mut expected = tensor_squares(model.stem.weight.val())
            + tensor_squares(model.head.weight.val())
            + tensor_squares(model.head.bias.as_ref().unwrap().val());
        for block in &model.blocks {
            expected += tensor_squares(block.conv1.weight.val()) + tensor_squares(block.conv2.weight.val());
            if let Some(p) = &block.shortcut {
                expected += tensor_squares(p.weight.val());
            }
        }

        let got = model.l2_penalty().into_scalar().elem::<f64>();
        assert!((got - expected).abs() < 1e-3 * expected.max(1.0), "{got} vs {expected}");
    }

    #[test]
    fn test_l2_penalty_counts_group_norm_gamma() {
        let model = tiny(NormKind::Group).init::<TestBackend>(&Default::default()).unwrap();
        let convs_and_head = {
            let mut total = tensor_squares(model.stem.weight.val())
                + tensor_squares(model.head.weight.val())
                + tensor_squares(model.head.bias.as_ref().unwrap().val());
            for block in &model.blocks {
                total += tensor_squares(block.conv1.weight.val()) + tensor_squares(block.conv2.weight.val());
                if let Some(p) = &block.shortcut {
                    total += tensor_squares(p.weight.val());
                }
            }
            total
        };
        // γ = 1 on the stem norm and on each block's first norm; the
        // second norm of each block starts at γ = 0
        let gammas: usize = model.stem.weight.dims()[0]
            + model.blocks.iter().map(|b| b.conv1.weight.dims()[0]).sum::<usize>();

        let got = model.l2_penalty().into_scalar().elem::<f64>();
        let expected = convs_and_head + gammas as f64;
        assert!((got - expected).abs() < 1e-3 * expected, "{got} vs {expected}");
    }

    #[test]
    fn test_loss_is_finite() {
        let device  = Default::default();
        let model   = tiny(NormKind::Group).init::<TestBackend>(&device).unwrap();
        let images  = Tensor::<TestBackend, 4>::random([3, 3, 32, 32], Distribution::Default, &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 4, 9], &device);
        let (loss, logits) = model.forward_loss(images, targets);
        assert_eq!(logits.dims(), [3, 10]);
        assert!(loss.into_scalar().elem::<f32>().is_finite());
    }
}
