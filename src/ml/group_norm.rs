// ============================================================
// Layer 5 — Group Normalization
// ============================================================
// Normalises each example over groups of channels instead of
// over the batch, so its statistics do not depend on batch size.
//
// For an input [N, C, *spatial] and G groups (C mod G == 0):
//
//   1. group:    [N, C, *spatial] → [N, G, (C/G)·prod(spatial)]
//   2. moments:  mean and variance over the last axis,
//                one pair per (example, group)
//   3. normalise: x̂ = (x - mean) / sqrt(var + ε)
//   4. degroup:  back to [N, C, *spatial]
//   5. affine:   y = x̂ · γ_c + β_c   (one γ, β per channel)
//
// Channels are contiguous in memory for a fixed example, so
// step 1 is a pure reshape: group g owns channels
// [g·C/G, (g+1)·C/G) and no data crosses group boundaries.
//
// G = 1 gives layer normalisation over (C, H, W); G = C gives
// instance normalisation. Both are legal here.
//
// Reference: Wu & He (2018) Group Normalization, Fig. 3

use anyhow::{ensure, Result};
use burn::{
    module::Param,
    nn::Initializer,
    prelude::*,
};

/// Configuration to create a [GroupNormalization] layer.
#[derive(Config, Debug)]
pub struct GroupNormalizationConfig {
    /// Number of channel groups
    pub num_groups: usize,
    /// Number of channels expected in the input
    pub num_channels: usize,
    #[config(default = 1e-5)]
    pub epsilon: f64,
    /// Zeros for the last norm of a residual branch, so the
    /// block starts out as the identity.
    #[config(default = "Initializer::Ones")]
    pub gamma_initializer: Initializer,
    #[config(default = "Initializer::Zeros")]
    pub beta_initializer: Initializer,
}

/// Fails unless `num_groups` evenly divides `num_channels`.
pub fn check_groups(num_channels: usize, num_groups: usize) -> Result<()> {
    ensure!(num_groups > 0, "Group normalization needs at least one group");
    ensure!(
        num_channels % num_groups == 0,
        "Groups need to evenly divide the input channels, \
         but got {num_channels} input channels and {num_groups} groups!"
    );
    Ok(())
}

impl GroupNormalizationConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<GroupNormalization<B>> {
        check_groups(self.num_channels, self.num_groups)?;

        Ok(GroupNormalization {
            gamma:        self.gamma_initializer.init([self.num_channels], device),
            beta:         self.beta_initializer.init([self.num_channels], device),
            num_groups:   self.num_groups,
            num_channels: self.num_channels,
            epsilon:      self.epsilon,
        })
    }
}

/// `Y = groupnorm(X) * γ + β`
#[derive(Module, Debug)]
pub struct GroupNormalization<B: Backend> {
    pub gamma:        Param<Tensor<B, 1>>,
    pub beta:         Param<Tensor<B, 1>>,
    pub num_groups:   usize,
    pub num_channels: usize,
    pub epsilon:      f64,
}

impl<B: Backend> GroupNormalization<B> {
    /// # Shapes
    ///
    /// - input: `[batch, channels, ...]`
    /// - output: same as input
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let mut affine_shape = [1; D];
        affine_shape[1] = self.num_channels;

        self.normalize(input)
            .mul(self.gamma.val().reshape(affine_shape))
            .add(self.beta.val().reshape(affine_shape))
    }

    /// Steps 1–4 only: the normalised input before γ and β.
    pub fn normalize<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        assert!(D >= 2, "GroupNormalization expects [batch, channels, ...], got rank {}", D);
        let channels = input.dims()[1];
        assert_eq!(
            channels, self.num_channels,
            "GroupNormalization built for {} channels but got {}",
            self.num_channels, channels
        );

        let dims    = input.dims();
        let grouped = group_channels(input, self.num_groups);

        let mean     = grouped.clone().mean_dim(2);
        let centered = grouped.sub(mean);
        let var      = centered.clone().mul(centered.clone()).mean_dim(2);

        let normalized = centered.div(var.add_scalar(self.epsilon).sqrt());
        degroup_channels(normalized, dims)
    }

    /// Σγ² + Σβ², the L2 term for this layer's affine parameters.
    pub fn l2_penalty(&self) -> Tensor<B, 1> {
        let gamma = self.gamma.val();
        let beta  = self.beta.val();
        gamma.clone().mul(gamma).sum() + beta.clone().mul(beta).sum()
    }
}

/// `[N, C, ...]` → `[N, G, (C/G)·prod(...)]`
pub fn group_channels<B: Backend, const D: usize>(input: Tensor<B, D>, num_groups: usize) -> Tensor<B, 3> {
    let dims  = input.dims();
    let batch = dims[0];
    let per_group = dims[1..].iter().product::<usize>() / num_groups;
    input.reshape([batch, num_groups, per_group])
}

/// Inverse of [group_channels].
pub fn degroup_channels<B: Backend, const D: usize>(grouped: Tensor<B, 3>, dims: [usize; D]) -> Tensor<B, D> {
    grouped.reshape(dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::conv::Conv2dConfig;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn values<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().convert::<f32>().to_vec::<f32>().unwrap()
    }

    fn moments(xs: &[f32]) -> (f64, f64) {
        let n    = xs.len() as f64;
        let mean = xs.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var  = xs.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        (mean, var)
    }

    /// Mean/variance of every (example, group) slice of a normalised tensor.
    fn group_moments(t: Tensor<TestBackend, 4>, groups: usize) -> Vec<(f64, f64)> {
        let [n, _, _, _] = t.dims();
        let flat         = values(t);
        let per_group    = flat.len() / (n * groups);
        flat.chunks(per_group).map(moments).collect()
    }

    fn layer(groups: usize, channels: usize) -> GroupNormalization<TestBackend> {
        GroupNormalizationConfig::new(groups, channels)
            .init::<TestBackend>(&Default::default())
            .unwrap()
    }

    #[test]
    fn test_two_images_with_different_group_scales() {
        let device = Default::default();
        // channels 0..2 ~ N(10, 10²), channels 2..4 ~ N(5, 50²)
        let g1 = Tensor::<TestBackend, 4>::random([2, 2, 32, 32], Distribution::Normal(10.0, 10.0), &device);
        let g2 = Tensor::<TestBackend, 4>::random([2, 2, 32, 32], Distribution::Normal(5.0, 50.0), &device);
        let x  = Tensor::cat(vec![g1, g2], 1);

        let out = layer(2, 4).forward(x);
        assert_eq!(out.dims(), [2, 4, 32, 32]);

        let first  = values(out.clone().slice([0..2, 0..2, 0..32, 0..32]));
        let second = values(out.slice([0..2, 2..4, 0..32, 0..32]));
        for group in [first, second] {
            let (mean, var) = moments(&group);
            assert!(mean.abs() < 1e-4, "mean {mean}");
            assert!((var - 1.0).abs() < 1e-3, "var {var}");
        }
    }

    #[test]
    fn test_each_group_is_standardised_independently() {
        let device = Default::default();
        for groups in [1, 2, 4, 8] {
            let x = Tensor::<TestBackend, 4>::random([3, 8, 5, 5], Distribution::Normal(-3.0, 7.0), &device)
                .mul_scalar(4.0)
                .add_scalar(100.0);
            let out = layer(groups, 8).normalize(x);
            for (mean, var) in group_moments(out, groups) {
                assert!(mean.abs() < 1e-4, "G={groups} mean {mean}");
                assert!((var - 1.0).abs() < 1e-3, "G={groups} var {var}");
            }
        }
    }

    #[test]
    fn test_one_group_is_layer_norm() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::random([2, 4, 3, 3], Distribution::Normal(1.0, 2.0), &device);
        let out = values(layer(1, 4).normalize(x.clone()));

        let raw = values(x);
        let per_example = raw.len() / 2;
        for (e, chunk) in raw.chunks(per_example).enumerate() {
            let (mean, var) = moments(chunk);
            for (i, &v) in chunk.iter().enumerate() {
                let expected = (v as f64 - mean) / (var + 1e-5).sqrt();
                assert!((out[e * per_example + i] as f64 - expected).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_one_channel_per_group_is_instance_norm() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::random([2, 3, 4, 4], Distribution::Normal(0.0, 5.0), &device);
        let out = values(layer(3, 3).normalize(x.clone()));

        for (plane_idx, plane) in values(x).chunks(16).enumerate() {
            let (mean, var) = moments(plane);
            for (i, &v) in plane.iter().enumerate() {
                let expected = (v as f64 - mean) / (var + 1e-5).sqrt();
                assert!((out[plane_idx * 16 + i] as f64 - expected).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_indivisible_channels_fail_fast() {
        let err = GroupNormalizationConfig::new(3, 16)
            .init::<TestBackend>(&Default::default())
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("16 input channels"), "{msg}");
        assert!(msg.contains("3 groups"), "{msg}");

        assert!(GroupNormalizationConfig::new(0, 16).init::<TestBackend>(&Default::default()).is_err());
    }

    #[test]
    fn test_group_degroup_round_trip_keeps_channel_order() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1, Int>::arange(0..2 * 6 * 2 * 2, &device)
            .float()
            .reshape([2, 6, 2, 2]);

        let grouped = group_channels(x.clone(), 3);
        assert_eq!(grouped.dims(), [2, 3, 8]);

        // group 1 of example 0 holds exactly channels 2 and 3
        let g = values(grouped.clone().slice([0..1, 1..2, 0..8]));
        let c = values(x.clone().slice([0..1, 2..4, 0..2, 0..2]));
        assert_eq!(g, c);

        let back = degroup_channels(grouped, [2, 6, 2, 2]);
        assert_eq!(values(back), values(x));
    }

    #[test]
    fn test_affine_uses_gamma_and_beta() {
        let device = Default::default();
        let gn = GroupNormalizationConfig::new(2, 4)
            .with_gamma_initializer(Initializer::Zeros)
            .with_beta_initializer(Initializer::Constant { value: 0.5 })
            .init::<TestBackend>(&device)
            .unwrap();
        let x   = Tensor::<TestBackend, 4>::random([1, 4, 3, 3], Distribution::Default, &device);
        let out = values(gn.forward(x));
        assert!(out.iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_composes_with_convolution_and_backprop() {
        type AD = Autodiff<NdArray>;
        let device = Default::default();

        let conv = Conv2dConfig::new([8, 64], [3, 3]).init::<AD>(&device);
        let gn   = GroupNormalizationConfig::new(8, 64).init::<AD>(&device).unwrap();

        let x   = Tensor::<AD, 4>::random([1, 8, 32, 32], Distribution::Default, &device);
        let y   = conv.forward(x);
        let dims = y.dims();
        let out = gn.forward(y);
        assert_eq!(out.dims(), dims);

        let grads = out.sum().backward();
        assert!(gn.gamma.grad(&grads).is_some());
        assert!(gn.beta.grad(&grads).is_some());
    }
}
