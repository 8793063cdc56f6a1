// ============================================================
// Layer 4 — Training Augmentation
// ============================================================
// The standard ResNet-on-CIFAR augmentation:
//
//   1. pad 4 pixels of zeros on every side   (32×32 → 40×40)
//   2. flip horizontally with probability ½
//   3. take a random 32×32 crop of the padded image
//
// Padding happens after standardisation, so the border is the
// channel mean rather than black. The three steps are fused into
// a single gather: each output pixel is looked up directly in
// the unpadded source, and anything outside it reads as zero.
//
// Reference: He et al. (2016) Deep Residual Learning, §4.2

use rand::Rng;

use crate::domain::image::{IMAGE_CHANNELS, IMAGE_PIXELS, IMAGE_SIDE};

pub const PAD: usize = 4;
const PADDED_SIDE: usize = IMAGE_SIDE + 2 * PAD;

/// Where to crop the padded image and whether to mirror it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub offset_y: usize,
    pub offset_x: usize,
    pub flip:     bool,
}

impl CropWindow {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            offset_y: rng.gen_range(0..=2 * PAD),
            offset_x: rng.gen_range(0..=2 * PAD),
            flip:     rng.gen_bool(0.5),
        }
    }
}

/// Apply pad → flip → crop to a standardised CHW image.
pub fn pad_flip_crop(src: &[f32], window: CropWindow) -> Vec<f32> {
    debug_assert_eq!(src.len(), IMAGE_CHANNELS * IMAGE_PIXELS);

    let mut out = vec![0.0f32; src.len()];
    for c in 0..IMAGE_CHANNELS {
        let plane = &src[c * IMAGE_PIXELS..(c + 1) * IMAGE_PIXELS];
        let dst   = &mut out[c * IMAGE_PIXELS..(c + 1) * IMAGE_PIXELS];

        for y in 0..IMAGE_SIDE {
            // row in padded coordinates, then back to source coordinates
            let py = y + window.offset_y;
            if py < PAD || py >= PAD + IMAGE_SIDE {
                continue;
            }
            let sy = py - PAD;

            for x in 0..IMAGE_SIDE {
                let mut px = x + window.offset_x;
                if window.flip {
                    px = PADDED_SIDE - 1 - px;
                }
                if px < PAD || px >= PAD + IMAGE_SIDE {
                    continue;
                }
                dst[y * IMAGE_SIDE + x] = plane[sy * IMAGE_SIDE + (px - PAD)];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    /// Centre crop, no flip.
    const IDENTITY: CropWindow = CropWindow { offset_y: PAD, offset_x: PAD, flip: false };

    fn ramp() -> Vec<f32> {
        (0..IMAGE_CHANNELS * IMAGE_PIXELS).map(|i| i as f32 + 1.0).collect()
    }

    #[test]
    fn test_identity_window_is_a_no_op() {
        let src = ramp();
        assert_eq!(pad_flip_crop(&src, IDENTITY), src);
    }

    #[test]
    fn test_flip_mirrors_each_row() {
        let src = ramp();
        let out = pad_flip_crop(&src, CropWindow { flip: true, ..IDENTITY });
        for c in 0..IMAGE_CHANNELS {
            for y in 0..IMAGE_SIDE {
                for x in 0..IMAGE_SIDE {
                    let o = c * IMAGE_PIXELS + y * IMAGE_SIDE + x;
                    let s = c * IMAGE_PIXELS + y * IMAGE_SIDE + (IMAGE_SIDE - 1 - x);
                    assert_eq!(out[o], src[s]);
                }
            }
        }
    }

    #[test]
    fn test_corner_crop_shifts_in_zero_padding() {
        let src = ramp();
        let out = pad_flip_crop(&src, CropWindow { offset_y: 0, offset_x: 0, flip: false });
        // top-left PAD×PAD corner comes from the padding
        assert_eq!(out[0], 0.0);
        assert_eq!(out[(PAD - 1) * IMAGE_SIDE + PAD - 1], 0.0);
        // pixel (PAD, PAD) is the source origin
        assert_eq!(out[PAD * IMAGE_SIDE + PAD], src[0]);
    }

    #[test]
    fn test_random_windows_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let w = CropWindow::random(&mut rng);
            assert!(w.offset_y <= 2 * PAD && w.offset_x <= 2 * PAD);
        }
    }
}
