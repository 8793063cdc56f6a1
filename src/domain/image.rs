// ============================================================
// Layer 3 — LabeledImage Domain Type
// ============================================================
// One raw benchmark image before any preprocessing.
// Pixels are stored channel-major (CHW): all red values,
// then all green, then all blue, exactly as the CIFAR-10
// binary release lays them out.

use serde::{Deserialize, Serialize};

pub const IMAGE_CHANNELS: usize = 3;
pub const IMAGE_SIDE:     usize = 32;
pub const IMAGE_PIXELS:   usize = IMAGE_SIDE * IMAGE_SIDE;
pub const IMAGE_BYTES:    usize = IMAGE_CHANNELS * IMAGE_PIXELS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledImage {
    /// CHW pixel values, length `IMAGE_BYTES`
    pub pixels: Vec<u8>,

    /// Class index in `0..10`
    pub label: u8,
}

impl LabeledImage {
    pub fn new(pixels: Vec<u8>, label: u8) -> Self {
        Self { pixels, label }
    }

    /// The `IMAGE_PIXELS` values of one colour channel.
    pub fn channel(&self, c: usize) -> &[u8] {
        &self.pixels[c * IMAGE_PIXELS..(c + 1) * IMAGE_PIXELS]
    }
}
