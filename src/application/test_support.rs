// Shared fixtures for the use case tests.

use anyhow::Result;

use crate::domain::{
    image::{LabeledImage, IMAGE_BYTES},
    traits::{ImageSource, Split},
};

/// A tiny two-class stand-in for CIFAR-10: dark images are class 0,
/// bright images class 1.
pub struct SyntheticSource {
    train: usize,
    test:  usize,
}

impl SyntheticSource {
    pub fn new(train: usize, test: usize) -> Self {
        Self { train, test }
    }

    fn images(n: usize, offset: u8) -> Vec<LabeledImage> {
        (0..n)
            .map(|i| {
                let label = (i % 2) as u8;
                let base  = if label == 0 { 30 } else { 200 };
                LabeledImage::new(vec![base + offset; IMAGE_BYTES], label)
            })
            .collect()
    }
}

impl ImageSource for SyntheticSource {
    fn load_split(&self, split: Split) -> Result<Vec<LabeledImage>> {
        Ok(match split {
            Split::Train => Self::images(self.train, 0),
            Split::Test  => Self::images(self.test, 5),
        })
    }
}
