// ============================================================
// Layer 4 — Image Dataset
// ============================================================
// Implements Burn's Dataset trait so the DataLoader can call
// .get(index) and .len() on the decoded CIFAR-10 images.
//
// Reference: Burn Book §4 (Datasets)

use std::sync::Arc;

use burn::data::dataset::Dataset;

use crate::domain::image::LabeledImage;

/// Images shared behind an `Arc` so every run of a sweep can
/// hand the same 50 000 images to a fresh DataLoader without
/// copying them.
#[derive(Clone)]
pub struct ImageDataset {
    images: Arc<Vec<LabeledImage>>,
}

impl ImageDataset {
    pub fn new(images: Vec<LabeledImage>) -> Self {
        Self { images: Arc::new(images) }
    }

    pub fn images(&self) -> &[LabeledImage] {
        &self.images
    }
}

impl Dataset<LabeledImage> for ImageDataset {
    fn get(&self, index: usize) -> Option<LabeledImage> {
        self.images.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}
