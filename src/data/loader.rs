// ============================================================
// Layer 4 — CIFAR-10 Loader
// ============================================================
// Reads the CIFAR-10 "binary version" release from disk.
//
// Layout of the release:
//   cifar-10-batches-bin/
//     data_batch_1.bin … data_batch_5.bin   ← 50 000 training images
//     test_batch.bin                        ← 10 000 test images
//
// Every file is a flat sequence of 3073-byte records:
//   [label: u8][red: 1024 × u8][green: 1024 × u8][blue: 1024 × u8]
//
// so each record is already in the CHW order our batcher wants
// and no transposition is needed.
//
// The archive is not downloaded here. Fetch and unpack
// https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz
// and point --data-dir at the result.

use anyhow::{bail, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::image::{LabeledImage, IMAGE_BYTES};
use crate::domain::traits::{ImageSource, Split};

pub const NUM_CLASSES: usize = 10;

const RECORD_BYTES: usize = 1 + IMAGE_BYTES;
const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const TEST_FILES: [&str; 1] = ["test_batch.bin"];

/// Loads CIFAR-10 batch files from a directory.
/// Implements the ImageSource trait from Layer 3.
pub struct Cifar10Loader {
    root: PathBuf,
}

impl Cifar10Loader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Accept either the unpacked folder itself or its parent.
    fn batches_dir(&self) -> PathBuf {
        let nested = self.root.join("cifar-10-batches-bin");
        if nested.is_dir() { nested } else { self.root.clone() }
    }
}

impl ImageSource for Cifar10Loader {
    fn load_split(&self, split: Split) -> Result<Vec<LabeledImage>> {
        let dir   = self.batches_dir();
        let files: &[&str] = match split {
            Split::Train => &TRAIN_FILES,
            Split::Test  => &TEST_FILES,
        };

        let mut images = Vec::new();
        for file in files {
            let path  = dir.join(file);
            let batch = read_batch_file(&path)?;
            tracing::debug!("Read {} images from '{}'", batch.len(), path.display());
            images.extend(batch);
        }

        tracing::info!("Loaded {} {:?} images from '{}'", images.len(), split, dir.display());
        Ok(images)
    }
}

fn read_batch_file(path: &Path) -> Result<Vec<LabeledImage>> {
    let bytes = fs::read(path).with_context(|| {
        format!(
            "Cannot read CIFAR-10 batch '{}'. Has the binary release been unpacked there?",
            path.display()
        )
    })?;
    parse_records(&bytes).with_context(|| format!("Corrupt CIFAR-10 batch '{}'", path.display()))
}

/// Split a raw batch buffer into labelled images.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<LabeledImage>> {
    if bytes.len() % RECORD_BYTES != 0 {
        bail!(
            "file size {} is not a multiple of the {}-byte record size",
            bytes.len(),
            RECORD_BYTES
        );
    }

    bytes
        .chunks_exact(RECORD_BYTES)
        .enumerate()
        .map(|(i, record)| {
            let label = record[0];
            if label as usize >= NUM_CLASSES {
                bail!("record {i} has label {label}, expected 0..{NUM_CLASSES}");
            }
            Ok(LabeledImage::new(record[1..].to_vec(), label))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: u8, fill: u8) -> Vec<u8> {
        let mut r = vec![label];
        r.extend(std::iter::repeat(fill).take(IMAGE_BYTES));
        r
    }

    #[test]
    fn test_parse_two_records() {
        let mut bytes = record(3, 7);
        bytes.extend(record(9, 200));

        let images = parse_records(&bytes).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].label, 3);
        assert_eq!(images[1].label, 9);
        assert_eq!(images[1].pixels.len(), IMAGE_BYTES);
        assert!(images[1].pixels.iter().all(|&p| p == 200));
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let mut bytes = record(1, 0);
        bytes.pop();
        let err = parse_records(&bytes).unwrap_err();
        assert!(err.to_string().contains("not a multiple"));
    }

    #[test]
    fn test_label_out_of_range() {
        assert!(parse_records(&record(10, 0)).is_err());
    }

    #[test]
    fn test_loads_test_split_from_nested_dir() {
        let tmp    = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("cifar-10-batches-bin");
        fs::create_dir_all(&nested).unwrap();
        let mut bytes = record(0, 1);
        bytes.extend(record(5, 2));
        fs::write(nested.join("test_batch.bin"), bytes).unwrap();

        let images = Cifar10Loader::new(tmp.path()).load_split(Split::Test).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[1].label, 5);
    }

    #[test]
    fn test_missing_files_propagate_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Cifar10Loader::new(tmp.path()).load_split(Split::Train).unwrap_err();
        assert!(format!("{err:#}").contains("data_batch_1.bin"));
    }
}
