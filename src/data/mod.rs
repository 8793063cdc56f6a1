// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the CIFAR-10 files on disk to device-ready
// tensor batches.
//
//   *.bin batch files
//       │
//       ▼
//   Cifar10Loader     → parses records into LabeledImage
//       │
//       ▼
//   ChannelStats      → per-channel mean/std from the training split
//       │
//       ▼
//   ImageDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher      → standardise (+ pad/flip/crop when training)
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the CIFAR-10 binary release
pub mod loader;

/// Per-channel input standardisation
pub mod preprocessor;

/// Pad / flip / crop training augmentation
pub mod augment;

/// Implements Burn's Dataset trait for labelled images
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Deterministic train/validation holdout
pub mod splitter;
