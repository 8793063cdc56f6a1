// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits, not
// against the CIFAR-10 reader or the CSV writer directly:
//   - Cifar10Loader implements ImageSource
//   - SweepRecord / ReproducedRecord implement TabularRecord
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::{image::LabeledImage, run_key::RunKey};

/// Which half of a benchmark to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Any component that can provide labelled images for a split.
pub trait ImageSource {
    fn load_split(&self, split: Split) -> Result<Vec<LabeledImage>>;
}

// ─── TabularRecord ────────────────────────────────────────────────────────────
/// A row of a result table.
///
/// `from_fields` receives the cells ordered like `HEADER`, whatever
/// the column order in the file was. Each row belongs to exactly one
/// run, identified by `key`.
pub trait TabularRecord: Sized {
    /// Column names, in the order rows are written
    const HEADER: &'static [&'static str];

    fn to_fields(&self) -> Vec<String>;

    fn from_fields(fields: &[&str]) -> Result<Self>;

    fn key(&self) -> RunKey;
}
