// ============================================================
// Layer 6 — Epoch Metrics Logger
// ============================================================
// Records one CSV row per epoch of a single run, so learning
// curves can be compared across batch sizes afterwards.
//
// Output file: logs/<RunKey>/metrics.csv
//
// Example:
//   epoch,lr,train_loss,train_acc,val_loss,val_acc
//   1,0.100000,1.912345,0.301200,1.701234,0.381000
//   2,0.100000,1.501234,0.452300,1.450012,0.478000
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "epoch,lr,train_loss,train_acc,val_loss,val_acc";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Learning rate used during this epoch
    pub lr: f64,

    /// Average cross-entropy over all training batches
    pub train_loss: f64,

    /// Fraction of training images classified correctly
    /// (on augmented inputs, in training mode)
    pub train_acc: f64,

    /// Average cross-entropy on the validation set
    pub val_loss: f64,

    /// Fraction of validation images classified correctly
    pub val_acc: f64,
}

/// Appends epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh log in `dir`, replacing any previous one:
    /// a rerun of the same key must not interleave two histories.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create log directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "{HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.lr,
            m.train_loss,
            m.train_acc,
            m.val_loss,
            m.val_acc,
        )?;

        Ok(())
    }

    #[cfg(test)]
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
