// ============================================================
// Layer 6 — Loss Curve Log
// ============================================================
// A JSON companion to results.csv that also keeps the training
// loss of every epoch. Column oriented, one array per field,
// every array the same length:
//
//   {
//     "seed":       [1, 1],
//     "batch_size": [32, 32],
//     "norm":       ["Group Norm", "Batch Norm"],
//     "loss_curve": [[2.1, 1.7, ...], [2.0, 1.6, ...]],
//     "accuracy":   [0.91, 0.92]
//   }
//
// Rewritten in full after every run, through a temp file.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::domain::{norm_kind::NormKind, run_key::RunKey};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossCurves {
    pub seed:       Vec<u64>,
    pub batch_size: Vec<usize>,
    pub norm:       Vec<NormKind>,
    pub loss_curve: Vec<Vec<f64>>,
    pub accuracy:   Vec<f64>,
}

impl LossCurves {
    pub fn len(&self) -> usize {
        self.seed.len()
    }

    pub fn push(&mut self, key: &RunKey, loss_curve: Vec<f64>, accuracy: f64) {
        self.seed.push(key.seed);
        self.batch_size.push(key.batch_size);
        self.norm.push(key.norm);
        self.loss_curve.push(loss_curve);
        self.accuracy.push(accuracy);
    }

    fn check_columns(&self) -> Result<()> {
        let n = self.seed.len();
        ensure!(
            self.batch_size.len() == n
                && self.norm.len() == n
                && self.loss_curve.len() == n
                && self.accuracy.len() == n,
            "columns have different lengths"
        );
        Ok(())
    }
}

pub struct CurveLog {
    path:   PathBuf,
    curves: LossCurves,
}

impl CurveLog {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), curves: LossCurves::default() }
    }

    /// Resume from `path`, or start empty if it is missing or unreadable.
    pub fn load_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let loaded = fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|json| Ok(serde_json::from_str::<LossCurves>(&json)?))
            .and_then(|curves| curves.check_columns().map(|_| curves));

        match loaded {
            Ok(curves) => Self { path, curves },
            Err(e) => {
                tracing::debug!("Starting a fresh loss curve log: {:#}", e);
                Self::empty(path)
            }
        }
    }

    #[cfg(test)]
    pub fn curves(&self) -> &LossCurves {
        &self.curves
    }

    pub fn push(&mut self, key: &RunKey, loss_curve: Vec<f64>, accuracy: f64) {
        self.curves.push(key, loss_curve, accuracy);
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, serde_json::to_string(&self.curves)?)
            .with_context(|| format!("Cannot write '{}'", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Cannot replace '{}'", self.path.display()))?;

        tracing::debug!("Wrote {} loss curves to '{}'", self.curves.len(), self.path.display());
        Ok(())
    }
}
