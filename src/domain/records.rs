// ============================================================
// Layer 3 — Result Records
// ============================================================
// Rows of the two result tables:
//
//   results.csv            ← one SweepRecord per trained run
//     seed,batch_size,norm,accuracy_final,accuracy_5
//
//   results_reproduced.csv ← one ReproducedRecord per snapshot
//     seed,batch_size,norm,accuracy
//
// accuracy_5 is the mean validation accuracy of the final five
// epochs; accuracy_final is the accuracy after the last epoch.
// A reproduced row only has the final accuracy, since only the
// final weights are kept on disk.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{norm_kind::NormKind, run_key::RunKey, traits::TabularRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    pub seed:           u64,
    pub batch_size:     usize,
    pub norm:           NormKind,
    pub accuracy_final: f64,
    pub accuracy_5:     f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReproducedRecord {
    pub seed:       u64,
    pub batch_size: usize,
    pub norm:       NormKind,
    pub accuracy:   f64,
}

fn parse_key_fields(seed: &str, batch_size: &str, norm: &str) -> Result<(u64, usize, NormKind)> {
    // pandas writes integer columns of float frames as "1.0"
    let seed = seed.trim().parse::<f64>()
        .with_context(|| format!("invalid seed '{seed}'"))? as u64;
    let batch_size = batch_size.trim().parse::<f64>()
        .with_context(|| format!("invalid batch size '{batch_size}'"))? as usize;
    let norm = norm.parse::<NormKind>()?;
    Ok((seed, batch_size, norm))
}

fn parse_accuracy(cell: &str) -> Result<f64> {
    cell.trim()
        .parse::<f64>()
        .with_context(|| format!("invalid accuracy '{cell}'"))
}

impl TabularRecord for SweepRecord {
    const HEADER: &'static [&'static str] =
        &["seed", "batch_size", "norm", "accuracy_final", "accuracy_5"];

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.seed.to_string(),
            self.batch_size.to_string(),
            self.norm.label().to_string(),
            format!("{:.6}", self.accuracy_final),
            format!("{:.6}", self.accuracy_5),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self> {
        let (seed, batch_size, norm) = parse_key_fields(fields[0], fields[1], fields[2])?;
        Ok(Self {
            seed,
            batch_size,
            norm,
            accuracy_final: parse_accuracy(fields[3])?,
            accuracy_5:     parse_accuracy(fields[4])?,
        })
    }

    fn key(&self) -> RunKey {
        RunKey::new(self.batch_size, self.norm, self.seed)
    }
}

impl TabularRecord for ReproducedRecord {
    const HEADER: &'static [&'static str] = &["seed", "batch_size", "norm", "accuracy"];

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.seed.to_string(),
            self.batch_size.to_string(),
            self.norm.label().to_string(),
            format!("{:.6}", self.accuracy),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self> {
        let (seed, batch_size, norm) = parse_key_fields(fields[0], fields[1], fields[2])?;
        Ok(Self { seed, batch_size, norm, accuracy: parse_accuracy(fields[3])? })
    }

    fn key(&self) -> RunKey {
        RunKey::new(self.batch_size, self.norm, self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_record_fields() {
        let r = SweepRecord {
            seed: 1, batch_size: 32, norm: NormKind::Group,
            accuracy_final: 0.91, accuracy_5: 0.905,
        };
        assert_eq!(r.to_fields(), vec!["1", "32", "Group Norm", "0.910000", "0.905000"]);
        assert_eq!(r.key().to_string(), "BS32-GN-S1");
    }

    #[test]
    fn test_accepts_pandas_float_integers() {
        let r = ReproducedRecord::from_fields(&["1.0", "128.0", "Batch Norm", "0.87"]).unwrap();
        assert_eq!(r.seed, 1);
        assert_eq!(r.batch_size, 128);
        assert_eq!(r.norm, NormKind::Batch);
        assert!((r.accuracy - 0.87).abs() < 1e-12);
    }

    #[test]
    fn test_bad_accuracy_is_an_error() {
        assert!(ReproducedRecord::from_fields(&["1", "2", "GN", "n/a"]).is_err());
    }
}
