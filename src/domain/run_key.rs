// ============================================================
// Layer 3 — RunKey Domain Type
// ============================================================
// One sweep run is identified by (batch size, norm, seed).
// The key doubles as the snapshot folder name and the
// metrics log folder name:
//
//   BS32-GN-S1   ← batch size 32, Group Norm, seed 1
//   BS128-BN-S42 ← batch size 128, Batch Norm, seed 42
//
// The reproduce step walks the snapshot directory and parses
// folder names back into keys, so Display and FromStr must
// round-trip exactly.

use std::{fmt, str::FromStr};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::domain::norm_kind::NormKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunKey {
    pub batch_size: usize,
    pub norm:       NormKind,
    pub seed:       u64,
}

impl RunKey {
    pub fn new(batch_size: usize, norm: NormKind, seed: u64) -> Self {
        Self { batch_size, norm, seed }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BS{}-{}-S{}", self.batch_size, self.norm.short_code(), self.seed)
    }
}

impl FromStr for RunKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let malformed = || anyhow!("malformed run key '{s}', expected BS<batch>-<GN|BN>-S<seed>");

        let mut parts = s.split('-');
        let (bs, norm, seed) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(bs), Some(norm), Some(seed), None) => (bs, norm, seed),
            _ => return Err(malformed()),
        };

        let batch_size = bs
            .strip_prefix("BS")
            .ok_or_else(malformed)?
            .parse::<usize>()
            .with_context(|| format!("bad batch size in run key '{s}'"))?;
        let norm = match norm {
            "GN" => NormKind::Group,
            "BN" => NormKind::Batch,
            _ => return Err(malformed()),
        };
        let seed = seed
            .strip_prefix('S')
            .ok_or_else(malformed)?
            .parse::<u64>()
            .with_context(|| format!("bad seed in run key '{s}'"))?;

        Ok(Self { batch_size, norm, seed })
    }
}
