// ============================================================
// Layer 3 — NormKind Domain Type
// ============================================================
// The two normalization layers compared by the study.
//
// Each kind has two spellings:
//   - a human label used in result tables and chart legends
//     ("Group Norm", "Batch Norm")
//   - a short code used in snapshot folder names ("GN", "BN")

use std::{fmt, str::FromStr};

use anyhow::bail;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NormKind {
    #[serde(rename = "Group Norm")]
    Group,
    #[serde(rename = "Batch Norm")]
    Batch,
}

impl NormKind {
    /// Both kinds in sweep order.
    pub const ALL: [NormKind; 2] = [NormKind::Group, NormKind::Batch];

    pub fn label(self) -> &'static str {
        match self {
            NormKind::Group => "Group Norm",
            NormKind::Batch => "Batch Norm",
        }
    }

    pub fn short_code(self) -> &'static str {
        match self {
            NormKind::Group => "GN",
            NormKind::Batch => "BN",
        }
    }
}

impl fmt::Display for NormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts the label, the short code, or a lowercase word
/// (`group` / `batch`) so CLI flags and CSV cells share one parser.
impl FromStr for NormKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim() {
            "Group Norm" | "GN" | "group" => Ok(NormKind::Group),
            "Batch Norm" | "BN" | "batch" => Ok(NormKind::Batch),
            other => bail!("unknown normalization kind '{other}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_spellings() {
        for kind in NormKind::ALL {
            assert_eq!(kind.label().parse::<NormKind>().unwrap(), kind);
            assert_eq!(kind.short_code().parse::<NormKind>().unwrap(), kind);
        }
        assert_eq!("group".parse::<NormKind>().unwrap(), NormKind::Group);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = "Layer Norm".parse::<NormKind>().unwrap_err();
        assert!(err.to_string().contains("Layer Norm"));
    }
}
