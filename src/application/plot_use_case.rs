// ============================================================
// Layer 2 — PlotUseCase
// ============================================================
// Turns a result table into the error-vs-batch-size chart.
//
// Works on both tables: the accuracy column is picked by name,
// `accuracy_final` for results.csv and `accuracy` for
// results_reproduced.csv, unless one is given explicitly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::domain::norm_kind::NormKind;
use crate::infra::{
    chart::{render_error_chart, write_chart, ChartPoint},
    results::CsvColumns,
};

/// Accuracy columns tried in order when none is requested.
const ACCURACY_COLUMNS: [&str; 2] = ["accuracy_final", "accuracy"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    pub input_path:  String,
    pub output_path: String,
    pub column:      Option<String>,
    pub with_std:    bool,
    pub title:       String,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            input_path:  "results.csv".to_string(),
            output_path: "results.svg".to_string(),
            column:      None,
            with_std:    true,
            title:       "Test error vs batch size".to_string(),
        }
    }
}

pub struct PlotUseCase {
    config: PlotConfig,
}

impl PlotUseCase {
    pub fn new(config: PlotConfig) -> Self {
        Self { config }
    }

    /// Render the chart and return the number of plotted rows.
    pub fn execute(&self) -> Result<usize> {
        let cfg  = &self.config;
        let text = fs::read_to_string(&cfg.input_path)
            .with_context(|| format!("Cannot read result table '{}'", cfg.input_path))?;
        let points = read_points(&text, cfg.column.as_deref())
            .with_context(|| format!("Cannot plot '{}'", cfg.input_path))?;

        let svg = render_error_chart(&points, cfg.with_std, &cfg.title)?;
        write_chart(Path::new(&cfg.output_path), &svg)?;

        tracing::info!("Plotted {} rows to '{}'", points.len(), cfg.output_path);
        Ok(points.len())
    }
}

/// Parse (norm, batch size, accuracy) from every row of a CSV table.
pub fn read_points(text: &str, column: Option<&str>) -> Result<Vec<ChartPoint>> {
    let table = CsvColumns::parse(text)?;

    let accuracy = match column {
        Some(c) => c,
        None => ACCURACY_COLUMNS
            .iter()
            .copied()
            .find(|c| table.has_column(c))
            .with_context(|| format!("no accuracy column, expected one of {ACCURACY_COLUMNS:?}"))?,
    };

    let rows = table.select(&["norm", "batch_size", accuracy])?;
    rows.iter()
        .enumerate()
        .map(|(i, cells)| {
            Ok(ChartPoint {
                norm:       cells[0].parse::<NormKind>()?,
                batch_size: cells[1]
                    .parse::<f64>()
                    .with_context(|| format!("row {}: invalid batch size", i + 1))? as usize,
                accuracy:   cells[2]
                    .parse::<f64>()
                    .with_context(|| format!("row {}: invalid accuracy", i + 1))?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SWEEP: &str = "\
seed,batch_size,norm,accuracy_final,accuracy_5
1,32,Group Norm,0.91,0.90
1,32,Batch Norm,0.92,0.91
1,2,Group Norm,0.90,0.89
1,2,Batch Norm,0.60,0.58
";

    #[test]
    fn test_picks_accuracy_final_by_default() {
        let points = read_points(SWEEP, None).unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[3].norm, NormKind::Batch);
        assert!((points[3].accuracy - 0.60).abs() < 1e-12);
    }

    #[test]
    fn test_explicit_column_and_index_column() {
        let text   = ",seed,batch_size,norm,accuracy\n0,1.0,8.0,Group Norm,0.8\n";
        let points = read_points(text, Some("accuracy")).unwrap();
        assert_eq!(points[0].batch_size, 8);

        assert!(read_points(SWEEP, Some("accuracy")).is_err());
    }

    #[test]
    fn test_quoted_cells_are_read() {
        let text   = "\"seed\",\"batch_size\",\"norm\",\"accuracy\"\n1,4,\"Batch Norm\",0.75\n";
        let points = read_points(text, None).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].norm, NormKind::Batch);
        assert_eq!(points[0].batch_size, 4);
    }

    #[test]
    fn test_execute_writes_svg() {
        let tmp   = tempfile::tempdir().unwrap();
        let input = tmp.path().join("results.csv");
        fs::write(&input, SWEEP).unwrap();

        let cfg = PlotConfig {
            input_path:  input.to_string_lossy().into_owned(),
            output_path: tmp.path().join("out/results.svg").to_string_lossy().into_owned(),
            ..PlotConfig::default()
        };
        assert_eq!(PlotUseCase::new(cfg.clone()).execute().unwrap(), 4);
        let svg = fs::read_to_string(&cfg.output_path).unwrap();
        assert!(svg.contains("Group Norm") && svg.contains("batch size"));
    }
}
