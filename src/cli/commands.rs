// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the four subcommands and their flags:
//
//   train          — run (or resume) the batch size sweep
//   reproduce      — re-evaluate every saved snapshot
//   search-groups  — choose the Group Norm group count
//   plot           — draw error vs batch size from a result CSV
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{
    group_search_use_case::GroupSearchConfig,
    plot_use_case::PlotConfig,
    reproduce_use_case::ReproduceConfig,
    sweep_use_case::SweepConfig,
};
use crate::domain::norm_kind::NormKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train every (seed, batch size, norm) combination not yet in the results
    Train(TrainArgs),

    /// Evaluate every snapshot in the models folder on the test split
    Reproduce(ReproduceArgs),

    /// Compare group counts for Group Norm on held-out training data
    SearchGroups(SearchGroupsArgs),

    /// Plot test error against batch size from a result table
    Plot(PlotArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Discard earlier results and logs and start over
    #[arg(long)]
    pub restart: bool,

    /// Seeds to run, each a full sweep
    #[arg(long, num_args = 1.., default_values_t = [1])]
    pub seeds: Vec<u64>,

    /// Batch sizes, largest first
    #[arg(long, num_args = 1.., default_values_t = [128, 32, 16, 8, 4, 2])]
    pub batch_sizes: Vec<usize>,

    /// Normalization layers to compare ("group", "batch", "GN", "BN")
    #[arg(long, num_args = 1.., default_values_t = NormKind::ALL.to_vec())]
    pub norms: Vec<NormKind>,

    /// Epochs per run; the learning rate drops tenfold every 30
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    /// Group Norm group count; must divide 16, 32 and 64
    #[arg(long, default_value_t = 8)]
    pub groups: usize,

    /// Folder holding the CIFAR-10 binary release
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    #[arg(long, default_value = "results.csv")]
    pub results: String,

    /// JSON table with the per-epoch training loss of each run
    #[arg(long, default_value = "results.json")]
    pub curves: String,

    #[arg(long, default_value = "models")]
    pub models_dir: String,

    #[arg(long, default_value = "logs")]
    pub logs_dir: String,
}

impl From<TrainArgs> for SweepConfig {
    fn from(a: TrainArgs) -> Self {
        SweepConfig {
            data_dir:     a.data_dir,
            results_path: a.results,
            curves_path:  a.curves,
            models_dir:   a.models_dir,
            logs_dir:     a.logs_dir,
            seeds:        a.seeds,
            batch_sizes:  a.batch_sizes,
            norms:        a.norms,
            epochs:       a.epochs,
            num_groups:   a.groups,
            restart:      a.restart,
            ..SweepConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct ReproduceArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    #[arg(long, default_value = "models")]
    pub models_dir: String,

    #[arg(long, default_value = "results_reproduced.csv")]
    pub output: String,

    #[arg(long, default_value = "results_reproduced.svg")]
    pub chart: String,
}

impl From<ReproduceArgs> for ReproduceConfig {
    fn from(a: ReproduceArgs) -> Self {
        ReproduceConfig {
            data_dir:    a.data_dir,
            models_dir:  a.models_dir,
            output_path: a.output,
            chart_path:  a.chart,
        }
    }
}

#[derive(Args, Debug)]
pub struct SearchGroupsArgs {
    /// Group counts to try
    #[arg(long, num_args = 1.., default_values_t = [8, 4, 2])]
    pub candidates: Vec<usize>,

    /// Number of leading training images held out for validation
    #[arg(long, default_value_t = 6000)]
    pub holdout: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 0.1)]
    pub lr: f64,

    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    #[arg(long, default_value = "data")]
    pub data_dir: String,

    #[arg(long, default_value = "hp.json")]
    pub output: String,
}

impl From<SearchGroupsArgs> for GroupSearchConfig {
    fn from(a: SearchGroupsArgs) -> Self {
        GroupSearchConfig {
            data_dir:      a.data_dir,
            output_path:   a.output,
            candidates:    a.candidates,
            holdout:       a.holdout,
            batch_size:    a.batch_size,
            learning_rate: a.lr,
            epochs:        a.epochs,
            seed:          a.seed,
            ..GroupSearchConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct PlotArgs {
    /// Result table to read
    #[arg(long, default_value = "results.csv")]
    pub input: String,

    /// SVG file to write
    #[arg(long, default_value = "results.svg")]
    pub output: String,

    /// Accuracy column (default: accuracy_final, else accuracy)
    #[arg(long)]
    pub column: Option<String>,

    /// Leave out the ±1 std band
    #[arg(long)]
    pub no_std: bool,

    #[arg(long, default_value = "Test error vs batch size")]
    pub title: String,
}

impl From<PlotArgs> for PlotConfig {
    fn from(a: PlotArgs) -> Self {
        PlotConfig {
            input_path:  a.input,
            output_path: a.output,
            column:      a.column,
            with_std:    !a.no_std,
            title:       a.title,
        }
    }
}
