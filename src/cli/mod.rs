// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands each subcommand
// to its use case in Layer 2. Summaries are printed here; the
// use cases only log.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PlotArgs, ReproduceArgs, SearchGroupsArgs, TrainArgs};

use crate::application::{
    group_search_use_case::GroupSearchUseCase,
    plot_use_case::PlotUseCase,
    reproduce_use_case::ReproduceUseCase,
    sweep_use_case::SweepUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "group-norm-study",
    version = "0.1.0",
    about = "Compare Group Normalization and Batch Normalization across batch sizes on CIFAR-10."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)        => run_train(args),
            Commands::Reproduce(args)    => run_reproduce(args),
            Commands::SearchGroups(args) => run_search_groups(args),
            Commands::Plot(args)         => run_plot(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting sweep on CIFAR-10 in: {}", args.data_dir);
    let results = args.results.clone();

    let summary = SweepUseCase::new(args.into()).execute()?;
    println!(
        "Sweep complete: {} trained, {} skipped. Results in '{}'.",
        summary.trained.len(),
        summary.skipped.len(),
        results
    );
    Ok(())
}

fn run_reproduce(args: ReproduceArgs) -> Result<()> {
    let output = args.output.clone();
    let chart  = args.chart.clone();

    let rows = ReproduceUseCase::new(args.into()).execute()?;
    println!("Re-evaluated {} snapshots into '{}', chart at '{}'.", rows.len(), output, chart);
    Ok(())
}

fn run_search_groups(args: SearchGroupsArgs) -> Result<()> {
    let result = GroupSearchUseCase::new(args.into()).execute()?;

    println!("----------------------------");
    println!("Optimization Results:");
    println!("groups: validation accuracy");
    println!("----------------------------");
    for (g, acc) in result.group_size.iter().zip(&result.accuracy) {
        println!("{g}: {acc:.4}");
    }
    if let Some((g, acc)) = result.best() {
        println!("best: {g} groups ({acc:.4})");
    }
    Ok(())
}

fn run_plot(args: PlotArgs) -> Result<()> {
    let output = args.output.clone();
    let rows   = PlotUseCase::new(args.into()).execute()?;
    println!("Plotted {rows} rows to '{output}'.");
    Ok(())
}
