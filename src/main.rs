use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use tephra_eval::{ResampleTrainer, aggregate};
use tephra_io::{ExperimentName, ReportWriter, ResampleRow, SpatialRow, VolcanoClass, VolcanoReader};
use tephra_prep::{BootstrapConfig, PreprocessConfig};
use tephra_rf::ForestConfig;

#[derive(Parser)]
#[command(name = "tephra")]
#[command(about = "Bootstrap-resampled random forest evaluation for volcano type classification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a volcano classifier over a bootstrap ensemble
    Evaluate {
        /// Path to the volcano records CSV file
        #[arg(long)]
        data: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Number of bootstrap resamples
        #[arg(long, default_value_t = 25)]
        resamples: usize,

        /// Number of trees per random forest
        #[arg(long, default_value_t = 1000)]
        trees: usize,

        /// Minimum relative frequency for a categorical level to survive collapsing
        #[arg(long, default_value_t = 0.05)]
        rare_threshold: f64,

        /// Maximum tree depth (unlimited if not set)
        #[arg(long)]
        max_depth: Option<usize>,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct EvaluateOutput {
    experiment: String,
    n_volcanoes: usize,
    n_resamples: usize,
    n_trees: usize,
    overall_accuracy: f64,
    mean_accuracy: f64,
    std_accuracy: f64,
    mean_auc: Option<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Evaluate {
            data,
            experiment,
            output_dir,
            resamples,
            trees,
            rare_threshold,
            max_depth,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Load the modeling table
            let table = VolcanoReader::new(&data)
                .read()
                .context("failed to read volcano CSV")?;
            let frame = table.frame().context("failed to assemble modeling frame")?;
            let labels = table.label_indices();
            info!(n_volcanoes = table.n_samples(), "modeling table ready");

            // 2. Draw the bootstrap ensemble
            let resample_set = BootstrapConfig::new(resamples)?
                .with_seed(cli.seed)
                .draw(frame.n_rows())
                .context("bootstrap draw failed")?;

            // 3. Train and score every resample
            let preprocess = PreprocessConfig::new().with_rare_threshold(rare_threshold);
            let forest = ForestConfig::new(trees)?
                .with_max_depth(max_depth)
                .with_seed(cli.seed);
            let trainer = ResampleTrainer::new(preprocess, forest, VolcanoClass::ALL.len());

            let outcomes = trainer
                .run(&frame, &labels, &resample_set)
                .context("resample evaluation failed")?;

            // 4. Aggregate metrics
            let report = aggregate(&outcomes, VolcanoClass::ALL.len(), frame.n_rows())
                .context("metric aggregation failed")?;
            info!(
                overall_accuracy = report.overall_accuracy,
                mean_accuracy = report.mean_accuracy,
                "evaluation complete"
            );

            // 5. Full-dataset importance fit
            let importances = trainer
                .importance_run(&frame, &labels)
                .context("importance fit failed")?;

            // 6. Write JSON artifacts
            let writer = ReportWriter::new(&output_dir, experiment_name)?;

            let resample_rows: Vec<ResampleRow> = report
                .per_resample
                .iter()
                .map(|m| ResampleRow {
                    resample_id: m.resample_id,
                    n_holdout: m.n_holdout,
                    accuracy: m.accuracy,
                    precision: m.precision,
                    precision_per_class: m.precision_per_class.clone(),
                    auc: m.auc,
                })
                .collect();
            let class_names: Vec<&str> = VolcanoClass::ALL.iter().map(|c| c.as_str()).collect();
            let importance_rows: Vec<(String, f64, usize)> = importances
                .iter()
                .map(|f| (f.name.clone(), f.importance, f.rank))
                .collect();

            writer.write_evaluation(
                report.overall_accuracy,
                report.mean_accuracy,
                report.std_accuracy,
                report.mean_auc,
                &resample_rows,
                report.confusion.as_rows(),
                &class_names,
                &importance_rows,
            )?;

            let spatial_rows: Vec<SpatialRow> = report
                .spatial
                .iter()
                .map(|s| SpatialRow {
                    volcano_number: table.ids()[s.row].as_str().to_string(),
                    latitude: table.latitude()[s.row],
                    longitude: table.longitude()[s.row],
                    true_class: table.classes()[s.row].as_str().to_string(),
                    n_appearances: s.n_appearances,
                    correct_fraction: s.correct_fraction,
                })
                .collect();
            writer.write_spatial(&spatial_rows)?;

            // 7. Print summary
            let output = EvaluateOutput {
                experiment,
                n_volcanoes: table.n_samples(),
                n_resamples: resamples,
                n_trees: trees,
                overall_accuracy: report.overall_accuracy,
                mean_accuracy: report.mean_accuracy,
                std_accuracy: report.std_accuracy,
                mean_auc: report.mean_auc,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
