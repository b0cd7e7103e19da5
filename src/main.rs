#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::uninlined_format_args)]

mod csv_reader;
mod ml;
mod plot;
mod structs;

use clap::{Parser, Subcommand};
use ml::pipeline::AnalysisConfig;
use std::path::{Path, PathBuf};
use structs::{CsvData, Result};

/// Cluster gene-expression samples and compare them against known subtypes
#[derive(Parser, Debug)]
#[command(name = "exprclust")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cluster samples, score against the outcome labels, render figures
    Analyze {
        /// Expression table: one row per sample, one column per gene
        #[arg(short, long, default_value = "dataset.csv")]
        expression: PathBuf,

        /// Outcome table, joined to the expression table by row position
        #[arg(short, long, default_value = "outcome.csv")]
        outcome: PathBuf,

        /// Outcome column holding the known category
        #[arg(long, default_value = "BRCA_subtype")]
        label_column: String,

        /// Comma-separated genes to cluster on (default: built-in breast cancer panel)
        #[arg(long, value_delimiter = ',')]
        genes: Vec<String>,

        /// Number of clusters for K-means
        #[arg(short = 'k', long, default_value = "5")]
        clusters: usize,

        /// K-means restarts; the best inertia wins
        #[arg(long, default_value = "1")]
        n_init: usize,

        /// Maximum K-means iterations per restart
        #[arg(long, default_value = "300")]
        max_iter: u64,

        /// Seed for clustering and heatmap shuffling (random if omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Cluster on the genes only, without the encoded outcome column
        #[arg(long)]
        exclude_label: bool,

        /// Scatter on the first two principal components
        #[arg(long)]
        pca: bool,

        /// Output directory for figures and result files
        #[arg(long, default_value = "./figures")]
        output_dir: PathBuf,

        /// Treat inputs as TSV instead of CSV
        #[arg(long)]
        tsv: bool,
    },

    /// Report missing and zero counts for the selected genes
    Profile {
        /// Expression table
        #[arg(short, long, default_value = "dataset.csv")]
        expression: PathBuf,

        /// Comma-separated genes to profile (default: built-in breast cancer panel)
        #[arg(long, value_delimiter = ',')]
        genes: Vec<String>,

        /// Output directory for profile.json
        #[arg(long, default_value = "./figures")]
        output_dir: PathBuf,

        /// Treat input as TSV instead of CSV
        #[arg(long)]
        tsv: bool,
    },
}

/// Input tables and column choices for one analyze run
#[derive(Debug)]
struct Inputs {
    expression: PathBuf,
    outcome: PathBuf,
    label_column: String,
    genes: Vec<String>,
    tsv: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Analyze {
            expression,
            outcome,
            label_column,
            genes,
            clusters,
            n_init,
            max_iter,
            seed,
            exclude_label,
            pca,
            output_dir,
            tsv,
        }) => {
            let seed = seed.unwrap_or_else(|| {
                let generated: u64 = rand::random();
                log::info!("No --seed given, using {generated}");
                generated
            });
            let inputs = Inputs {
                expression,
                outcome,
                label_column,
                genes,
                tsv,
            };
            let config = AnalysisConfig {
                clusters,
                n_init,
                max_iter,
                seed,
                include_label: !exclude_label,
                pca,
            };
            let [silhouette, ari] = run_analyze(&inputs, &config, &output_dir)?;
            println!("{silhouette}");
            println!("{ari}");
            Ok(())
        }

        Some(Commands::Profile {
            expression,
            genes,
            output_dir,
            tsv,
        }) => run_profile(&expression, &genes, &output_dir, tsv),

        None => {
            eprintln!("No subcommand provided. Use 'exprclust analyze' or 'exprclust profile'.");
            eprintln!("Run 'exprclust --help' for usage information.");
            std::process::exit(1);
        }
    }
}

fn requested_genes(genes: &[String]) -> Vec<String> {
    if genes.is_empty() {
        ml::features::default_genes()
    } else {
        genes.to_vec()
    }
}

/// Run the analysis phase, returning the two metric lines for stdout
fn run_analyze(inputs: &Inputs, config: &AnalysisConfig, output_dir: &Path) -> Result<[String; 2]> {
    let expression = CsvData::from_file(&inputs.expression, inputs.tsv)?;
    log::info!(
        "Loaded {}: {} rows x {} columns",
        inputs.expression.display(),
        expression.row_count(),
        expression.col_count()
    );
    let outcome = CsvData::from_file(&inputs.outcome, inputs.tsv)?;
    log::info!(
        "Loaded {}: {} rows x {} columns",
        inputs.outcome.display(),
        outcome.row_count(),
        outcome.col_count()
    );
    std::fs::create_dir_all(output_dir)?;

    let genes = requested_genes(&inputs.genes);
    let columns = ml::features::select_columns(&expression, &genes)?;
    let table = ml::features::join_outcome(&expression, &columns, &outcome, &inputs.label_column)?;

    log::info!(
        "Running analysis pipeline (k={}, n_init={}, seed={})",
        config.clusters,
        config.n_init,
        config.seed
    );
    let result = ml::pipeline::run_pipeline(&table, config)?;

    let figures = plot::render_figures(output_dir, &result)?;

    let summary = ml::output::build_summary(
        &inputs.expression,
        &inputs.outcome,
        &expression,
        &inputs.label_column,
        &table,
        config,
        &result,
        figures,
    );
    ml::output::write_summary(output_dir, &summary)?;
    ml::output::write_clusters(output_dir, &table, &result)?;

    log::info!("Output written to {}", output_dir.display());
    for file in summary
        .figures
        .iter()
        .map(String::as_str)
        .chain([ml::output::SUMMARY_FILE, ml::output::CLUSTERS_FILE])
    {
        log::info!("  - {file}");
    }

    Ok(ml::output::metric_lines(result.silhouette, result.ari))
}

/// Run the data-quality profile
fn run_profile(expression_path: &Path, genes: &[String], output_dir: &Path, tsv: bool) -> Result<()> {
    let expression = CsvData::from_file(expression_path, tsv)?;
    log::info!(
        "Profiling {}: {} rows x {} columns",
        expression_path.display(),
        expression.row_count(),
        expression.col_count()
    );

    let columns = ml::features::select_columns(&expression, &requested_genes(genes))?;
    let profiles = ml::stats::profile_columns(&expression, &columns)?;
    std::fs::create_dir_all(output_dir)?;

    let with_missing = profiles.iter().filter(|p| p.missing > 0).count();
    let with_zeros = profiles.iter().filter(|p| p.zeros > 0).count();
    log::info!(
        "{} genes profiled: {with_missing} with missing values, {with_zeros} with zeros",
        profiles.len()
    );

    ml::output::write_profile(output_dir, &profiles)?;
    log::info!(
        "Output written to {}",
        output_dir.join(ml::output::PROFILE_FILE).display()
    );
    Ok(())
}
