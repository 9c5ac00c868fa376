use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use kmeans_compress::{
    requests_from_dir, CompressionOutcome, CompressionRecord, Config, Pipeline, RunStore,
    SqliteRunStore, Termination, UploadValidator,
};

/// Lossy image compression by k-means colour quantization
#[derive(Parser)]
#[command(name = "kmeans-compress")]
#[command(version)]
#[command(about = "Reduce an image to k colours and keep a log of every run")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// SQLite file for run history (overrides KMC_DB_PATH)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Directory for uploads and outputs (overrides KMC_UPLOAD_DIR)
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct FitArgs {
    /// Number of colours to keep
    #[arg(short, long)]
    k: usize,

    /// Fixed seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Upper bound on k-means iterations
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Centroid movement treated as converged
    #[arg(long)]
    tolerance: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a single image
    Compress {
        image: PathBuf,

        #[command(flatten)]
        fit: FitArgs,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compress every supported image under a directory
    Batch {
        dir: PathBuf,

        #[command(flatten)]
        fit: FitArgs,
    },
    /// Show the most recent runs
    List {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Show one run by id
    Show { id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env();

    let filter = match cli.verbose {
        0 => EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_target(false).compact().init();

    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(dir) = cli.upload_dir {
        config.upload_dir = dir;
    }

    match cli.command {
        Commands::Compress { image, fit, json } => {
            apply_fit_args(&mut config, &fit);
            let pipeline = open_pipeline(&config)?;
            run_compress(&pipeline, &image, fit.k, json)
        }
        Commands::Batch { dir, fit } => {
            apply_fit_args(&mut config, &fit);
            let pipeline = open_pipeline(&config)?;
            run_batch(&pipeline, &dir, fit.k)
        }
        Commands::List { limit } => {
            let store = SqliteRunStore::open(&config.db_path)?;
            let runs = store.recent_runs(limit)?;
            if runs.is_empty() {
                println!("No compression runs yet.");
            }
            for run in runs {
                println!(
                    "{}  {}  k={:<3} {:>9.3} KB -> {:>9.3} KB  ({}x)  {}",
                    run.created_at.format("%Y-%m-%d %H:%M:%S"),
                    run.id,
                    run.k,
                    run.original_size_kb,
                    run.compressed_size_kb,
                    run.reduced_by,
                    run.compressed_file
                );
            }
            Ok(())
        }
        Commands::Show { id } => {
            let store = SqliteRunStore::open(&config.db_path)?;
            match store.get_run(&id)? {
                Some(run) => {
                    print_record(&run);
                    Ok(())
                }
                None => bail!("No compression run with id {}", id),
            }
        }
    }
}

fn apply_fit_args(config: &mut Config, args: &FitArgs) {
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    if let Some(tolerance) = args.tolerance {
        config.tolerance = tolerance;
    }
}

fn open_pipeline(config: &Config) -> Result<Pipeline<SqliteRunStore>> {
    let store = SqliteRunStore::open(&config.db_path)?;
    Ok(Pipeline::new(config, store))
}

fn run_compress(
    pipeline: &Pipeline<SqliteRunStore>,
    image: &Path,
    k: usize,
    json: bool,
) -> Result<()> {
    let start = Instant::now();
    let bytes = fs::read(image).context(format!("Failed to read {}", image.display()))?;
    let name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let outcome = pipeline.compress(&name, &bytes, k)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialize result")?
        );
    } else {
        print_outcome(&name, &outcome);
        println!("  Took:        {:.2}s", start.elapsed().as_secs_f64());
    }
    Ok(())
}

fn run_batch(pipeline: &Pipeline<SqliteRunStore>, dir: &Path, k: usize) -> Result<()> {
    let start = Instant::now();
    let requests = requests_from_dir(dir, k, &UploadValidator::new())?;

    if requests.is_empty() {
        warn!(dir = %dir.display(), "No supported images found");
        return Ok(());
    }

    info!(count = requests.len(), k, "Compressing batch");
    let results = pipeline.compress_many(&requests);

    let mut failed = 0;
    for (req, result) in requests.iter().zip(results.iter()) {
        match result {
            Ok(outcome) => println!(
                "✓ {} -> {} ({}x)",
                req.file_name, outcome.record.compressed_file, outcome.record.reduced_by
            ),
            Err(e) => {
                failed += 1;
                println!("✗ {}: {:#}", req.file_name, e);
            }
        }
    }

    println!(
        "\n{} of {} images compressed [{:.2}s]",
        requests.len() - failed,
        requests.len(),
        start.elapsed().as_secs_f64()
    );

    if failed > 0 {
        bail!("{} of {} images failed", failed, requests.len());
    }
    Ok(())
}

fn print_outcome(name: &str, outcome: &CompressionOutcome) {
    println!(
        "✓ Compressed {} ({}x{}) with k={}",
        name, outcome.cols, outcome.rows, outcome.record.k
    );
    print_record(&outcome.record);
    let state = match outcome.fit.termination {
        Termination::Converged => "converged",
        Termination::MaxIterationsReached => "hit iteration limit",
    };
    println!("  Iterations:  {} ({})", outcome.fit.iterations, state);
    println!("  Palette:     {}", outcome.fit.palette.join(" "));
}

fn print_record(run: &CompressionRecord) {
    println!("  Run id:      {}", run.id);
    println!("  Created:     {}", run.created_at.to_rfc3339());
    println!("  k:           {}", run.k);
    println!(
        "  Original:    {} ({:.3} KB)",
        run.original_file, run.original_size_kb
    );
    println!(
        "  Compressed:  {} ({:.3} KB)",
        run.compressed_file, run.compressed_size_kb
    );
    println!("  Reduced by:  {}x", run.reduced_by);
}
