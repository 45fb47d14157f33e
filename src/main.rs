use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use seq_tool::config::{RunConfig, RunMode, Settings};
use seq_tool::{input, CancellationToken, SequenceDatabase};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// seq-tool - sequential pattern discovery over event histories
#[derive(Parser)]
#[command(name = "seq-tool")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find ordered item patterns shared by many subjects", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine sequential patterns and write tables plus a summary
    Mine {
        /// Prepared CSV with Item, ID and EventTime columns
        #[arg(long)]
        input: PathBuf,

        /// TOML file with run settings; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Minimum supports: counts above 1, ratios in (0, 1]
        #[arg(long, value_delimiter = ',')]
        min_support: Vec<f64>,

        /// Category to include (repeatable, default all)
        #[arg(long)]
        category: Vec<String>,

        /// Run mode: together or separate
        #[arg(long)]
        mode: Option<RunMode>,

        /// Collapse same-time events into one element
        #[arg(long)]
        concurrency: bool,

        /// Time grouping unit for concurrency: E, Y, Q, M, W or S
        #[arg(long)]
        group_by: Option<String>,

        /// Semester names from earliest to latest, e.g. Spring,Summer,Fall
        #[arg(long, value_delimiter = ',')]
        semester_order: Vec<String>,

        /// Stop after patterns of this many items
        #[arg(long)]
        max_length: Option<usize>,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate an input table and show what it contains
    Check {
        #[arg(long)]
        input: PathBuf,

        #[arg(long, value_delimiter = ',')]
        semester_order: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Mine {
            input: input_path,
            config,
            min_support,
            category,
            mode,
            concurrency,
            group_by,
            semester_order,
            max_length,
            output,
        } => {
            let mut settings = match &config {
                Some(path) => Settings::load(path)
                    .with_context(|| format!("Failed to load settings from {}", path.display()))?,
                None => Settings::default(),
            };
            if !min_support.is_empty() {
                settings.min_support = min_support;
            }
            if !category.is_empty() {
                settings.categories = category;
            }
            if mode.is_some() {
                settings.mode = mode;
            }
            settings.concurrency |= concurrency;
            if group_by.is_some() {
                settings.group_by = group_by;
            }
            if !semester_order.is_empty() {
                settings.semester_order = semester_order;
            }
            if max_length.is_some() {
                settings.max_length = max_length;
            }
            if output.is_some() {
                settings.output = output;
            }
            let config = RunConfig::try_from(settings)?;

            let rows = input::read_path(&input_path, &config.semester_order)
                .with_context(|| format!("Failed to read {}", input_path.display()))?;

            let cancel = CancellationToken::new();
            let handler_token = cancel.clone();
            ctrlc::set_handler(move || {
                warn!("Interrupt received, stopping after the current level");
                handler_token.cancel();
            })?;

            let report = seq_tool::run(&rows, &config, &cancel)?;
            for (label, partition) in report.succeeded() {
                println!(
                    "{}: {} subjects, {} patterns, {:.3}s",
                    label,
                    partition.summary.subject_count,
                    partition.table.rows.len(),
                    partition.summary.elapsed_secs
                );
            }
            for (label, err) in report.failed() {
                println!("{}: failed: {}", label, err);
            }
            info!(output = %config.output_dir.display(), "Results written");

            if !report.is_success() {
                bail!("{} partition(s) failed", report.failed().count());
            }
        }
        Commands::Check {
            input: input_path,
            semester_order,
        } => {
            let rows = input::read_path(&input_path, &semester_order)
                .with_context(|| format!("Failed to read {}", input_path.display()))?;
            let db = SequenceDatabase::build(&rows, None)?;
            let categories: BTreeSet<&str> = rows.iter().filter_map(|row| row.category.as_deref()).collect();

            println!("Rows:       {}", rows.len());
            println!("Subjects:   {}", db.subject_count());
            println!("Items:      {}", db.alphabet().len());
            if categories.is_empty() {
                println!("Categories: none");
            } else {
                println!(
                    "Categories: {}",
                    categories.into_iter().collect::<Vec<_>>().join(", ")
                );
            }
        }
    }

    Ok(())
}
