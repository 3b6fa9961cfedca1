//! Command-line interface components.

use crate::config::ReaderConfig;
use crate::models::{BpchOutput, DatasetInfo, ModelDataset};
use crate::reader::read_bpch;
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "bpch-reader")]
#[command(about = "Read GEOS-Chem binary punch (BPCH) files into typed tracer arrays")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Path to the BPCH file
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Tracer table (defaults to tracerinfo.dat next to the input)
    #[arg(long, value_name = "PATH")]
    pub tracerinfo: Option<PathBuf>,

    /// Category table (defaults to diaginfo.dat next to the input)
    #[arg(long, value_name = "PATH")]
    pub diaginfo: Option<PathBuf>,

    /// Skip unknown tracers and keep invalid identifiers instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Only report sanitized tracer and category identifiers
    #[arg(long, conflicts_with = "grid")]
    pub info_only: bool,

    /// Derive grid box areas and pressure levels
    #[arg(long)]
    pub grid: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }

    /// Reader configuration for these arguments
    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            tracer_table: self.tracerinfo.clone(),
            category_table: self.diaginfo.clone(),
            verbose: self.verbose,
            lenient: self.lenient,
            info_only: self.info_only,
            grid_output: self.grid,
        }
    }
}

/// Set up structured logging on stderr
pub fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bpch_reader={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .init();

    debug!("Logging initialized at level: {}", log_level);
}

/// Read the file named in `args` and print a summary
pub fn run(args: &Args) -> Result<()> {
    let config = args.reader_config();
    let output = read_bpch(&args.input, &config)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    print_info(&output.info);
    if args.info_only {
        print_identifiers(&output.info);
        return Ok(());
    }

    print_series(&output);
    if let Some(model) = &output.model {
        print_model(model);
    }
    Ok(())
}

fn print_info(info: &DatasetInfo) {
    println!("{}", "BPCH file".bright_green().bold());
    println!("  {} {}", "Title:".bright_cyan(), info.header.title);
    println!(
        "  {} {} ({}x{}, {} levels)",
        "Model:".bright_cyan(),
        info.grid.model_name,
        info.grid.resolution[1],
        info.grid.resolution[0],
        info.grid.levels
    );
    println!(
        "  {} {} x {}",
        "Grid:".bright_cyan(),
        info.grid.nlon(),
        info.grid.nlat()
    );
}

fn print_identifiers(info: &DatasetInfo) {
    println!("\n{}", "Categories".bright_yellow());
    for id in &info.categories {
        println!("  {}", id);
    }
    println!("\n{}", "Tracers".bright_yellow());
    for id in &info.tracers {
        println!("  {}", id);
    }
}

fn print_series(output: &BpchOutput) {
    println!(
        "\n{} {}",
        "Series:".bright_yellow(),
        output.dataset.len().to_string().bright_white().bold()
    );
    for (key, series) in output.dataset.iter() {
        let range = match (series.timestamps.first(), series.timestamps.last()) {
            (Some(first), Some(last)) => format!("{:.4} .. {:.4}", first.0, last.1),
            _ => "empty".to_string(),
        };
        println!(
            "  {}/{} {:?} [{}] {}",
            key.category.to_string().bright_cyan(),
            key.tracer.to_string().bright_cyan(),
            series.data.shape(),
            series.unit,
            range.bright_black()
        );
    }
}

fn print_model(model: &ModelDataset) {
    println!("\n{}", "Model grid".bright_yellow());
    println!(
        "  {} {:.4e} m²",
        "Total area:".bright_cyan(),
        model.area.sum()
    );
    match &model.pressure_levels {
        Some(levels) => {
            println!("  {} {}", "Pressure levels:".bright_cyan(), levels.len());
            for (i, p) in levels.iter().enumerate() {
                println!("    {:>3} {:>10.4} hPa", i + 1, p);
            }
        }
        None => println!("  {}", "No surface pressure series".bright_black()),
    }
}
