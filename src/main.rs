use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use relation_geojson::api::{HttpFetcher, build_relation_query};
use relation_geojson::config::{FileConfig, PipelineConfig};
use relation_geojson::domain::RelationId;
use relation_geojson::{PipelineOutcome, report, run};

/// Fetch an OpenStreetMap relation from the Overpass API and save it as GeoJSON
///
/// Examples:
///   # Fetch the default relation into ./relation_6386965.geojson
///   relation-geojson
///
///   # Fetch another relation into a directory, through a local Overpass instance
///   relation-geojson -r 62422 -o boundaries -e http://localhost:12345/api/interpreter
///
///   # Use a config file
///   relation-geojson --config my-settings.toml
#[derive(Parser, Debug)]
#[command(name = "relation-geojson")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches relation-geojson.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// OSM relation id to fetch
    #[arg(short = 'r', long)]
    relation: Option<RelationId>,

    /// Overpass API interpreter URL
    #[arg(short = 'e', long)]
    endpoint: Option<String>,

    /// Directory the relation_<id>.geojson file is written to
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Give up on the request after this many seconds (default: wait indefinitely)
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let total_start = Instant::now();

    let file_config = match args.config {
        Some(ref config_path) => Some(FileConfig::from_path(config_path)?),
        None => FileConfig::load(),
    };

    let base = match file_config {
        Some(ref file) => PipelineConfig::default().with_file_config(file),
        None => PipelineConfig::default(),
    };
    let config = PipelineConfig::new(
        args.relation.unwrap_or(base.relation_id),
        args.endpoint.clone().unwrap_or(base.endpoint_url),
    )
    .with_output_dir(args.output_dir.clone().unwrap_or(base.output_dir))
    .with_timeout(args.timeout.map(Duration::from_secs).or(base.timeout));
    let verbose = args.verbose || file_config.as_ref().is_some_and(|c| c.verbose);

    if verbose {
        println!("Configuration:");
        println!("  Relation: {}", config.relation_id);
        println!("  Endpoint: {}", config.endpoint_url);
        println!("  Output dir: {}", config.output_dir.display());
        match config.timeout {
            Some(timeout) => println!("  Timeout: {}s", timeout.as_secs()),
            None => println!("  Timeout: none"),
        }
        println!("  Query:");
        for line in build_relation_query(config.relation_id).lines() {
            println!("    {}", line);
        }
        println!();
    }

    let fetcher = HttpFetcher::new(config.timeout).context("Failed to set up Overpass client")?;

    let spinner = create_spinner(&format!(
        "Fetching relation {} from Overpass...",
        config.relation_id
    ));
    let start = Instant::now();
    let result = run(&config, &fetcher);
    spinner.finish_and_clear();

    let outcome = result.with_context(|| {
        format!(
            "Failed to convert relation {} to GeoJSON",
            config.relation_id
        )
    })?;

    report(&outcome, &mut std::io::stdout().lock()).context("Failed to write to stdout")?;

    if verbose && let PipelineOutcome::Written { features, .. } = &outcome {
        println!(
            "Converted {} features [{:.1}s]",
            features,
            start.elapsed().as_secs_f32()
        );
    }

    if verbose {
        println!(
            "Total time: {:.1}s",
            total_start.elapsed().as_secs_f32()
        );
    }

    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
