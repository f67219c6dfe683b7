use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Level;

use odog::dedup::{CandidateRecord, Deduplicator};
use odog::ingest::{parse_since, CollectMode, IngestCoordinator, IngestError};
use odog::place::{PlaceRecord, WeatherSignal};
use odog::store::{get_store_path, JsonStore};

const EXIT_SUCCESS: i32 = 0;
const EXIT_STORE: i32 = 2;
const EXIT_INPUT: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score one place and explain the breakdown
    Score {
        /// JSON file holding a single place record
        place: PathBuf,
        /// JSON file holding the current weather for the place's region
        #[arg(short, long)]
        weather: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Score and sort a list of places
    Rank {
        /// JSON file holding an array of place records
        places: PathBuf,
        /// JSON file mapping region code to weather
        #[arg(short, long)]
        weather: Option<PathBuf>,
        /// Tab-separated output for scripting
        #[arg(long)]
        tsv: bool,
    },
    /// Dry run: show which candidates are new and which are already stored
    Check {
        /// JSON file holding an array of candidate records
        candidates: PathBuf,
        /// Source API the candidates came from (required with --since)
        #[arg(short, long)]
        source: Option<String>,
        /// Only trust recent collections: RFC 3339 timestamp or duration ago (e.g. 7d)
        #[arg(long, requires = "source")]
        since: Option<String>,
    },
    /// Collect candidates from one source into the store
    Ingest {
        /// JSON file holding an array of candidate records
        candidates: PathBuf,
        /// Source API the candidates came from
        #[arg(short, long)]
        source: String,
        /// Incremental collection: RFC 3339 timestamp or duration ago (e.g. 7d)
        #[arg(long)]
        since: Option<String>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "odog")]
#[command(about = "Pet-friendly place scoring and ingestion deduplication", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/odog/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn read_input<T: DeserializeOwned>(path: &Path) -> T {
    match read_json(path) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Input error: {:#}", e);
            std::process::exit(EXIT_INPUT);
        }
    }
}

fn since_mode(since: Option<&str>) -> CollectMode {
    match since {
        None => CollectMode::Full,
        Some(s) => match parse_since(s, Utc::now()) {
            Ok(since) => CollectMode::Since { since },
            Err(e) => {
                eprintln!("Input error: {:#}", e);
                std::process::exit(EXIT_INPUT);
            }
        },
    }
}

fn open_store(path: &Path) -> Arc<JsonStore> {
    match JsonStore::load(path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("Store error: {}: {}", path.display(), e);
            std::process::exit(EXIT_STORE);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let start_time = Instant::now();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let config = match odog::config::load_config(cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    // Validate scoring config at startup
    let effective_scoring = config.scoring.clone().unwrap_or_default();
    if let Err(errors) = odog::scoring::validate_scoring(&effective_scoring) {
        eprintln!("Scoring config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let store_path = config.store_path.clone().unwrap_or_else(get_store_path);
    let use_colors = odog::output::should_use_colors();

    match cli.command {
        Commands::Score {
            place,
            weather,
            json,
        } => {
            let place: PlaceRecord = read_input(&place);
            let weather: Option<WeatherSignal> = weather.as_deref().map(read_input::<WeatherSignal>);
            let result = odog::scoring::calculate_score(
                &place.signal,
                weather.as_ref(),
                &effective_scoring,
                Utc::now(),
            );

            if json {
                match serde_json::to_string_pretty(&result) {
                    Ok(s) => println!("{}", s),
                    Err(e) => {
                        eprintln!("Failed to encode result: {}", e);
                        std::process::exit(EXIT_INPUT);
                    }
                }
            } else {
                println!("{} ({})", place.name, place.id);
                println!("{}", odog::output::format_score_detail(&result, use_colors));
            }
        }
        Commands::Rank {
            places,
            weather,
            tsv,
        } => {
            let places: Vec<PlaceRecord> = read_input(&places);
            let weather = weather
                .as_deref()
                .map(read_input::<HashMap<String, WeatherSignal>>)
                .map(odog::rank::weather_index)
                .unwrap_or_default();

            let now = Utc::now();
            let ranked = odog::rank::rank_places(places, &weather, &effective_scoring, now);

            if tsv {
                let output = odog::output::format_tsv(&ranked);
                if !output.is_empty() {
                    println!("{}", output);
                }
            } else {
                println!(
                    "{}",
                    odog::output::format_ranked_table(&ranked, use_colors, now)
                );
            }

            if cli.verbose {
                eprintln!();
                eprintln!("Total: {} places in {:?}", ranked.len(), start_time.elapsed());
            }
        }
        Commands::Check {
            candidates,
            source,
            since,
        } => {
            let candidates: Vec<CandidateRecord> = read_input(&candidates);
            let dedup = build_deduplicator(&config, open_store(&store_path));

            let partition = match (source, since_mode(since.as_deref())) {
                (Some(source), CollectMode::Since { since }) => {
                    dedup.get_new_places_since(&source, since, candidates).await
                }
                _ => dedup.filter_new_places(candidates).await,
            };

            match partition {
                Ok(partition) => {
                    println!("{}", odog::output::format_partition(&partition, use_colors))
                }
                Err(e) => {
                    eprintln!("Store error: {}", e);
                    std::process::exit(EXIT_STORE);
                }
            }
        }
        Commands::Ingest {
            candidates,
            source,
            since,
        } => {
            let candidates: Vec<CandidateRecord> = read_input(&candidates);
            let mode = since_mode(since.as_deref());
            let store = open_store(&store_path);
            let coordinator = IngestCoordinator::new(build_deduplicator(&config, store.clone()));

            let report = match coordinator
                .collect(&source, candidates, mode, Utc::now())
                .await
            {
                Ok(report) => report,
                Err(e @ IngestError::SourceMismatch { .. }) => {
                    eprintln!("Input error: {}", e);
                    std::process::exit(EXIT_INPUT);
                }
                Err(e) => {
                    eprintln!("Ingest failed: {}", e);
                    std::process::exit(EXIT_STORE);
                }
            };

            if let Err(e) = store.save(&store_path) {
                eprintln!("Store error: failed to save {}: {}", store_path.display(), e);
                std::process::exit(EXIT_STORE);
            }

            println!("{}", odog::output::format_ingest_report(&report));
        }
    }

    std::process::exit(EXIT_SUCCESS);
}

fn build_deduplicator(config: &odog::config::Config, store: Arc<JsonStore>) -> Deduplicator<JsonStore> {
    let mut dedup = Deduplicator::new(store);
    if let Some(size) = config.batch_chunk_size {
        dedup = dedup.with_chunk_size(size);
    }
    if let Some(max) = config.max_concurrent_lookups {
        dedup = dedup.with_max_concurrent_lookups(max);
    }
    dedup
}
