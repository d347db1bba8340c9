// src/main.rs

use std::env;
use std::path::Path;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use listing_scraper::config::ScrapeConfig;
use listing_scraper::runner::run_scrape;

const DEFAULT_CONFIG: &str = "scrape.json";

/// The main entry point, which dispatches to the requested command.
#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();
    // Default to "scrape" if no command is given.
    let command = args.get(1).map_or("scrape", |s| s.as_str());

    match command {
        "scrape" => run_scraper(args.get(2).map_or(DEFAULT_CONFIG, |s| s.as_str())).await,
        "help" | "--help" | "-h" => {
            print_usage();
            ExitCode::SUCCESS
        }
        // A bare config path is accepted too.
        path if path.ends_with(".json") => run_scraper(path).await,
        _ => {
            print_usage();
            ExitCode::FAILURE
        }
    }
}

/// Loads the config and runs one scrape with it.
async fn run_scraper(config_path: &str) -> ExitCode {
    let config = match ScrapeConfig::from_file(Path::new(config_path)) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config '{}': {}", config_path, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting scrape with config '{}'", config_path);
    match run_scrape(config).await {
        Ok(summary) => {
            info!("Done: {}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Scrape failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Prints the help message for the user.
fn print_usage() {
    println!("--- Listing Scraper ---");
    println!("Usage: listing_scraper [COMMAND] [CONFIG]");
    println!("\nCommands:");
    println!("  scrape [CONFIG]  Crawl the configured listing and store its records (default).");
    println!("                   CONFIG defaults to '{}'.", DEFAULT_CONFIG);
    println!("  help             Show this message.");
    println!("\nSet RUST_LOG (e.g. RUST_LOG=debug) to change log verbosity.");
}
