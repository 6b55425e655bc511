//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the Catalog-Harvest product crawler.

use anyhow::Context;
use catalog_harvest::config::{
    hash_content, load_config_with_hash, validate, Config, OutputFormat, StartUrl,
};
use catalog_harvest::crawler::{build_seeds, Coordinator, CrawlTarget, HttpFetcher};
use catalog_harvest::output::{open_sink, print_summary};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: a budgeted product crawler
///
/// Catalog-Harvest turns search terms and start URLs into product records,
/// expanding search and category listings and following pagination until
/// the requested number of items has been emitted.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A budgeted product catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply without one)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Search term to seed the crawl with (repeatable)
    #[arg(long = "search-term", value_name = "TERM")]
    search_terms: Vec<String>,

    /// Start URL to seed the crawl with (repeatable)
    #[arg(long = "start-url", value_name = "URL")]
    start_urls: Vec<String>,

    /// Maximum number of products to emit
    #[arg(long)]
    max_items: Option<usize>,

    /// Number of concurrent workers (1 = sequential)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Output file path
    #[arg(long)]
    output: Option<String>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Show the resolved seeds without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => (Config::default(), hash_content("")),
    };

    apply_overrides(&mut config, &cli);
    validate(&config).context("invalid configuration")?;

    let site = config.site.site();
    let seeds = build_seeds(&config.crawl.search_terms, &config.crawl.start_urls, &site)
        .context("nothing to crawl")?;

    if cli.dry_run {
        handle_dry_run(&config, &seeds);
        return Ok(());
    }

    handle_crawl(&config, &config_hash, seeds).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Command-line values win over the configuration file
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if !cli.search_terms.is_empty() {
        config.crawl.search_terms = cli.search_terms.clone();
    }
    if !cli.start_urls.is_empty() {
        config.crawl.start_urls = cli
            .start_urls
            .iter()
            .map(|url| StartUrl::from(url.as_str()))
            .collect();
    }
    if let Some(max_items) = cli.max_items {
        config.crawl.max_items = max_items;
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawl.concurrency = concurrency;
    }
    if let Some(output) = &cli.output {
        config.output.path = output.clone();
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, seeds: &[CrawlTarget]) {
    println!("=== Catalog-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Host: {}", config.site.host);
    println!("  Search template: {}", config.site.search_url_template);

    println!("\nCrawl:");
    println!("  Max items: {}", config.crawl.max_items);
    println!("  Concurrency: {}", config.crawl.concurrency);
    println!("  Max pages: {}", config.crawl.effective_max_pages());

    println!("\nOutput:");
    println!("  Format: {:?}", config.output.format);
    println!("  Path: {}", config.output.path);

    println!("\nSeeds ({}):", seeds.len());
    for seed in seeds {
        println!("  - [{}] {}", seed.label, seed.url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str, seeds: Vec<CrawlTarget>) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} for {} items with {} seeds",
        config.site.host,
        config.crawl.max_items,
        seeds.len()
    );

    let fetcher = HttpFetcher::from_config(&config.fetch).context("failed to build HTTP client")?;
    let sink = open_sink(&config.output, config_hash)
        .with_context(|| format!("failed to open output {}", config.output.path))?;

    let coordinator = Coordinator::from_config(config, Arc::new(fetcher), sink);
    match coordinator.run(seeds).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
