//! Catalog-Mapper main entry point
//!
//! This is the command-line interface for the Catalog-Mapper shop crawler.
//!
//! Exit status: 0 when the run completed cleanly, 2 when it completed with
//! warnings, 1 on a fatal error (configuration or sink write).

use std::path::PathBuf;
use std::process::ExitCode;

use catalog_mapper::config::{load_config_with_hash, CategoryFilter, Config};
use catalog_mapper::crawler::{run_catalog, RunOptions};
use catalog_mapper::output::{output_path, print_statistics, CATEGORIES_JSON};
use catalog_mapper::CatalogError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Catalog-Mapper: a polite product catalog mapper
///
/// Catalog-Mapper infers the category tree of a shop from its product
/// pages, harvests every product listed under each leaf category, and
/// writes categories and products to JSON and text files.
#[derive(Parser, Debug)]
#[command(name = "catalog-mapper")]
#[command(version)]
#[command(about = "A polite product catalog mapper", long_about = None)]
struct Cli {
    /// Only map top-level categories whose name contains this text
    #[arg(value_name = "CATEGORY_FILTER")]
    category_filter: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "PATH", default_value = "catalog.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Skip discovery and harvest the categories of a previous run
    #[arg(long)]
    reuse_categories: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CatalogError> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let category_filter = cli
        .category_filter
        .as_deref()
        .map(CategoryFilter::parse)
        .transpose()?;

    let options = RunOptions {
        category_filter,
        reuse_categories: cli.reuse_categories,
    };

    if cli.dry_run {
        handle_dry_run(&config, &config_hash, &options);
        return Ok(ExitCode::SUCCESS);
    }

    handle_run(config, options, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_mapper=info,warn"),
            1 => EnvFilter::new("catalog_mapper=debug,info"),
            2 => EnvFilter::new("catalog_mapper=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config, config_hash: &str, options: &RunOptions) {
    println!("=== Catalog-Mapper Dry Run ===\n");
    println!("Config hash: {}\n", config_hash);

    println!("Crawler Configuration:");
    println!("  Max concurrent requests: {}", config.crawler.max_concurrent_requests);
    println!("  Minimum delay: {}ms", config.crawler.minimum_delay);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Max seed products: {}", config.crawler.max_seed_products);
    println!("  Max pages per leaf: {}", config.crawler.max_pages_per_leaf);
    println!("  Render JavaScript: {}", config.crawler.render_js);
    println!("  Fetch product details: {}", config.crawler.fetch_product_details);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots_txt);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nSite:");
    println!("  Base URL: {}", config.site.base_url);
    match &config.site.renderer_endpoint {
        Some(endpoint) => println!("  Renderer: {}", endpoint),
        None => println!("  Renderer: none (raw HTML)"),
    }

    if config.site.seed_products.is_empty() {
        println!(
            "  Seed products: first {} product links of the base URL",
            config.crawler.max_seed_products
        );
    } else {
        println!("  Seed products ({}):", config.site.seed_products.len());
        for seed in &config.site.seed_products {
            println!("    * {}", seed);
        }
    }

    if !config.site.seed_categories.is_empty() {
        println!("  Seed categories ({}):", config.site.seed_categories.len());
        for seed in &config.site.seed_categories {
            println!("    * {}", seed);
        }
    }

    println!("\nRun:");
    match &options.category_filter {
        Some(filter) => println!("  Category filter: '{}'", filter.as_str()),
        None => println!("  Category filter: none (all categories)"),
    }
    if options.reuse_categories {
        println!(
            "  Discovery: skipped, reusing {}",
            output_path(&config.output, CATEGORIES_JSON).display()
        );
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Text encoding: {}", config.output.text_encoding.label());

    println!("\n✓ Configuration is valid");
}

/// Handles the main run
async fn handle_run(
    config: Config,
    options: RunOptions,
    quiet: bool,
) -> Result<ExitCode, CatalogError> {
    match &options.category_filter {
        Some(filter) => tracing::info!("Mapping categories matching '{}'", filter.as_str()),
        None => tracing::info!("Mapping all categories"),
    }

    let report = run_catalog(config, options).await?;

    if !quiet {
        print_statistics(&report.statistics, report.status, &report.warnings);
    }

    Ok(ExitCode::from(report.status.exit_code()))
}
