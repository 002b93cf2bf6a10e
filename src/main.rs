//! News-Cacher main entry point
//!
//! This is the command-line interface of the BoatNet offline news cacher.

use anyhow::Context;
use clap::Parser;
use news_cacher::cache::{CacheStore, FsCacheStore};
use news_cacher::config::{load_config_with_hash, Config};
use news_cacher::crawler::{run_crawl, CrawlOptions};
use news_cacher::output::{print_cache_statistics, print_summary};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// News-Cacher: offline news mirror for BoatNet
///
/// News-Cacher fetches the section pages of the configured publishers,
/// follows their article links up to a per-source quota, and stores every
/// page with its internal links rewritten so it can be read offline.
#[derive(Parser, Debug)]
#[command(name = "news-cacher")]
#[command(version = "1.0.0")]
#[command(about = "Offline news mirror for BoatNet", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Remove cached pages before crawling
    #[arg(long)]
    fresh: bool,

    /// Only crawl (or with --fresh, only clear) the named source
    #[arg(long, value_name = "NAME")]
    source: Option<String>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "clear"])]
    dry_run: bool,

    /// Show per-source cache statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "clear"])]
    stats: bool,

    /// Remove the cached pages of the named source and exit
    #[arg(long, value_name = "NAME", conflicts_with_all = ["dry_run", "stats"])]
    clear: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(name) = &cli.clear {
        handle_clear(&config, name)?;
    } else {
        let options = CrawlOptions {
            fresh: cli.fresh,
            only_source: cli.source.clone(),
        };
        handle_crawl(config, options).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("news_cacher=info,warn"),
            1 => EnvFilter::new("news_cacher=debug,info"),
            2 => EnvFilter::new("news_cacher=trace,debug"),
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

/// Handles --dry-run: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== News-Cacher Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Seed timeout: {}ms", config.crawler.seed_timeout_ms);
    println!("  Article timeout: {}ms", config.crawler.article_timeout_ms);
    println!("  Remote log every: {} pages", config.crawler.log_every);
    match config.crawler.article_max_age_hours {
        Some(hours) => println!("  Re-fetch articles older than: {}h", hours),
        None => println!("  Re-fetch articles older than: always"),
    }
    println!(
        "  Quota mode: {}",
        if config.crawler.strict_quota {
            "strict"
        } else {
            "soft"
        }
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());
    println!("Cache directory: {}", config.output.cache_dir);
    match &config.remote_log {
        Some(remote) => println!("Remote log: {}?{}=...", remote.endpoint, remote.param),
        None => println!("Remote log: disabled"),
    }

    println!("\nSources ({}):", config.sources.len());
    for source in &config.sources {
        println!(
            "  - {} [{}] quota {}, served under {}",
            source.display_name(),
            source.name,
            source.quota,
            source.serve_path
        );
        for seed in &source.seeds {
            println!("    * {}", seed);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start caching from {} section pages",
        config.seed_count()
    );
}

/// Handles --stats: shows what is in the cache
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = FsCacheStore::open(&config.output.cache_dir)
        .with_context(|| format!("failed to open cache {}", config.output.cache_dir))?;

    println!("Cache directory: {}\n", config.output.cache_dir);
    print_cache_statistics(config, &store)?;

    Ok(())
}

/// Handles --clear: removes one source's cached pages
fn handle_clear(config: &Config, name: &str) -> anyhow::Result<()> {
    let source = config
        .source_by_name(name)
        .with_context(|| format!("unknown source: {}", name))?;

    let store = FsCacheStore::open(&config.output.cache_dir)
        .with_context(|| format!("failed to open cache {}", config.output.cache_dir))?;
    let removed = store.remove_prefix(&source.key_prefix)?;

    println!(
        "✓ Removed {} cached pages of {}",
        removed,
        source.display_name()
    );

    Ok(())
}

/// Handles the main caching run
async fn handle_crawl(config: Config, options: CrawlOptions) -> anyhow::Result<()> {
    match &options.only_source {
        Some(name) => tracing::info!("Caching source {} only", name),
        None => tracing::info!("Caching {} sources", config.sources.len()),
    }
    if options.fresh {
        tracing::info!("Fresh run: existing cache entries will be removed");
    }

    let summary = run_crawl(config, options).await.map_err(|e| {
        tracing::error!("Crawl failed: {}", e);
        e
    })?;

    print_summary(&summary);
    Ok(())
}
