//! Sitesignal main entry point
//!
//! This is the command-line interface for the sitesignal domain crawler.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use sitesignal::config::{load_config_with_hash, Config};
use sitesignal::output::{render_summary, OutputFormat};
use sitesignal::{Coordinator, CrawlRequest};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Markdown,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => OutputFormat::Json,
            Format::Markdown => OutputFormat::Markdown,
        }
    }
}

/// Sitesignal: a polite business-signal domain crawler
///
/// Samples pages from each start URL's domain while respecting robots.txt and
/// rate limits, and prints a domain summary with identity, niches, partner and
/// client evidence.
#[derive(Parser, Debug)]
#[command(name = "sitesignal")]
#[command(version)]
#[command(about = "A polite business-signal domain crawler", long_about = None)]
struct Cli {
    /// Start URLs, crawled one after another
    #[arg(value_name = "START_URL", required = true)]
    start_urls: Vec<String>,

    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Override the page budget per domain
    #[arg(long)]
    max_pages: Option<u32>,

    /// Override the link depth limit
    #[arg(long)]
    depth_limit: Option<u32>,

    /// Ignore robots.txt
    #[arg(long)]
    no_robots: bool,

    /// Enable the headless render fallback for blocked pages
    #[arg(long)]
    render: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Validate configuration and print the resolved requests without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let requests: Vec<CrawlRequest> = cli
        .start_urls
        .iter()
        .map(|start_url| build_request(&cli, start_url, &config))
        .collect();

    if cli.dry_run {
        return handle_dry_run(&config, &requests);
    }

    let coordinator = Coordinator::new(config).context("invalid configuration")?;
    let format = OutputFormat::from(cli.format);

    for request in &requests {
        let summary = coordinator
            .crawl(request)
            .await
            .with_context(|| format!("crawl of {} failed", request.start_url))?;

        println!("{}", render_summary(&summary, format)?);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so that summaries on stdout stay machine-readable.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitesignal=info,warn"),
            1 => EnvFilter::new("sitesignal=debug,info"),
            2 => EnvFilter::new("sitesignal=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn build_request(cli: &Cli, start_url: &str, config: &Config) -> CrawlRequest {
    let mut request = CrawlRequest::from_config(start_url, config);
    if let Some(max_pages) = cli.max_pages {
        request.max_pages = max_pages;
    }
    if let Some(depth_limit) = cli.depth_limit {
        request.depth_limit = depth_limit;
    }
    if cli.no_robots {
        request.obey_robots = false;
    }
    if cli.render {
        request.render_fallback_enabled = true;
    }
    request
}

/// Handles the --dry-run mode: validates config and requests
fn handle_dry_run(config: &Config, requests: &[CrawlRequest]) -> anyhow::Result<()> {
    sitesignal::config::validate(config).context("invalid configuration")?;

    println!("=== Sitesignal Dry Run ===\n");
    println!("Crawler Configuration:");
    println!("  Requests per second: {}", config.crawler.requests_per_second);
    println!("  Max jitter: {}ms", config.crawler.max_jitter_ms);
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Robots token: {}", config.user_agent.robots_token);
    println!("  User agents: {}", config.user_agent.pool.len());
    println!("  Proxies: {}", config.proxy.pool.len());
    println!(
        "  Lexicon: {} ({})",
        config.lexicon.version,
        config.lexicon.fingerprint()
    );

    println!("\nRequests:");
    for request in requests {
        let start = request
            .validate()
            .with_context(|| format!("invalid request for {}", request.start_url))?;
        println!(
            "  {} (max {} pages, depth {}, robots {}, render {})",
            start,
            request.max_pages,
            request.depth_limit,
            if request.obey_robots { "on" } else { "off" },
            if request.render_fallback_enabled { "on" } else { "off" },
        );
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}
