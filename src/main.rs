//! dom4in collector main entry point
//!
//! Command-line interface for the dom4in short-domain census.

use anyhow::Context;
use clap::Parser;
use dom4in_collector::backend::BackendClient;
use dom4in_collector::config::{load_config_with_hash, Config};
use dom4in_collector::state::{Pointer, WordCursor};
use dom4in_collector::storage::{CursorStore, JsonCursorStore, Ledger};
use dom4in_collector::Collector;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// dom4in collector: a resumable census of short domain labels
///
/// Enumerates short labels and dictionary words under the configured TLDs,
/// probes DNS registration and HTTP liveness, and uploads per-block
/// aggregates to the dom4in backend.
#[derive(Parser, Debug)]
#[command(name = "dom4in-collector")]
#[command(version)]
#[command(about = "A resumable census of short domain labels", long_about = None)]
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

    /// Stop after this many blocks
    #[arg(long, value_name = "N")]
    blocks: Option<u64>,

    /// Validate config and show the next block without probing anything
    #[arg(long, conflicts_with_all = ["stats", "reset_stats", "reset_cursors"])]
    dry_run: bool,

    /// Show lifetime statistics from the ledger and exit
    #[arg(long, conflicts_with_all = ["dry_run", "reset_stats", "reset_cursors"])]
    stats: bool,

    /// Reset backend and ledger statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "reset_cursors"])]
    reset_stats: bool,

    /// Delete the saved cursors so the next run starts from the beginning
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "reset_stats"])]
    reset_cursors: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(config, config_hash)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.reset_stats {
        handle_reset_stats(&config).await?;
    } else if cli.reset_cursors {
        handle_reset_cursors(&config)?;
    } else {
        handle_collect(config, config_hash, cli.blocks).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("dom4in_collector=info,warn"),
            1 => EnvFilter::new("dom4in_collector=debug,info"),
            2 => EnvFilter::new("dom4in_collector=trace,debug"),
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

/// Handles --dry-run: shows the configuration and the next block's candidates
fn handle_dry_run(config: Config, config_hash: String) -> anyhow::Result<()> {
    println!("=== dom4in Collector Dry Run ===\n");

    println!("Enumeration:");
    println!("  Charset: {}", config.enumeration.charset);
    println!("  Max length: {}", config.enumeration.max_length);
    println!("  TLDs: {}", config.enumeration.tlds.join(", "));

    println!("\nResolvers ({}):", config.resolvers.len());
    for resolver in &config.resolvers {
        println!(
            "  - {} {} (min delay {}ms)",
            resolver.name,
            resolver.url,
            resolver.min_delay().as_millis()
        );
    }

    println!("\nProbe:");
    println!("  Workers: {}", config.probe.workers);
    println!("  DNS timeout: {}ms", config.probe.dns_timeout_ms);
    println!("  HTTP timeout: {}ms", config.probe.http_timeout_ms);

    println!("\nSchedule:");
    println!("  Short mode: {}", config.schedule.short_mode);
    println!("  Word mode: {}", config.schedule.word_mode);

    let collector = Collector::new(config, config_hash)?;
    let pointer = &collector.cursors().pointer;

    println!("\nLength cursors:");
    for length in 1..=pointer.max_length {
        if let Some(cursor) = pointer.cursor(length) {
            let status = if cursor.done { "done" } else { "open" };
            println!(
                "  L{}: tld {} index {} ({})",
                length, cursor.tld_index, cursor.index, status
            );
        }
    }
    println!("  Next length: {}", pointer.next_length);
    println!("Word cursor: {}", collector.cursors().word_cursor.index);

    match collector.preview_next_block() {
        Some((mode, batch)) => {
            println!("\nNext block ({} mode, up to {} candidates):", mode, batch.len());
            for candidate in &batch {
                println!("  {}", candidate);
            }
        }
        None => println!("\nConfigured space is exhausted"),
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles --stats: prints lifetime totals from the ledger
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let ledger = Ledger::new(&config.storage.ledger_path).with_context(|| {
        format!(
            "Failed to open ledger at {}",
            config.storage.ledger_path.display()
        )
    })?;

    let totals = ledger.lifetime_totals()?;
    println!("=== dom4in Collector Statistics ===\n");
    println!("Blocks: {}", totals.blocks);
    println!("Candidates probed: {}", totals.candidates);
    println!("Registered: {}", totals.registered);
    println!("Resolver errors: {}", totals.resolver_errors);
    println!("Queued uploads: {}", totals.queued_uploads);

    let tlds = ledger.tld_totals()?;
    if !tlds.is_empty() {
        println!("\nBy TLD:");
        for stat in &tlds {
            println!(
                "  .{}: {} checked, {} short ({} unregistered, {} no website, {} active)",
                stat.tld,
                stat.domains_checked_total,
                stat.short_domains_checked_total,
                stat.short_unregistered_count,
                stat.short_no_website_count,
                stat.short_active_site_count
            );
        }
    }

    let recent = ledger.recent_blocks(10)?;
    if !recent.is_empty() {
        println!("\nRecent blocks:");
        for block in &recent {
            println!(
                "  #{} {} {} mode: {} candidates, {} registered, {} resolver errors, upload {}",
                block.id,
                block.finished_at,
                block.mode,
                block.candidates,
                block.registered,
                block.resolver_errors,
                block.upload_status
            );
        }
    }

    Ok(())
}

/// Handles --reset-stats: clears backend statistics, then the local ledger
async fn handle_reset_stats(config: &Config) -> anyhow::Result<()> {
    let backend = BackendClient::new(&config.backend)?;
    let response = backend
        .reset_stats()
        .await
        .context("Backend refused to reset statistics")?;
    tracing::info!("Backend reset ({}): {}", response.status, response.body);

    let mut ledger = Ledger::new(&config.storage.ledger_path)?;
    ledger.clear_stats()?;

    println!("✓ Statistics reset");
    Ok(())
}

/// Handles --reset-cursors: deletes both cursor files
fn handle_reset_cursors(config: &Config) -> anyhow::Result<()> {
    let pointer_store: JsonCursorStore<Pointer> =
        JsonCursorStore::new(&config.storage.pointer_path);
    let word_store: JsonCursorStore<WordCursor> =
        JsonCursorStore::new(&config.storage.word_cursor_path);

    for (removed, path) in [
        (pointer_store.clear()?, pointer_store.path()),
        (word_store.clear()?, word_store.path()),
    ] {
        if removed {
            println!("Removed {}", path.display());
        } else {
            println!("No cursor at {}", path.display());
        }
    }

    println!("✓ Cursors reset; the next run starts from the beginning");
    Ok(())
}

/// Handles the main collection loop
async fn handle_collect(
    config: Config,
    config_hash: String,
    max_blocks: Option<u64>,
) -> anyhow::Result<()> {
    let mut collector = Collector::new(config, config_hash)?;

    let processed = collector.run(max_blocks).await?;

    for entry in collector.resolver_pool().snapshot() {
        tracing::info!(
            "Resolver {}: {} queries, {} ok, {} errors",
            entry.name,
            entry.total_queries(),
            entry.successes,
            entry.errors
        );
    }
    tracing::info!("Finished after {} blocks", processed);

    Ok(())
}
