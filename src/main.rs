// Copyright 2026 Scraperun Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scraperun::driver::chromium::{find_chromium, ChromiumDriver};
use scraperun::driver::PageDriver;
use scraperun::job::JobRunner;
use scraperun::store::memory::MemoryStore;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "scraperun",
    about = "Scraperun — declarative web extraction from persisted selector and action records",
    version
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the persisted action list against a page and print the result map
    Run {
        /// Page to load
        #[arg(long)]
        url: String,
        /// Selector datastore (one JSON document per line)
        #[arg(long, default_value = "selector.db")]
        selectors: PathBuf,
        /// Action datastore (one JSON document per line)
        #[arg(long, default_value = "action.db")]
        actions: PathBuf,
        /// Write the result map to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Navigation timeout in milliseconds
        #[arg(long, default_value = "30000")]
        nav_timeout_ms: u64,
    },
    /// Check that a Chromium binary can be found
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            url,
            selectors,
            actions,
            out,
            nav_timeout_ms,
        } => run(&url, &selectors, &actions, out.as_deref(), nav_timeout_ms).await,
        Commands::Doctor => doctor(),
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "scraperun=debug"
    } else {
        "scraperun=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive)),
        )
        .init();
}

async fn run(
    url: &str,
    selectors: &Path,
    actions: &Path,
    out: Option<&Path>,
    nav_timeout_ms: u64,
) -> Result<()> {
    let store = MemoryStore::load(selectors, actions).context("loading configuration")?;

    let driver = ChromiumDriver::launch(nav_timeout_ms).await?;
    let outcome = scrape(&driver, url, &store).await;
    // Close the browser before reporting, even when the run failed, so no
    // Chromium child is left orphaned.
    if let Err(e) = driver.shutdown().await {
        warn!(error = %e, "browser did not shut down cleanly");
    }
    let result = outcome?;

    let rendered = serde_json::to_string_pretty(&result)?;
    match out {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "result written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn scrape(
    driver: &ChromiumDriver,
    url: &str,
    store: &MemoryStore,
) -> Result<std::collections::BTreeMap<String, scraperun::Value>> {
    info!(url, "navigating");
    driver.navigate(url).await?;
    Ok(JobRunner::new(driver, store).run().await?)
}

fn doctor() -> Result<()> {
    match find_chromium() {
        Some(path) => {
            println!("chromium: {}", path.display());
            Ok(())
        }
        None => anyhow::bail!(
            "no Chromium binary found; install Chrome or set SCRAPERUN_CHROMIUM_PATH"
        ),
    }
}
