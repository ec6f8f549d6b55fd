use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parts_sync::config::{output_dir_from_env, LarkConfig, ShopifyConfig};
use parts_sync::jobs::{run_commerce_map, run_parts_snapshot, OutputOptions};
use parts_sync::logging::init_tracing;
use parts_sync::util::env::init_env;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "parts-sync",
    version,
    about = "Build the parts and Shopify map JSON snapshots"
)]
struct Cli {
    /// Directory for the snapshot files (default: SNAPSHOT_OUTPUT_DIR or ./public)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    /// Fetch and aggregate, but do not write any file
    #[arg(long, global = true, default_value_t = false)]
    dry_run: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Lark spare-parts table -> parts.json
    Parts,
    /// Shopify catalog -> shopify_map.json
    CommerceMap,
    /// Both snapshots, parts first; stops at the first failure
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_env();
    init_tracing("info")?;
    let cli = Cli::parse();

    let out = OutputOptions {
        dir: cli.output_dir.unwrap_or_else(output_dir_from_env),
        dry_run: cli.dry_run,
    };
    info!(
        command = ?cli.command,
        dir = %out.dir.display(),
        dry_run = out.dry_run,
        "parts-sync starting"
    );

    match cli.command {
        Commands::Parts => parts(&out).await,
        Commands::CommerceMap => commerce_map(&out).await,
        Commands::All => {
            parts(&out).await?;
            commerce_map(&out).await
        }
    }
}

async fn parts(out: &OutputOptions) -> Result<()> {
    let cfg = LarkConfig::from_env().context("parts: configuration")?;
    run_parts_snapshot(&cfg, out).await?;
    Ok(())
}

async fn commerce_map(out: &OutputOptions) -> Result<()> {
    let cfg = ShopifyConfig::from_env().context("commerce map: configuration")?;
    run_commerce_map(&cfg, out).await?;
    Ok(())
}
