//! Command-line front end for the product-link resolver
//!
//! Usage: `wishlist-parser [--config <file>] <url>...`
//!
//! Prints one pretty JSON document per link. A link that cannot be parsed is
//! still a normal result (`"success": false`); only usage and configuration
//! problems produce a non-zero exit code.

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use tracing::info;

use wishlist_parser::infrastructure::logging::init_logging_with_config;
use wishlist_parser::{AppConfig, ProductResolver};

const USAGE: &str = "usage: wishlist-parser [--config <file>] <url>...";

struct CliArgs {
    config_path: Option<PathBuf>,
    urls: Vec<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut config_path = None;
    let mut urls = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config needs a file path")?;
                config_path = Some(PathBuf::from(path));
            }
            "--help" | "-h" => bail!(USAGE),
            _ => urls.push(arg),
        }
    }

    if urls.is_empty() {
        bail!(USAGE);
    }
    Ok(CliArgs { config_path, urls })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    let config = AppConfig::load(args.config_path.as_deref())?;
    init_logging_with_config(&config.logging)?;
    info!(
        "Loaded configuration (timeout={}s, redirects={})",
        config.parser.request_timeout_seconds, config.parser.follow_redirects
    );
    info!("🚀 Resolving {} link(s)", args.urls.len());

    let resolver =
        ProductResolver::from_config(&config.parser).context("Failed to build product resolver")?;

    for product in resolver.resolve_many(&args.urls).await {
        println!("{}", serde_json::to_string_pretty(&product)?);
    }
    Ok(())
}
