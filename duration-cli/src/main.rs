mod cli;
mod config;
mod output;

use std::{io, process};

use anyhow::{Context, Result};
use clap::Parser;
use duration_finder::{Resolver, parse_youtube_url};
use tracing::debug;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::{Args, Commands};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let json = args.json;

    if let Err(e) = init_logging(&args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }

    if let Err(e) = run(args).await {
        debug!(error = ?e, "Command failed");
        output::print_error(&e, json);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    if let Commands::ParseYoutube { url } = &args.command {
        let info = parse_youtube_url(url).with_context(|| format!("Failed to parse {url}"))?;
        println!("{}", output::format_url_info(&info, args.json)?);
        return Ok(());
    }

    let config = config::load(args.config.as_deref())?;
    let config = config::apply_args(config, &args)?;
    let resolver = Resolver::from_config(config).context("Failed to build HTTP client")?;
    debug!(?resolver, "Resolver ready");

    let (input, resolution) = match args.command {
        Commands::Resolve {
            url,
            provider: None,
        } => {
            let resolution = resolver
                .resolve_url(&url)
                .await
                .with_context(|| format!("Failed to resolve {url}"))?;
            (url, resolution)
        }
        Commands::Resolve {
            url,
            provider: Some(strategy),
        } => {
            let resolution = resolver
                .resolve_with_provider(strategy.into(), &url)
                .await
                .with_context(|| format!("Failed to resolve {url}"))?;
            (url, resolution)
        }
        Commands::ById { provider, id } => {
            let resolution = resolver
                .resolve_by_id(&provider, &id)
                .await
                .with_context(|| format!("Failed to resolve {provider}:{id}"))?;
            (format!("{provider}:{id}"), resolution)
        }
        Commands::ParseYoutube { .. } => return Ok(()),
    };

    println!("{}", output::format_resolution(&input, &resolution, args.json)?);
    Ok(())
}

/// Logs go to stderr so stdout carries only results.
fn init_logging(args: &Args) -> Result<()> {
    let filter = if args.quiet {
        EnvFilter::new("error")
    } else if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init()
            .context("Failed to install JSON log subscriber")?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(args.verbose)
                    .with_writer(io::stderr),
            )
            .try_init()
            .context("Failed to install log subscriber")?;
    }
    Ok(())
}
