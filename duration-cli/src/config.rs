use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use duration_finder::ResolverConfig;
use tracing::debug;

use crate::cli::Args;

/// `<config dir>/duration-finder/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("duration-finder").join("config.toml"))
}

/// Load the resolver configuration.
///
/// An explicit path must exist; the default path is optional.
pub fn load(path: Option<&Path>) -> Result<ResolverConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_path().filter(|p| p.is_file()) {
            Some(path) => path,
            None => return Ok(ResolverConfig::default()),
        },
    };

    debug!(path = %path.display(), "Loading configuration");
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Command-line flags and environment variables take precedence over the file.
pub fn apply_args(mut config: ResolverConfig, args: &Args) -> Result<ResolverConfig> {
    if let Some(secs) = args.timeout {
        config.timeout = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("Invalid timeout {secs}"))?;
    }
    if let Some(bytes) = args.mp4_range_bytes {
        config.mp4_range_bytes = bytes;
    }

    let overrides = [
        (&mut config.youtube_api_key, &args.youtube_api_key),
        (&mut config.twitch_client_id, &args.twitch_client_id),
        (&mut config.twitch_client_secret, &args.twitch_client_secret),
        (&mut config.twitch_access_token, &args.twitch_access_token),
    ];
    for (slot, value) in overrides {
        if value.is_some() {
            *slot = value.clone();
        }
    }
    Ok(config)
}
