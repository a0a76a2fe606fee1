use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use duration_finder::ProviderKind;

#[derive(Parser, Debug)]
#[command(
    name = "duration-cli",
    version,
    about = "Find the playback duration of an online video",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML); defaults to <config dir>/duration-finder/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Per-request timeout in seconds (0 disables it)
    #[arg(long, global = true)]
    pub timeout: Option<f64>,

    /// Bytes fetched from the start of an MP4 file
    #[arg(long, global = true)]
    pub mp4_range_bytes: Option<u64>,

    /// YouTube Data API v3 key
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true, global = true)]
    pub youtube_api_key: Option<String>,

    /// Twitch application client id
    #[arg(long, env = "TWITCH_CLIENT_ID", global = true)]
    pub twitch_client_id: Option<String>,

    /// Twitch application client secret
    #[arg(long, env = "TWITCH_CLIENT_SECRET", hide_env_values = true, global = true)]
    pub twitch_client_secret: Option<String>,

    /// Pre-issued Twitch app access token
    #[arg(long, env = "TWITCH_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub twitch_access_token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the duration of a video URL
    Resolve {
        /// Absolute video URL
        url: String,

        /// Skip detection and use this strategy
        #[arg(short, long, value_enum)]
        provider: Option<Strategy>,
    },

    /// Resolve the duration of a platform video id
    ById {
        /// Platform key (youtube, vimeo, twitch, dailymotion, soundcloud)
        provider: String,

        /// Platform video id
        id: String,
    },

    /// Show the video id and playback options of a YouTube URL
    ParseYoutube {
        /// YouTube or youtu.be URL
        url: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Youtube,
    Vimeo,
    Twitch,
    Dailymotion,
    Soundcloud,
    Mp4,
    Hls,
    Probe,
}

impl From<Strategy> for ProviderKind {
    fn from(value: Strategy) -> Self {
        match value {
            Strategy::Youtube => ProviderKind::YouTube,
            Strategy::Vimeo => ProviderKind::Vimeo,
            Strategy::Twitch => ProviderKind::Twitch,
            Strategy::Dailymotion => ProviderKind::Dailymotion,
            Strategy::Soundcloud => ProviderKind::SoundCloud,
            Strategy::Mp4 => ProviderKind::DirectMp4,
            Strategy::Hls => ProviderKind::Hls,
            Strategy::Probe => ProviderKind::Unknown,
        }
    }
}
