//! # Duration Finder
//!
//! Resolves the playback duration of an online video from its URL or from a
//! `(provider, id)` pair.
//!
//! ## Strategies
//!
//! - Direct MP4 files: the movie header (`mvhd`) in the first bytes of the file
//! - HLS playlists: sum of `#EXTINF` segment durations of a finished playlist
//! - YouTube (Data API v3), Vimeo (oEmbed), Twitch (Helix), Dailymotion and
//!   SoundCloud
//!
//! Every resolution ends in one of three ways: a duration, `Indeterminate`
//! (live content, missing credentials, nothing applicable), or a
//! [`DurationError`] whose [`ErrorKind`] tells the caller what went wrong.
//!
//! ```no_run
//! # async fn run() -> Result<(), duration_finder::DurationError> {
//! use duration_finder::{Resolver, ResolverConfig};
//!
//! let resolver = Resolver::from_config(ResolverConfig::default())?;
//! let resolution = resolver.resolve_url("https://vimeo.com/76979871").await?;
//! println!("{:?}", resolution.seconds());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod container;
pub mod credentials;
pub mod error;
pub mod fetcher;
pub mod locator;
pub mod providers;
pub mod resolver;
mod utils;

#[cfg(test)]
mod test_support;

pub use config::ResolverConfig;
pub use container::{aggregate_chunklist, aggregate_playlist, scan_mp4, scan_mp4_bytes};
pub use credentials::{ClientCredentials, StaticToken, TwitchCredentials};
pub use error::{DurationError, ErrorKind};
pub use fetcher::{ByteRange, FetchRequest, FetchResponse, Fetcher, HttpFetcher};
pub use locator::{ProviderKind, Resolution, VideoLocator};
pub use providers::youtube::{YouTubeUrlInfo, parse_url_info as parse_youtube_url};
pub use resolver::Resolver;
