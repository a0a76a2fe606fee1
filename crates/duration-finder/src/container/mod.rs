//! Container-level duration readers that need no platform API.

pub mod hls;
pub mod mp4;

pub use hls::{aggregate_chunklist, aggregate_playlist};
pub use mp4::{MvhdScanner, scan_mp4, scan_mp4_bytes};
