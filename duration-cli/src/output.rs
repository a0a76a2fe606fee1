use anyhow::Result;
#[cfg(feature = "colored-output")]
use colored::*;
use duration_finder::{DurationError, Resolution, YouTubeUrlInfo};
use serde::Serialize;

#[derive(Serialize)]
struct ResolutionReport<'a> {
    input: &'a str,
    #[serde(flatten)]
    resolution: &'a Resolution,
}

/// Plain output is the number of seconds, or `null` when indeterminate.
pub fn format_resolution(input: &str, resolution: &Resolution, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(&ResolutionReport { input, resolution })?);
    }
    Ok(match resolution.seconds() {
        Some(secs) => secs.to_string(),
        None => "null".to_string(),
    })
}

pub fn format_url_info(info: &YouTubeUrlInfo, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(info)?);
    }
    let mut output = format!("id: {}", info.id);
    if let Some(start) = info.start {
        output.push_str(&format!("\nstart: {start}"));
    }
    if let Some(end) = info.end {
        output.push_str(&format!("\nend: {end}"));
    }
    output.push_str(&format!("\nautoplay: {}", info.autoplay));
    Ok(output)
}

/// Error kind of the underlying [`DurationError`], `error` otherwise.
fn error_kind(error: &anyhow::Error) -> &'static str {
    error
        .downcast_ref::<DurationError>()
        .map_or("error", |e| e.kind().into())
}

pub fn print_error(error: &anyhow::Error, json: bool) {
    let kind = error_kind(error);
    if json {
        let body = serde_json::json!({
            "status": "error",
            "kind": kind,
            "message": format!("{error:#}"),
        });
        println!("{body}");
        return;
    }

    #[cfg(feature = "colored-output")]
    eprintln!("{} [{}] {:#}", "Error:".red().bold(), kind.yellow(), error);
    #[cfg(not(feature = "colored-output"))]
    eprintln!("Error: [{kind}] {error:#}");
}
