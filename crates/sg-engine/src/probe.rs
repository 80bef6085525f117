//! Source duration probe backed by the `ffprobe` CLI.
//!
//! Runs `ffprobe -v quiet -print_format json -show_format <file>` and reads the
//! container duration from the JSON output.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe the duration of the media file at `path`, in seconds.
///
/// Returns `Ok(None)` when ffprobe succeeds but reports no usable duration
/// (e.g. a raw stream without container timing).
pub async fn probe_duration(tools: &ToolRegistry, path: &Path) -> sg_core::Result<Option<f64>> {
    let ffprobe = tools.require("ffprobe")?;

    let mut cmd = ToolCommand::new(ffprobe.to_path_buf());
    cmd.args(["-v", "quiet", "-print_format", "json", "-show_format"]);
    cmd.arg(path.to_string_lossy().as_ref());
    cmd.timeout(PROBE_TIMEOUT);

    let output = cmd.execute().await?;
    let duration = parse_duration(&output.stdout)?;
    tracing::debug!(path = %path.display(), ?duration, "Probed source duration");
    Ok(duration)
}

fn parse_duration(json: &str) -> sg_core::Result<Option<f64>> {
    let ff: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| sg_core::Error::tool("ffprobe", format!("JSON parse error: {e}")))?;

    Ok(ff
        .format
        .duration
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_format_duration() {
        let json = r#"{"format": {"filename": "a.mp4", "duration": "47.033000", "size": "1024"}}"#;
        assert_eq!(parse_duration(json).unwrap(), Some(47.033));
    }

    #[test]
    fn missing_or_bogus_duration_is_none() {
        assert_eq!(parse_duration(r#"{"format": {}}"#).unwrap(), None);
        assert_eq!(
            parse_duration(r#"{"format": {"duration": "N/A"}}"#).unwrap(),
            None
        );
    }

    #[test]
    fn malformed_json_is_tool_error() {
        let err = parse_duration("not json").unwrap_err();
        assert!(matches!(err, sg_core::Error::Tool { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn missing_ffprobe_is_reported() {
        let err = probe_duration(&ToolRegistry::default(), Path::new("clip.mp4"))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("ffprobe not found"), "got: {err}");
    }
}
