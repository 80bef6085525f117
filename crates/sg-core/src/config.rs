//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON. Every section
//! defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::media::GenerationParams;
use crate::Error;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub engine: EngineConfig,
    /// Parameters used when the caller does not override them.
    pub generation: GenerationParams,
    pub batch: BatchConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None`, the file does not exist, or it cannot be parsed.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .generation
            .warnings()
            .into_iter()
            .map(|w| format!("generation: {w}"))
            .collect();

        let threshold = self.batch.min_segment_secs;
        if !threshold.is_finite() || threshold < 0.0 {
            warnings.push(format!(
                "batch.min_segment_secs {threshold} is not a non-negative number; 0.5 will be used"
            ));
        }

        if self.engine.timeout_secs == 0 {
            warnings.push("engine.timeout_secs is 0; every transcode would time out".into());
        }

        for (name, path) in [
            ("ffmpeg_path", &self.tools.ffmpeg_path),
            ("ffprobe_path", &self.tools.ffprobe_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!(
                        "tools.{name} {} does not exist; falling back to PATH",
                        p.display()
                    ));
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Transcoding engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Parent directory for the engine's working storage. `None` uses the
    /// system temp dir.
    pub work_dir: Option<PathBuf>,
    /// Upper bound on a single ffmpeg process, in seconds.
    #[serde(default = "default_engine_timeout")]
    pub timeout_secs: u64,
}

fn default_engine_timeout() -> u64 {
    86_400
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            timeout_secs: default_engine_timeout(),
        }
    }
}

/// Batch orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Windows whose finalized duration is at or below this many seconds are
    /// skipped instead of transcoded.
    #[serde(default = "default_min_segment_secs")]
    pub min_segment_secs: f64,
}

fn default_min_segment_secs() -> f64 {
    0.5
}

impl BatchConfig {
    /// The configured threshold, or the default when it is unusable.
    pub fn effective_min_segment_secs(&self) -> f64 {
        if self.min_segment_secs.is_finite() && self.min_segment_secs >= 0.0 {
            self.min_segment_secs
        } else {
            default_min_segment_secs()
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            min_segment_secs: default_min_segment_secs(),
        }
    }
}

/// Where produced clips are written by the command-line front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./shorts"),
        }
    }
}
