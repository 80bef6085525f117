//! Domain types shared across the shorts pipeline: encoder presets,
//! generation parameters, segment windows, and the source descriptor.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ids::SourceId;
use crate::Error;

/// Allowed segment length range in seconds.
pub const SEGMENT_LENGTH_RANGE: (u32, u32) = (1, 120);
/// Allowed constant rate factor range.
pub const CRF_RANGE: (u8, u8) = (18, 32);

// ---------------------------------------------------------------------------
// Preset
// ---------------------------------------------------------------------------

/// Encoder speed/efficiency tradeoff selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Ultrafast,
    Superfast,
    #[default]
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
}

impl Preset {
    /// Every preset, fastest first.
    pub const ALL: [Preset; 8] = [
        Preset::Ultrafast,
        Preset::Superfast,
        Preset::Veryfast,
        Preset::Faster,
        Preset::Fast,
        Preset::Medium,
        Preset::Slow,
        Preset::Slower,
    ];

    /// The name ffmpeg expects after `-preset`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Slower => "slower",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "unknown preset '{s}' (expected one of: {})",
                    Preset::ALL.map(|p| p.as_str()).join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// GenerationParams
// ---------------------------------------------------------------------------

/// User-tunable parameters for one generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub segment_length_secs: u32,
    pub start_offset_secs: u32,
    pub crf: u8,
    pub preset: Preset,
    pub out_width: u32,
    pub out_height: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            segment_length_secs: 15,
            start_offset_secs: 0,
            crf: 23,
            preset: Preset::Veryfast,
            out_width: 1080,
            out_height: 1920,
        }
    }
}

impl GenerationParams {
    /// Return a copy with every ranged field clamped into its allowed range.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            segment_length_secs: self
                .segment_length_secs
                .clamp(SEGMENT_LENGTH_RANGE.0, SEGMENT_LENGTH_RANGE.1),
            crf: self.crf.clamp(CRF_RANGE.0, CRF_RANGE.1),
            out_width: self.out_width.max(1),
            out_height: self.out_height.max(1),
            ..self.clone()
        }
    }

    /// Non-fatal observations about values that will be clamped or that break
    /// the vertical-framing convention.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let (lo, hi) = SEGMENT_LENGTH_RANGE;
        if !(lo..=hi).contains(&self.segment_length_secs) {
            warnings.push(format!(
                "segment_length_secs {} is outside [{lo}, {hi}] and will be clamped",
                self.segment_length_secs
            ));
        }

        let (lo, hi) = CRF_RANGE;
        if !(lo..=hi).contains(&self.crf) {
            warnings.push(format!(
                "crf {} is outside [{lo}, {hi}] and will be clamped",
                self.crf
            ));
        }

        if self.out_width > self.out_height {
            warnings.push(format!(
                "output {}x{} is wider than tall; shorts are usually vertical",
                self.out_width, self.out_height
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// SegmentWindow / GenerationMode
// ---------------------------------------------------------------------------

/// A `(start, duration)` span of the source to extract as one clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentWindow {
    /// 1-based sequence number within the plan.
    pub index: usize,
    pub start_secs: f64,
    pub duration_secs: f64,
}

impl fmt::Display for SegmentWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "window #{} ({}s +{}s)",
            self.index, self.start_secs, self.duration_secs
        )
    }
}

/// How a generation request carves up the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// One clip starting at the offset.
    Single,
    /// Split the whole video from the offset into fixed-length clips.
    AutoSplit,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMode::Single => f.write_str("single"),
            GenerationMode::AutoSplit => f.write_str("auto_split"),
        }
    }
}

// ---------------------------------------------------------------------------
// SourceMedia
// ---------------------------------------------------------------------------

/// The input video for a session.
#[derive(Debug, Clone)]
pub struct SourceMedia {
    pub id: SourceId,
    /// Display name (usually the file name).
    pub name: String,
    pub bytes: Bytes,
    /// Seconds, once the duration collaborator has reported it.
    pub duration_secs: Option<f64>,
}

impl SourceMedia {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            id: SourceId::new(),
            name: name.into(),
            bytes: bytes.into(),
            duration_secs: None,
        }
    }

    /// Builder: attach a known duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        if secs.is_finite() && secs >= 0.0 {
            self.duration_secs = Some(secs);
        }
        self
    }

    /// Known duration, or 0 while it is still unknown.
    pub fn duration_or_zero(&self) -> f64 {
        self.duration_secs.unwrap_or(0.0)
    }
}

/// Format seconds as `m:ss`.
pub fn human_duration(secs: f64) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    let total = secs.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
