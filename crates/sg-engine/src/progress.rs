//! Engine progress reporting.
//!
//! Engines report progress as a fraction in `[0.0, 1.0]` through a
//! [`ProgressSender`]. For ffmpeg the fraction is derived from the
//! `-progress pipe:2` key/value blocks by [`FfmpegProgressParser`].

/// Sender for reporting progress from within an engine call.
///
/// Wraps a callback that receives the completed fraction of the current job.
pub struct ProgressSender {
    callback: Box<dyn Fn(f64) + Send + Sync>,
}

impl ProgressSender {
    /// Create a new sender from the given callback.
    pub fn new(callback: impl Fn(f64) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_| {}),
        }
    }

    /// Report progress. Values are clamped into `[0.0, 1.0]`; NaN is dropped.
    pub fn send(&self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }
        (self.callback)(fraction.clamp(0.0, 1.0));
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}

/// Whole percent for a progress fraction: `floor(fraction * 100)`.
pub fn to_percent(fraction: f64) -> u8 {
    if fraction.is_nan() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * 100.0).floor() as u8
}

/// Incremental parser for ffmpeg `-progress` output.
///
/// Feed it stderr lines; it yields a fraction each time a `progress=` line
/// closes a block. `progress=end` always yields `1.0`.
#[derive(Debug, Clone)]
pub struct FfmpegProgressParser {
    total_secs: Option<f64>,
    out_time_us: Option<i64>,
}

impl FfmpegProgressParser {
    /// `total_secs` is the expected output duration (the `-t` value).
    pub fn new(total_secs: Option<f64>) -> Self {
        Self {
            total_secs,
            out_time_us: None,
        }
    }

    /// Consume one line, returning a fraction when a block completes.
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        let line = line.trim();
        if let Some(val) = line.strip_prefix("out_time_us=") {
            self.out_time_us = val.parse::<i64>().ok();
            None
        } else if let Some(val) = line.strip_prefix("out_time_ms=") {
            // Despite the name ffmpeg reports microseconds here too.
            if self.out_time_us.is_none() {
                self.out_time_us = val.parse::<i64>().ok();
            }
            None
        } else if let Some(state) = line.strip_prefix("progress=") {
            if state == "end" {
                return Some(1.0);
            }
            let out_us = self.out_time_us.take()?;
            let total = self.total_secs.filter(|t| *t > 0.0)?;
            let elapsed = out_us.max(0) as f64 / 1_000_000.0;
            Some((elapsed / total).clamp(0.0, 1.0))
        } else {
            None
        }
    }
}
