//! Segment planning.
//!
//! Pure functions that turn a source duration plus the user's offset and
//! segment length into the ordered windows to transcode. Windows are not
//! truncated to the end of the source here; the runner finalizes each
//! duration at dispatch time.

use sg_core::SegmentWindow;

fn sanitize(secs: f64) -> f64 {
    if secs.is_finite() && secs > 0.0 {
        secs
    } else {
        0.0
    }
}

/// Plan the auto-split windows for a source of `duration_secs`.
///
/// Windows start at `offset`, `offset + step`, ... while the start stays
/// below `offset + floor(duration - offset)`, each `step = max(1, length)`
/// seconds long. Returns an empty plan when the offset is at or past the end.
pub fn plan(duration_secs: f64, start_offset_secs: u32, segment_length_secs: u32) -> Vec<SegmentWindow> {
    let duration = sanitize(duration_secs);
    let offset = f64::from(start_offset_secs);
    if duration <= offset {
        return Vec::new();
    }

    let total = (duration - offset).floor().max(0.0) as u64;
    let step = u64::from(segment_length_secs.max(1));

    (0..total)
        .step_by(step as usize)
        .enumerate()
        .map(|(i, t)| SegmentWindow {
            index: i + 1,
            start_secs: offset + t as f64,
            duration_secs: step as f64,
        })
        .collect()
}

/// The one window generated in single-clip mode.
///
/// Its duration is `min(length, duration - offset)`, floored at zero, so an
/// offset at or past the end yields a zero-length window that the controller
/// will skip.
pub fn single_window(duration_secs: f64, start_offset_secs: u32, segment_length_secs: u32) -> SegmentWindow {
    let duration = sanitize(duration_secs);
    let offset = f64::from(start_offset_secs);
    let length = f64::from(segment_length_secs.max(1));

    SegmentWindow {
        index: 1,
        start_secs: offset,
        duration_secs: length.min(duration - offset).max(0.0),
    }
}

/// Expected number of windows for the given inputs:
/// `ceil(max(0, floor(duration - offset)) / max(1, length))`.
pub fn planned_count(duration_secs: f64, start_offset_secs: u32, segment_length_secs: u32) -> usize {
    let duration = sanitize(duration_secs);
    let total = (duration - f64::from(start_offset_secs)).floor().max(0.0) as u64;
    let step = u64::from(segment_length_secs.max(1));
    total.div_ceil(step) as usize
}
