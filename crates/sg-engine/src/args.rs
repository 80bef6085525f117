//! The transcode argument contract.
//!
//! Every clip is cut with exactly this argument list (order included):
//!
//! ```text
//! -ss <start> -t <duration> -i input.mp4
//! -vf scale=-2:<H>,crop=<W>:<H> -r 30 -c:v libx264
//! -preset <preset> -crf <crf> -movflags faststart -an short_<NN>.mp4
//! ```
//!
//! Engines may add their own process-level flags around it but must not alter
//! it.

use sg_core::GenerationParams;

/// Name under which the source bytes are staged in engine storage.
pub const INPUT_NAME: &str = "input.mp4";

/// Fixed output frame rate.
pub const OUTPUT_FRAME_RATE: u32 = 30;

/// Fixed H.264 encoder.
pub const VIDEO_CODEC: &str = "libx264";

/// File name for the clip with the given 1-based output index.
pub fn output_filename(index: usize) -> String {
    format!("short_{index:02}.mp4")
}

/// Shortest round-trip decimal form of a seconds value (`15`, `2.5`, `30.3`).
pub fn format_secs(secs: f64) -> String {
    if secs == 0.0 || !secs.is_finite() {
        return "0".to_string();
    }
    secs.to_string()
}

/// Scale to the target height keeping aspect ratio, then center-crop.
pub fn video_filter(out_width: u32, out_height: u32) -> String {
    format!("scale=-2:{out_height},crop={out_width}:{out_height}")
}

/// Build the full argument list for one clip.
pub fn transcode_args(
    start_secs: f64,
    duration_secs: f64,
    input: &str,
    output: &str,
    params: &GenerationParams,
) -> Vec<String> {
    vec![
        "-ss".into(),
        format_secs(start_secs.max(0.0)),
        "-t".into(),
        format_secs(duration_secs),
        "-i".into(),
        input.into(),
        "-vf".into(),
        video_filter(params.out_width, params.out_height),
        "-r".into(),
        OUTPUT_FRAME_RATE.to_string(),
        "-c:v".into(),
        VIDEO_CODEC.into(),
        "-preset".into(),
        params.preset.as_str().into(),
        "-crf".into(),
        params.crf.to_string(),
        "-movflags".into(),
        "faststart".into(),
        "-an".into(),
        output.into(),
    ]
}

/// The value following `-t`, used to turn engine timestamps into a fraction.
pub fn duration_from_args(args: &[String]) -> Option<f64> {
    args.windows(2)
        .find(|pair| pair[0] == "-t")
        .and_then(|pair| pair[1].parse::<f64>().ok())
        .filter(|d| *d > 0.0)
}
