//! Transcode job runner: one engine round-trip per segment window.

use bytes::Bytes;
use sg_core::{Error, GenerationParams, SegmentWindow, SourceMedia};
use sg_engine::args::{output_filename, transcode_args, INPUT_NAME};
use sg_engine::{ProgressSender, TranscodeEngine};
use tokio_util::sync::CancellationToken;

/// Duration actually transcoded for `window`: the planned length, cut at the
/// end of the source.
pub fn finalize_duration(window: &SegmentWindow, source_duration_secs: f64) -> f64 {
    let source = if source_duration_secs.is_finite() {
        source_duration_secs
    } else {
        0.0
    };
    window.duration_secs.min((source - window.start_secs).max(0.0))
}

/// Everything needed to cut one clip.
#[derive(Debug, Clone, Copy)]
pub struct TranscodeJob<'a> {
    pub source: &'a SourceMedia,
    pub window: SegmentWindow,
    pub params: &'a GenerationParams,
    /// 1-based index among the clips of this batch that are not skipped.
    pub output_index: usize,
}

impl TranscodeJob<'_> {
    pub fn duration_secs(&self) -> f64 {
        finalize_duration(&self.window, self.source.duration_or_zero())
    }

    pub fn filename(&self) -> String {
        output_filename(self.output_index)
    }

    /// The engine argument list for this job.
    pub fn args(&self) -> Vec<String> {
        transcode_args(
            self.window.start_secs,
            self.duration_secs(),
            INPUT_NAME,
            &self.filename(),
            self.params,
        )
    }
}

/// Bytes produced by one successful job, not yet registered as an artifact.
#[derive(Debug, Clone)]
pub struct RenderedClip {
    pub filename: String,
    pub bytes: Bytes,
    pub window: SegmentWindow,
    /// Finalized duration that was passed to the engine.
    pub duration_secs: f64,
}

fn check_cancelled(cancel: &CancellationToken, window: &SegmentWindow) -> sg_core::Result<()> {
    if cancel.is_cancelled() {
        tracing::info!(index = window.index, "Job cancelled");
        return Err(Error::Cancelled(format!("job for {window}")));
    }
    Ok(())
}

/// Run one job: write input, execute, read output, delete output.
///
/// Cancellation is checked between engine steps only; an `execute` already in
/// flight runs to completion. Engine errors come back as
/// [`Error::Transcode`] for this job's window.
pub async fn run_job(
    engine: &mut dyn TranscodeEngine,
    job: &TranscodeJob<'_>,
    progress: &ProgressSender,
    cancel: &CancellationToken,
) -> sg_core::Result<RenderedClip> {
    let window = job.window;
    let filename = job.filename();
    let duration_secs = job.duration_secs();
    let transcode_err = |e: Error| match e {
        Error::Cancelled(_) => e,
        other => Error::transcode(window, other),
    };

    check_cancelled(cancel, &window)?;
    engine
        .write_input(INPUT_NAME, &job.source.bytes)
        .await
        .map_err(transcode_err)?;

    check_cancelled(cancel, &window)?;
    tracing::debug!(index = window.index, filename = %filename, duration_secs, "Executing job");
    engine
        .execute(&job.args(), progress)
        .await
        .map_err(transcode_err)?;

    let read = if cancel.is_cancelled() {
        Err(Error::Cancelled(format!("job for {window}")))
    } else {
        engine.read_output(&filename).await.map_err(transcode_err)
    };

    // The output is removed from engine storage whatever happened to the read.
    if let Err(e) = engine.delete_file(&filename).await {
        tracing::warn!(filename = %filename, "Failed to delete engine output: {e}");
    }

    let bytes = read?;
    Ok(RenderedClip {
        filename,
        bytes,
        window,
        duration_secs,
    })
}
