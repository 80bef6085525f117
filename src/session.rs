//! One command-line generation session.
//!
//! Plays the part of the presentation layer: picks the file, reports its
//! duration, applies parameters, issues the generate request and downloads
//! the resulting clips.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use sg_core::events::{Event, EventPayload};
use sg_core::{GenerationMode, GenerationParams, SourceMedia};
use sg_engine::ToolRegistry;
use sg_pipeline::{BatchController, BatchOutcome};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::output::{write_artifacts, WrittenClip};

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub input: PathBuf,
    pub mode: GenerationMode,
    pub params: GenerationParams,
    /// Known duration; probed with ffprobe when absent.
    pub duration: Option<f64>,
    pub out_dir: PathBuf,
    /// Cancelled when the user interrupts. Checked before each step that
    /// would hand work to the controller.
    pub interrupt: CancellationToken,
}

/// Run a full session against `controller` and write the clips out.
pub async fn run_generate(
    controller: &BatchController,
    tools: &ToolRegistry,
    request: &GenerateRequest,
) -> Result<Vec<WrittenClip>> {
    if !request.input.is_file() {
        bail!("Input file does not exist: {}", request.input.display());
    }

    controller
        .initialize()
        .await
        .map_err(|e| {
            let message = e.user_message();
            anyhow::Error::new(e).context(message)
        })?;

    ensure_running(&request.interrupt)?;
    let bytes = tokio::fs::read(&request.input)
        .await
        .with_context(|| format!("failed to read {}", request.input.display()))?;
    let name = request
        .input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "input".to_string());
    ensure_running(&request.interrupt)?;
    if !controller.load_source(SourceMedia::new(name, bytes)) {
        bail!("Source was not accepted while a batch is running");
    }

    let duration = match request.duration {
        Some(secs) => secs,
        None => probe(tools, &request.input).await?,
    };
    if !controller.report_duration(duration) {
        bail!("Unusable source duration: {duration}");
    }

    controller.set_params(request.params.clone());

    ensure_running(&request.interrupt)?;
    match controller.generate(request.mode).await {
        Ok(BatchOutcome::Completed(artifacts)) => {
            if artifacts.is_empty() {
                tracing::warn!("Nothing to generate: every window was too short");
            }
            let written = write_artifacts(controller, &artifacts, &request.out_dir).await?;
            Ok(written)
        }
        Ok(BatchOutcome::Superseded) => bail!("Generation was interrupted"),
        Ok(BatchOutcome::Ignored) => bail!("Generation request was not accepted"),
        Err(e) => {
            let message = controller
                .state()
                .message
                .unwrap_or_else(|| e.user_message());
            Err(anyhow::Error::new(e).context(message))
        }
    }
}

fn ensure_running(interrupt: &CancellationToken) -> Result<()> {
    if interrupt.is_cancelled() {
        bail!("Generation was interrupted");
    }
    Ok(())
}

async fn probe(tools: &ToolRegistry, path: &Path) -> Result<f64> {
    match sg_engine::probe_duration(tools, path).await? {
        Some(secs) => Ok(secs),
        None => bail!(
            "Could not determine the duration of {}; pass --duration",
            path.display()
        ),
    }
}

/// Log batch events until the bus closes. Runs as a background task.
pub async fn log_events(mut rx: broadcast::Receiver<Event>) {
    loop {
        match rx.recv().await {
            Ok(event) => log_event(&event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::debug!("Event log lagged by {n} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn log_event(event: &Event) {
    match &event.payload {
        EventPayload::JobStarted {
            index,
            total,
            start_secs,
            duration_secs,
            ..
        } => tracing::info!("[{index}/{total}] cutting {start_secs}s +{duration_secs}s"),
        EventPayload::JobProgress { index, percent, .. } => {
            tracing::debug!("[{index}] {percent}%")
        }
        EventPayload::JobSkipped { index, duration_secs, .. } => {
            tracing::info!("[{index}] skipped ({duration_secs}s is too short)")
        }
        EventPayload::JobCompleted { filename, size_bytes, .. } => {
            tracing::info!("{filename} done ({size_bytes} bytes)")
        }
        EventPayload::BatchFailed { error, .. } => tracing::warn!("Batch failed: {error}"),
        EventPayload::SessionReset { released } => {
            tracing::info!("Session reset, {released} clips released")
        }
        _ => tracing::trace!(payload = ?event.payload, "event"),
    }
}

/// Convenience for callers that own the controller behind an `Arc`.
pub async fn run_generate_shared(
    controller: Arc<BatchController>,
    tools: ToolRegistry,
    request: GenerateRequest,
) -> Result<Vec<WrittenClip>> {
    run_generate(&controller, &tools, &request).await
}
