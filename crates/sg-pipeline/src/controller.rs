//! Batch controller: the session state machine.
//!
//! ```text
//! Idle -> Loading -> Ready -> Generating -> {Done, Failed} -> Ready
//! ```
//!
//! The controller owns the engine behind an async mutex (the exclusive lease)
//! and the session state behind a short synchronous lock that is never held
//! across an `.await`. Every batch is tagged with the session generation
//! number; `reset` bumps it, so results from a batch that was running at the
//! time are discarded instead of published.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sg_core::config::Config;
use sg_core::events::{EventBus, EventPayload};
use sg_core::{ArtifactHandle, BatchId, Error, GenerationMode, GenerationParams, SourceMedia};
use sg_engine::{to_percent, ProgressSender, TranscodeEngine};
use tokio_util::sync::CancellationToken;

use crate::artifacts::{Artifact, ArtifactMeta, ArtifactStore};
use crate::planner::{plan, single_window};
use crate::runner::{finalize_duration, run_job, TranscodeJob};

const SINGLE_FAILURE_MESSAGE: &str = "Failed to generate clip.";
const AUTO_SPLIT_FAILURE_MESSAGE: &str = "Failed to generate. Try shorter durations or a smaller file.";

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Idle,
    Loading,
    Ready,
    Generating,
    Done,
    Failed,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchStatus::Idle => "idle",
            BatchStatus::Loading => "loading",
            BatchStatus::Ready => "ready",
            BatchStatus::Generating => "generating",
            BatchStatus::Done => "done",
            BatchStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Which job of the running batch is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCursor {
    /// Window index (1-based).
    pub index: usize,
    /// Number of planned windows.
    pub total: usize,
}

/// Snapshot of the live batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchState {
    pub status: BatchStatus,
    /// Percent of the current job, `0..=100`. Resets to 0 at every job
    /// start; that reset is announced by `JobStarted`, so `JobProgress`
    /// events only carry values above it.
    pub progress_percent: u8,
    /// Completed artifacts in window order. Empty until the batch is done.
    pub artifacts: Vec<Artifact>,
    pub mode: Option<GenerationMode>,
    pub current_job: Option<JobCursor>,
    /// User-visible status or failure text.
    pub message: Option<String>,
    pub batch_id: Option<BatchId>,
}

impl BatchState {
    fn with_status(status: BatchStatus) -> Self {
        Self {
            status,
            progress_percent: 0,
            artifacts: Vec::new(),
            mode: None,
            current_job: None,
            message: None,
            batch_id: None,
        }
    }
}

impl Default for BatchState {
    fn default() -> Self {
        Self::with_status(BatchStatus::Idle)
    }
}

/// Result of a `generate` request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// The request was not accepted (no source, engine not ready, or a batch
    /// is already running).
    Ignored,
    /// Every non-skipped window produced an artifact.
    Completed(Vec<Artifact>),
    /// A reset happened while the batch ran; its results were dropped.
    Superseded,
}

/// Orchestration knobs taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    /// Windows whose finalized duration is at or below this are skipped.
    pub min_segment_secs: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            min_segment_secs: 0.5,
        }
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            min_segment_secs: config.batch.effective_min_segment_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum EngineState {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug)]
struct SessionState {
    batch: BatchState,
    params: GenerationParams,
    source: Option<Arc<SourceMedia>>,
    engine: EngineState,
    generation: u64,
    cancel: CancellationToken,
}

impl SessionState {
    /// Status to fall back to when there is no batch to show.
    fn resting_status(&self) -> BatchStatus {
        match self.engine {
            EngineState::Uninitialized => BatchStatus::Idle,
            EngineState::Loading => BatchStatus::Loading,
            EngineState::Ready => BatchStatus::Ready,
            EngineState::Failed(_) => BatchStatus::Failed,
        }
    }

    fn resting_batch(&self) -> BatchState {
        let mut batch = BatchState::with_status(self.resting_status());
        if let EngineState::Failed(msg) = &self.engine {
            batch.message = Some(msg.clone());
        }
        batch
    }
}

/// Drives generation requests for one session.
pub struct BatchController {
    engine: tokio::sync::Mutex<Box<dyn TranscodeEngine>>,
    engine_name: &'static str,
    state: Arc<Mutex<SessionState>>,
    artifacts: ArtifactStore,
    events: Arc<EventBus>,
    settings: ControllerSettings,
}

impl BatchController {
    pub fn new(
        engine: Box<dyn TranscodeEngine>,
        settings: ControllerSettings,
        events: Arc<EventBus>,
    ) -> Self {
        let engine_name = engine.name();
        Self {
            engine: tokio::sync::Mutex::new(engine),
            engine_name,
            state: Arc::new(Mutex::new(SessionState {
                batch: BatchState::default(),
                params: GenerationParams::default(),
                source: None,
                engine: EngineState::Uninitialized,
                generation: 0,
                cancel: CancellationToken::new(),
            })),
            artifacts: ArtifactStore::new(),
            events,
            settings,
        }
    }

    /// Builder: start the session with these parameters (clamped).
    pub fn with_params(self, params: GenerationParams) -> Self {
        self.state.lock().params = params.clamped();
        self
    }

    /// Snapshot of the live batch state.
    pub fn state(&self) -> BatchState {
        self.state.lock().batch.clone()
    }

    pub fn params(&self) -> GenerationParams {
        self.state.lock().params.clone()
    }

    pub fn source_duration(&self) -> Option<f64> {
        self.state.lock().source.as_ref().and_then(|s| s.duration_secs)
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Bytes of a live artifact, for download.
    pub fn artifact_bytes(&self, handle: ArtifactHandle) -> Option<Bytes> {
        self.artifacts.get(handle)
    }

    /// One-time engine initialization.
    ///
    /// Only the first call does anything. A failure is fatal: the session
    /// stays `Failed` and later requests are ignored.
    pub async fn initialize(&self) -> sg_core::Result<()> {
        {
            let mut st = self.state.lock();
            if st.engine != EngineState::Uninitialized {
                tracing::debug!("Engine initialization already attempted");
                return Ok(());
            }
            st.engine = EngineState::Loading;
            st.batch.status = BatchStatus::Loading;
        }
        self.events.publish(EventPayload::EngineLoading {
            engine: self.engine_name.to_string(),
        });
        tracing::info!(engine = self.engine_name, "Initializing engine");

        let result = {
            let mut engine = self.engine.lock().await;
            engine.initialize().await
        };

        let mut st = self.state.lock();
        match result {
            Ok(()) => {
                st.engine = EngineState::Ready;
                if st.batch.status == BatchStatus::Loading {
                    st.batch.status = BatchStatus::Ready;
                }
                self.events.publish(EventPayload::EngineReady {
                    engine: self.engine_name.to_string(),
                });
                tracing::info!(engine = self.engine_name, "Engine ready");
                Ok(())
            }
            Err(e) => {
                let err = match e {
                    Error::Initialization(msg) => Error::Initialization(msg),
                    other => Error::Initialization(other.to_string()),
                };
                let msg = err.user_message();
                st.engine = EngineState::Failed(msg.clone());
                st.batch = BatchState::with_status(BatchStatus::Failed);
                st.batch.message = Some(msg);
                self.events.publish(EventPayload::EngineFailed {
                    error: err.to_string(),
                });
                tracing::error!("Engine initialization failed: {err}");
                Err(err)
            }
        }
    }

    /// Select a new source. Clears the current batch and releases its
    /// artifacts. Refused while a batch is generating.
    pub fn load_source(&self, source: SourceMedia) -> bool {
        let mut st = self.state.lock();
        if st.batch.status == BatchStatus::Generating {
            tracing::warn!("Ignoring new source while a batch is generating");
            return false;
        }

        let released = self.artifacts.release_all();
        st.batch = st.resting_batch();

        self.events.publish(EventPayload::SourceLoaded {
            source_id: source.id,
            name: source.name.clone(),
            size_bytes: source.bytes.len() as u64,
        });
        tracing::info!(source_id = %source.id, name = %source.name, released, "Source loaded");

        let duration = source.duration_secs;
        let source_id = source.id;
        st.source = Some(Arc::new(source));
        if let Some(duration_secs) = duration {
            self.events.publish(EventPayload::DurationReported {
                source_id,
                duration_secs,
            });
        }
        true
    }

    /// Record the source duration once it is known. NaN, infinite and
    /// negative values are ignored, and so is any report after the first:
    /// a known duration never changes.
    pub fn report_duration(&self, secs: f64) -> bool {
        if !secs.is_finite() || secs < 0.0 {
            tracing::debug!(secs, "Ignoring unusable duration report");
            return false;
        }
        let mut st = self.state.lock();
        if st.batch.status == BatchStatus::Generating {
            tracing::debug!(secs, "Ignoring duration report while a batch is generating");
            return false;
        }
        let Some(source) = st.source.as_mut() else {
            return false;
        };
        if let Some(known) = source.duration_secs {
            tracing::debug!(secs, known, "Source duration already known");
            return false;
        }
        Arc::make_mut(source).duration_secs = Some(secs);
        self.events.publish(EventPayload::DurationReported {
            source_id: source.id,
            duration_secs: secs,
        });
        true
    }

    /// Replace the generation parameters. Values are clamped; the call is
    /// refused while a batch is generating.
    pub fn set_params(&self, params: GenerationParams) -> bool {
        let mut st = self.state.lock();
        if st.batch.status == BatchStatus::Generating {
            return false;
        }
        for warning in params.warnings() {
            tracing::debug!("Clamping parameter: {warning}");
        }
        st.params = params.clamped();
        true
    }

    /// Run one generation request to completion.
    ///
    /// Returns `Err(Error::Transcode { .. })` when a job failed; the batch is
    /// then `Failed` and holds no artifacts.
    pub async fn generate(&self, mode: GenerationMode) -> sg_core::Result<BatchOutcome> {
        let (generation, batch_id, source, params, cancel, windows) = {
            let mut st = self.state.lock();
            let accepts = st.engine == EngineState::Ready
                && matches!(
                    st.batch.status,
                    BatchStatus::Ready | BatchStatus::Done | BatchStatus::Failed
                );
            let source = match (&st.source, accepts) {
                (Some(source), true) => source.clone(),
                _ => {
                    tracing::debug!(status = %st.batch.status, "Ignoring generate request");
                    return Ok(BatchOutcome::Ignored);
                }
            };

            self.artifacts.release_all();

            let duration = source.duration_or_zero();
            let p = &st.params;
            let windows = match mode {
                GenerationMode::Single => vec![single_window(
                    duration,
                    p.start_offset_secs,
                    p.segment_length_secs,
                )],
                GenerationMode::AutoSplit => plan(duration, p.start_offset_secs, p.segment_length_secs),
            };

            let batch_id = BatchId::new();
            st.batch = BatchState::with_status(BatchStatus::Generating);
            st.batch.mode = Some(mode);
            st.batch.batch_id = Some(batch_id);
            st.cancel = CancellationToken::new();

            self.events.publish(EventPayload::BatchStarted {
                batch_id,
                mode,
                planned: windows.len(),
            });
            (st.generation, batch_id, source, st.params.clone(), st.cancel.clone(), windows)
        };

        tracing::info!(%batch_id, %mode, planned = windows.len(), "Batch started");

        let mut engine = self.engine.lock().await;
        let total = windows.len();
        let mut produced: Vec<Artifact> = Vec::new();
        let mut output_index = 0;

        for window in windows {
            let duration_secs = finalize_duration(&window, source.duration_or_zero());

            {
                let mut st = self.state.lock();
                if st.generation != generation {
                    drop(st);
                    return Ok(self.discard(batch_id));
                }
                if duration_secs <= self.settings.min_segment_secs {
                    tracing::debug!(%batch_id, index = window.index, duration_secs, "Skipping short window");
                    self.events.publish(EventPayload::JobSkipped {
                        batch_id,
                        index: window.index,
                        duration_secs,
                    });
                    continue;
                }
                st.batch.progress_percent = 0;
                st.batch.current_job = Some(JobCursor {
                    index: window.index,
                    total,
                });
                self.events.publish(EventPayload::JobStarted {
                    batch_id,
                    index: window.index,
                    total,
                    start_secs: window.start_secs,
                    duration_secs,
                });
            }

            output_index += 1;
            let job = TranscodeJob {
                source: &source,
                window,
                params: &params,
                output_index,
            };
            let progress = self.progress_sender(generation, batch_id, window.index);
            let result = run_job(&mut **engine, &job, &progress, &cancel).await;

            let mut st = self.state.lock();
            if st.generation != generation {
                drop(st);
                if let Ok(clip) = &result {
                    tracing::debug!(filename = %clip.filename, "Dropping clip from superseded batch");
                }
                return Ok(self.discard(batch_id));
            }

            match result {
                Ok(clip) => {
                    let artifact = self.artifacts.register(
                        clip.bytes,
                        ArtifactMeta {
                            filename: clip.filename,
                            start_secs: clip.window.start_secs,
                            duration_secs: clip.duration_secs,
                        },
                    );
                    self.events.publish(EventPayload::JobCompleted {
                        batch_id,
                        index: window.index,
                        handle: artifact.handle,
                        filename: artifact.filename.clone(),
                        size_bytes: artifact.size_bytes,
                    });
                    tracing::info!(
                        %batch_id,
                        index = window.index,
                        filename = %artifact.filename,
                        size_bytes = artifact.size_bytes,
                        "Job completed"
                    );
                    produced.push(artifact);
                }
                Err(e) => {
                    // All or nothing: clips from earlier jobs go too.
                    for artifact in &produced {
                        self.artifacts.release(artifact.handle);
                    }
                    let message = match mode {
                        GenerationMode::Single => SINGLE_FAILURE_MESSAGE,
                        GenerationMode::AutoSplit => AUTO_SPLIT_FAILURE_MESSAGE,
                    };
                    st.batch.status = BatchStatus::Failed;
                    st.batch.current_job = None;
                    st.batch.artifacts.clear();
                    st.batch.message = Some(message.to_string());
                    self.events.publish(EventPayload::BatchFailed {
                        batch_id,
                        error: e.to_string(),
                    });
                    tracing::error!(%batch_id, "Batch failed: {e}");
                    return Err(e);
                }
            }
        }

        let mut st = self.state.lock();
        if st.generation != generation {
            drop(st);
            return Ok(self.discard(batch_id));
        }
        st.batch.status = BatchStatus::Done;
        st.batch.current_job = None;
        st.batch.progress_percent = 100;
        st.batch.artifacts = produced.clone();
        self.events.publish(EventPayload::BatchCompleted {
            batch_id,
            artifacts: produced.len(),
        });
        tracing::info!(%batch_id, artifacts = produced.len(), "Batch completed");

        Ok(BatchOutcome::Completed(produced))
    }

    /// Hard interrupt: drop the source and the batch and release every
    /// artifact. A job in flight finishes in the engine but its result is
    /// thrown away. Returns the number of artifacts released.
    pub fn reset(&self) -> usize {
        let mut st = self.state.lock();
        st.generation += 1;
        st.cancel.cancel();
        let released = self.artifacts.release_all();
        st.source = None;
        st.batch = st.resting_batch();
        self.events.publish(EventPayload::SessionReset { released });
        tracing::info!(released, "Session reset");
        released
    }

    /// Teardown: abandon any running batch and release every artifact.
    pub fn shutdown(&self) {
        let mut st = self.state.lock();
        st.generation += 1;
        st.cancel.cancel();
        let released = self.artifacts.release_all();
        if released > 0 {
            tracing::debug!(released, "Released artifacts on shutdown");
        }
    }

    fn discard(&self, batch_id: BatchId) -> BatchOutcome {
        self.events.publish(EventPayload::BatchDiscarded { batch_id });
        tracing::info!(%batch_id, "Discarding results of superseded batch");
        BatchOutcome::Superseded
    }

    /// Publishes `JobProgress` on every change of the job percent. The
    /// starting 0 is never repeated as a progress event.
    fn progress_sender(&self, generation: u64, batch_id: BatchId, index: usize) -> ProgressSender {
        let state = Arc::clone(&self.state);
        let events = Arc::clone(&self.events);
        ProgressSender::new(move |fraction| {
            let percent = to_percent(fraction);
            let mut st = state.lock();
            if st.generation != generation || st.batch.progress_percent == percent {
                return;
            }
            st.batch.progress_percent = percent;
            events.publish(EventPayload::JobProgress {
                batch_id,
                index,
                percent,
            });
        })
    }
}

impl Drop for BatchController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for BatchController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchController")
            .field("engine", &self.engine_name)
            .field("status", &self.state.lock().batch.status)
            .field("live_artifacts", &self.artifacts.live_count())
            .finish()
    }
}
