//! # sg-pipeline
//!
//! Orchestration of shorts generation.
//!
//! This crate provides:
//!
//! - **Segment planning** ([`planner`]) -- pure window computation for
//!   auto-split and single-clip requests.
//! - **Job runner** ([`run_job`]) -- one write / execute / read / delete
//!   round-trip through a [`TranscodeEngine`](sg_engine::TranscodeEngine).
//! - **[`ArtifactStore`]** -- handle-addressed clip buffers with explicit
//!   release.
//! - **[`BatchController`]** -- the session state machine: engine
//!   initialization, sequential job dispatch, progress, failure and reset.

pub mod artifacts;
pub mod controller;
pub mod planner;
pub mod runner;

// Re-export key types at the crate root.
pub use artifacts::{Artifact, ArtifactMeta, ArtifactStore};
pub use controller::{
    BatchController, BatchOutcome, BatchState, BatchStatus, ControllerSettings, JobCursor,
};
pub use planner::{plan, planned_count, single_window};
pub use runner::{finalize_duration, run_job, RenderedClip, TranscodeJob};
