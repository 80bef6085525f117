//! # sg-engine
//!
//! The transcoding engine boundary for shortgen.
//!
//! This crate provides:
//!
//! - **Engine trait** ([`TranscodeEngine`]) -- the single-instance,
//!   non-reentrant engine contract, and [`FfmpegEngine`], its ffmpeg-backed
//!   implementation.
//! - **Argument contract** ([`args`]) -- the exact per-clip argument list and
//!   output naming.
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support and streamed stderr.
//! - **Engine storage** ([`Workspace`]) -- flat named files in a temporary
//!   directory.
//! - **Progress** ([`ProgressSender`], [`progress::FfmpegProgressParser`]).
//! - **Duration probe** ([`probe_duration`]).

pub mod args;
pub mod command;
pub mod engine;
pub mod probe;
pub mod progress;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use engine::{FfmpegEngine, TranscodeEngine};
pub use probe::probe_duration;
pub use progress::{to_percent, ProgressSender};
pub use tools::{ToolInfo, ToolRegistry};
pub use workspace::Workspace;
