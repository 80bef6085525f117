//! The transcoding engine boundary.
//!
//! A [`TranscodeEngine`] is single-instance, stateful and non-reentrant: it
//! owns a private named-file storage, and every method takes `&mut self` so a
//! caller must hold an exclusive lease to drive it. [`FfmpegEngine`] is the
//! production implementation backed by the native `ffmpeg` binary.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sg_core::config::{Config, EngineConfig};
use sg_core::Error;

use crate::args::duration_from_args;
use crate::command::ToolCommand;
use crate::progress::{FfmpegProgressParser, ProgressSender};
use crate::tools::ToolRegistry;
use crate::workspace::Workspace;

/// Flags the ffmpeg engine prepends to every invocation. They control the
/// process (overwrite, quiet banner, machine-readable progress on stderr) and
/// sit outside the transcode argument contract.
pub const FFMPEG_PROCESS_FLAGS: &[&str] = &["-y", "-hide_banner", "-nostats", "-progress", "pipe:2"];

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// An opaque transcoding engine driven with explicit argument lists.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Short engine name used in logs and events.
    fn name(&self) -> &'static str;

    /// Whether [`initialize`](Self::initialize) has completed successfully.
    fn is_ready(&self) -> bool;

    /// One-time initialization. Failures are reported as
    /// [`Error::Initialization`].
    async fn initialize(&mut self) -> sg_core::Result<()>;

    /// Place `bytes` in the engine's storage under `name`.
    async fn write_input(&mut self, name: &str, bytes: &[u8]) -> sg_core::Result<()>;

    /// Run one transform. `progress` receives fractions in `[0.0, 1.0]`.
    async fn execute(&mut self, args: &[String], progress: &ProgressSender) -> sg_core::Result<()>;

    /// Read a file the last transform produced.
    async fn read_output(&mut self, name: &str) -> sg_core::Result<Bytes>;

    /// Remove a file from the engine's storage.
    async fn delete_file(&mut self, name: &str) -> sg_core::Result<()>;
}

/// [`TranscodeEngine`] backed by the `ffmpeg` CLI and a temporary directory.
#[derive(Debug)]
pub struct FfmpegEngine {
    tools: ToolRegistry,
    config: EngineConfig,
    ffmpeg: Option<PathBuf>,
    workspace: Option<Workspace>,
}

impl FfmpegEngine {
    pub fn new(tools: ToolRegistry, config: EngineConfig) -> Self {
        Self {
            tools,
            config,
            ffmpeg: None,
            workspace: None,
        }
    }

    /// Build an engine from application config, discovering tools on `PATH`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(ToolRegistry::discover(&config.tools), config.engine.clone())
    }

    fn ready_parts(&self) -> sg_core::Result<(&PathBuf, &Workspace)> {
        match (&self.ffmpeg, &self.workspace) {
            (Some(ffmpeg), Some(ws)) => Ok((ffmpeg, ws)),
            _ => Err(Error::tool("ffmpeg", "engine used before initialization")),
        }
    }

    fn workspace(&self) -> sg_core::Result<&Workspace> {
        self.ready_parts().map(|(_, ws)| ws)
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn is_ready(&self) -> bool {
        self.ffmpeg.is_some() && self.workspace.is_some()
    }

    async fn initialize(&mut self) -> sg_core::Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        let ffmpeg = self
            .tools
            .require("ffmpeg")
            .map_err(|e| Error::Initialization(e.to_string()))?
            .to_path_buf();

        let output = ToolCommand::new(ffmpeg.clone())
            .arg("-version")
            .timeout(VERSION_CHECK_TIMEOUT)
            .execute()
            .await
            .map_err(|e| Error::Initialization(e.to_string()))?;

        let version = output.stdout.lines().next().unwrap_or("").to_string();

        let workspace = Workspace::new(self.config.work_dir.as_deref())
            .map_err(|e| Error::Initialization(e.to_string()))?;

        tracing::info!(
            path = %ffmpeg.display(),
            workspace = %workspace.dir().display(),
            "ffmpeg engine ready: {version}"
        );

        self.ffmpeg = Some(ffmpeg);
        self.workspace = Some(workspace);
        Ok(())
    }

    async fn write_input(&mut self, name: &str, bytes: &[u8]) -> sg_core::Result<()> {
        self.workspace()?.write(name, bytes).await
    }

    async fn execute(&mut self, args: &[String], progress: &ProgressSender) -> sg_core::Result<()> {
        let (ffmpeg, ws) = self.ready_parts()?;

        let mut cmd = ToolCommand::new(ffmpeg.clone());
        cmd.args(FFMPEG_PROCESS_FLAGS.iter().copied());
        cmd.args(args.iter().cloned());
        cmd.current_dir(ws.dir());
        cmd.timeout(Duration::from_secs(self.config.timeout_secs));

        tracing::debug!(args = ?cmd.get_args(), "Running ffmpeg");

        let mut parser = FfmpegProgressParser::new(duration_from_args(args));
        cmd.execute_with_stderr_lines(|line| {
            tracing::trace!(target: "sg_engine::ffmpeg", "{line}");
            if let Some(fraction) = parser.feed(line) {
                progress.send(fraction);
            }
        })
        .await?;

        Ok(())
    }

    async fn read_output(&mut self, name: &str) -> sg_core::Result<Bytes> {
        self.workspace()?.read(name).await
    }

    async fn delete_file(&mut self, name: &str) -> sg_core::Result<()> {
        self.workspace()?.remove(name).await
    }
}
