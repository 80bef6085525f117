//! Working storage for the transcoding engine.
//!
//! A [`Workspace`] is a private temporary directory holding the engine's named
//! files (the staged input and the produced clips). Names are flat: a name
//! that would escape the directory is rejected. The directory and everything
//! in it is removed when the workspace is dropped.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tempfile::TempDir;

/// Flat, named file storage backed by a temporary directory.
#[derive(Debug)]
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a new workspace under `parent`, or under the system temp dir
    /// when `parent` is `None`.
    pub fn new(parent: Option<&Path>) -> sg_core::Result<Self> {
        let builder_result = match parent {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                tempfile::Builder::new().prefix("shortgen-").tempdir_in(dir)
            }
            None => tempfile::Builder::new().prefix("shortgen-").tempdir(),
        };

        let temp_dir = builder_result.map_err(|e| {
            sg_core::Error::tool("workspace", format!("failed to create temp dir: {e}"))
        })?;

        Ok(Self { temp_dir })
    }

    /// Path to the workspace directory.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Resolve a flat file name to its path inside the workspace.
    pub fn path_of(&self, name: &str) -> sg_core::Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.temp_dir.path().join(name)),
            _ => Err(sg_core::Error::Validation(format!(
                "invalid workspace file name: {name:?}"
            ))),
        }
    }

    /// Store `bytes` under `name`, replacing any previous content.
    pub async fn write(&self, name: &str, bytes: &[u8]) -> sg_core::Result<()> {
        let path = self.path_of(name)?;
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    /// Read the file stored under `name`.
    pub async fn read(&self, name: &str) -> sg_core::Result<Bytes> {
        let path = self.path_of(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(sg_core::Error::not_found("engine file", name))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove `name` if present. Missing files are not an error.
    pub async fn remove(&self, name: &str) -> sg_core::Result<()> {
        let path = self.path_of(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a file named `name` currently exists.
    pub fn contains(&self, name: &str) -> bool {
        self.path_of(name).map(|p| p.is_file()).unwrap_or(false)
    }
}
