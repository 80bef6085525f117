//! Artifact lifecycle management.
//!
//! The [`ArtifactStore`] owns every produced clip buffer from registration to
//! release. Callers only hold [`ArtifactHandle`]s and read bytes back through
//! the store; a released handle resolves to nothing.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sg_core::ArtifactHandle;

/// Describes a clip before it is registered.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactMeta {
    pub filename: String,
    pub start_secs: f64,
    pub duration_secs: f64,
}

/// A registered output clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub handle: ArtifactHandle,
    /// `short_NN.mp4`, unique within its batch.
    pub filename: String,
    pub size_bytes: u64,
    pub start_secs: f64,
    pub duration_secs: f64,
}

/// Thread-safe map from handle to buffer with explicit release.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    entries: Mutex<HashMap<ArtifactHandle, Bytes>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `bytes` and hand out a fresh handle for them.
    pub fn register(&self, bytes: Bytes, meta: ArtifactMeta) -> Artifact {
        let handle = ArtifactHandle::new();
        let artifact = Artifact {
            handle,
            filename: meta.filename,
            size_bytes: bytes.len() as u64,
            start_secs: meta.start_secs,
            duration_secs: meta.duration_secs,
        };
        self.entries.lock().insert(handle, bytes);
        tracing::debug!(%handle, filename = %artifact.filename, size_bytes = artifact.size_bytes, "Registered artifact");
        artifact
    }

    /// Revoke one handle. Returns whether it was live.
    pub fn release(&self, handle: ArtifactHandle) -> bool {
        let released = self.entries.lock().remove(&handle).is_some();
        if released {
            tracing::debug!(%handle, "Released artifact");
        }
        released
    }

    /// Revoke every live handle, returning how many there were.
    pub fn release_all(&self) -> usize {
        let drained: Vec<Bytes> = self.entries.lock().drain().map(|(_, b)| b).collect();
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "Released all artifacts");
        }
        drained.len()
    }

    /// Shared read access to a live artifact's bytes.
    pub fn get(&self, handle: ArtifactHandle) -> Option<Bytes> {
        self.entries.lock().get(&handle).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Total size of all live buffers.
    pub fn live_bytes(&self) -> u64 {
        self.entries.lock().values().map(|b| b.len() as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> ArtifactMeta {
        ArtifactMeta {
            filename: name.into(),
            start_secs: 0.0,
            duration_secs: 15.0,
        }
    }

    #[test]
    fn register_then_read_back() {
        let store = ArtifactStore::new();
        let a = store.register(Bytes::from_static(b"clip-one"), meta("short_01.mp4"));
        assert_eq!(a.size_bytes, 8);
        assert_eq!(a.filename, "short_01.mp4");
        assert_eq!(store.get(a.handle).as_deref(), Some(&b"clip-one"[..]));
        assert_eq!(store.live_count(), 1);
        assert_eq!(store.live_bytes(), 8);
    }

    #[test]
    fn handles_are_unique() {
        let store = ArtifactStore::new();
        let a = store.register(Bytes::from_static(b"a"), meta("short_01.mp4"));
        let b = store.register(Bytes::from_static(b"a"), meta("short_01.mp4"));
        assert_ne!(a.handle, b.handle);
    }

    #[test]
    fn release_revokes_handle() {
        let store = ArtifactStore::new();
        let a = store.register(Bytes::from_static(b"abc"), meta("short_01.mp4"));
        assert!(store.release(a.handle));
        assert!(store.get(a.handle).is_none());
        assert!(!store.release(a.handle));
        assert_eq!(store.live_bytes(), 0);
    }

    #[test]
    fn release_all_empties_store() {
        let store = ArtifactStore::new();
        let handles: Vec<_> = (1..=3)
            .map(|i| {
                store
                    .register(Bytes::from(vec![0u8; 10]), meta(&format!("short_{i:02}.mp4")))
                    .handle
            })
            .collect();
        assert_eq!(store.live_bytes(), 30);
        assert_eq!(store.release_all(), 3);
        assert_eq!(store.live_count(), 0);
        assert!(handles.iter().all(|h| store.get(*h).is_none()));
        assert_eq!(store.release_all(), 0);
    }
}
