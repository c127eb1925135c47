//! Request-scoped temporary files and directories.
//!
//! Every file the pipeline writes to disk (an uploaded office document, the
//! renderer's output directory, a wrapped image PDF, a downloaded input) is a
//! [`TransientArtifact`]. Deletion is tied to `Drop`, so an early `?` return,
//! a converter error or a panic inside the request removes the file exactly
//! like the success path does. Names come from [`tempfile`] and are random
//! per artifact; concurrent requests sharing one temp root never collide.

use crate::error::DocmillError;
use std::io::Write;
use std::path::Path;
use tempfile::{Builder, TempDir, TempPath};
use tracing::{debug, warn};

const PREFIX: &str = "docmill-";

enum Inner {
    File(TempPath),
    Dir(TempDir),
}

/// A temporary file or directory deleted when dropped.
pub struct TransientArtifact {
    inner: Inner,
}

impl TransientArtifact {
    /// Persist `bytes` to a new uniquely named file under `root`.
    ///
    /// `suffix` is kept verbatim (e.g. `".docx"`) so tools that sniff the
    /// extension see the right one. The write handle is closed before
    /// returning; only the path stays alive.
    pub fn write(root: &Path, suffix: &str, bytes: &[u8]) -> Result<Self, DocmillError> {
        let mut file = Builder::new()
            .prefix(PREFIX)
            .suffix(suffix)
            .tempfile_in(root)
            .map_err(|e| DocmillError::Internal(format!("tempfile in {}: {e}", root.display())))?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| DocmillError::Internal(format!("tempfile write: {e}")))?;

        let path = file.into_temp_path();
        debug!("Created transient file {}", path.display());
        Ok(Self {
            inner: Inner::File(path),
        })
    }

    /// Create a new, empty, uniquely named directory under `root`.
    pub fn dir(root: &Path) -> Result<Self, DocmillError> {
        let dir = Builder::new()
            .prefix(PREFIX)
            .tempdir_in(root)
            .map_err(|e| DocmillError::Internal(format!("tempdir in {}: {e}", root.display())))?;
        debug!("Created transient dir {}", dir.path().display());
        Ok(Self {
            inner: Inner::Dir(dir),
        })
    }

    pub fn path(&self) -> &Path {
        match &self.inner {
            Inner::File(p) => p,
            Inner::Dir(d) => d.path(),
        }
    }

    /// Delete now, reporting any I/O error instead of swallowing it.
    pub fn close(self) -> std::io::Result<()> {
        match self.inner {
            Inner::File(p) => p.close(),
            Inner::Dir(d) => d.close(),
        }
    }
}

impl std::fmt::Debug for TransientArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TransientArtifact").field(&self.path()).finish()
    }
}

/// All artifacts owned by one request.
///
/// Dropping the set deletes everything it holds. [`ArtifactSet::release`]
/// does the same but logs deletion failures; the pipeline calls it on the
/// success path and lets `Drop` handle every error path.
#[derive(Debug, Default)]
pub struct ArtifactSet {
    items: Vec<TransientArtifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `artifact` and return its path.
    pub fn track(&mut self, artifact: TransientArtifact) -> &Path {
        self.items.push(artifact);
        // just pushed
        self.items[self.items.len() - 1].path()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Delete every artifact, newest first.
    pub fn release(mut self) {
        while let Some(item) = self.items.pop() {
            let path = item.path().to_path_buf();
            if let Err(e) = item.close() {
                warn!("Failed to remove transient {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn write_creates_file_with_suffix_and_content() {
        let root = tempfile::tempdir().unwrap();
        let a = TransientArtifact::write(root.path(), ".docx", b"hello").unwrap();
        assert!(a.path().exists());
        assert!(a.path().to_string_lossy().ends_with(".docx"));
        assert_eq!(std::fs::read(a.path()).unwrap(), b"hello");
        drop(a);
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn dir_is_removed_with_contents() {
        let root = tempfile::tempdir().unwrap();
        let d = TransientArtifact::dir(root.path()).unwrap();
        std::fs::write(d.path().join("out.pdf"), b"%PDF").unwrap();
        d.close().unwrap();
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn names_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let a = TransientArtifact::write(root.path(), ".pdf", b"").unwrap();
        let b = TransientArtifact::write(root.path(), ".pdf", b"").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn set_release_and_drop_both_clean_up() {
        let root = tempfile::tempdir().unwrap();

        let mut set = ArtifactSet::new();
        set.track(TransientArtifact::write(root.path(), ".ppt", b"x").unwrap());
        set.track(TransientArtifact::dir(root.path()).unwrap());
        assert_eq!(set.len(), 2);
        assert_eq!(entries(root.path()), 2);
        set.release();
        assert_eq!(entries(root.path()), 0);

        let mut set = ArtifactSet::new();
        set.track(TransientArtifact::write(root.path(), ".doc", b"y").unwrap());
        drop(set);
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn write_into_missing_root_fails() {
        let err = TransientArtifact::write(Path::new("/definitely/not/here"), ".pdf", b"")
            .unwrap_err();
        assert!(matches!(err, DocmillError::Internal(_)));
    }
}
