use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// Directory that holds uploads for the duration of one request.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates the directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `bytes` under a fresh `<uuid>.<extension>` name.
    ///
    /// The extension must already be validated; the client's filename is
    /// never used as a path component. The write runs on the blocking pool
    /// together with the guard: if it fails, or the caller stops waiting,
    /// the guard is dropped there and the partial file goes with it.
    pub async fn persist(&self, bytes: &[u8], extension: &str) -> io::Result<TempUpload> {
        let name = format!("{}.{}", Uuid::new_v4(), extension);
        let upload = TempUpload {
            path: self.dir.join(name),
            removed: false,
        };
        let bytes = bytes.to_vec();

        let upload = tokio::task::spawn_blocking(move || {
            std::fs::write(&upload.path, &bytes)?;
            debug!(path = %upload.path.display(), size = bytes.len(), "Upload stored");
            Ok::<_, io::Error>(upload)
        })
        .await
        .map_err(io::Error::other)??;

        Ok(upload)
    }
}

/// A stored upload that is deleted when dropped, whatever path the request
/// took. Call [`TempUpload::discard`] to delete it explicitly and observe
/// the result.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    removed: bool,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn discard(mut self) -> io::Result<()> {
        self.removed = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Upload removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove upload"),
        }
    }
}
