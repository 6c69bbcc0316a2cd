use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FsError {
  #[error("io error on {path:?}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid json in {path:?}: {source}")]
  Json {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// Reads and decodes a JSON document without blocking the executor.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, FsError> {
  let bytes =
    tokio::fs::read(path).await.map_err(|source| FsError::Io { path: path.to_path_buf(), source })?;
  debug!(path = %path.display(), bytes = bytes.len(), "read json");
  serde_json::from_slice(&bytes).map_err(|source| FsError::Json { path: path.to_path_buf(), source })
}

/// Like [`read_json`], but a missing file yields `Ok(None)`.
pub async fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, FsError> {
  match read_json(path).await {
    Ok(v) => Ok(Some(v)),
    Err(FsError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(e),
  }
}
