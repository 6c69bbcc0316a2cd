// crates/karaoke-core/src/errors.rs
use thiserror::Error;

use crate::ports::data_source::RepoError;

/// Error genérico del núcleo de karaoke.
///
/// Las capas superiores (host, CLI, etc.) deberían mapear este error
/// a mensajes de usuario o logs.
#[derive(Debug, Error)]
pub enum CoreError {
  #[error("repository error: {0}")]
  Repository(String),

  #[error("{kind} {id} not found")]
  NotFound { kind: &'static str, id: String },

  #[error(transparent)]
  Session(#[from] SessionError),
}

impl From<RepoError> for CoreError {
  fn from(err: RepoError) -> Self {
    match err {
      RepoError::NotFound { kind, id } => CoreError::NotFound { kind, id },
      RepoError::Storage(msg) => CoreError::Repository(msg),
    }
  }
}

/// Clasificación de los fallos que ve el usuario.
///
/// Ninguno es fatal: tras cualquiera de ellos se puede empezar una sesión
/// nueva desde `Idle`. No hay reintentos automáticos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  NoSongSelected,
  SessionAlreadyActive,
  DeviceUnavailable,
  PermissionDenied,
  NoDeviceFound,
  FormatUnsupported,
  DeviceError,
  PersistenceFailure,
  /// El catálogo de canciones no se pudo cargar.
  CatalogUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
  #[error("no song selected")]
  NoSongSelected,

  #[error("a recording session is already active")]
  SessionAlreadyActive,

  #[error("audio capture is not available on this platform")]
  DeviceUnavailable,

  #[error("microphone access denied")]
  PermissionDenied,

  #[error("no microphone found")]
  NoDeviceFound,

  #[error("no accepted recording format is supported (tried {tried:?})")]
  FormatUnsupported { tried: Vec<String> },

  /// El dispositivo falló antes de empezar a capturar.
  #[error("failed to access microphone: {0}")]
  AcquisitionFailed(String),

  #[error("capture device error: {0}")]
  DeviceError(String),

  #[error("failed to save performance: {0}")]
  PersistenceFailure(String),
}

impl SessionError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      SessionError::NoSongSelected => ErrorKind::NoSongSelected,
      SessionError::SessionAlreadyActive => ErrorKind::SessionAlreadyActive,
      SessionError::DeviceUnavailable => ErrorKind::DeviceUnavailable,
      SessionError::PermissionDenied => ErrorKind::PermissionDenied,
      SessionError::NoDeviceFound => ErrorKind::NoDeviceFound,
      SessionError::FormatUnsupported { .. } => ErrorKind::FormatUnsupported,
      SessionError::AcquisitionFailed(_) | SessionError::DeviceError(_) => ErrorKind::DeviceError,
      SessionError::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
    }
  }
}
