use std::sync::Arc;

use async_trait::async_trait;

/// Fallos al adquirir el micrófono.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
  #[error("audio capture not supported")]
  NotSupported,
  #[error("permission denied")]
  PermissionDenied,
  #[error("no capture device found")]
  NotFound,
  #[error("{0}")]
  Other(String),
}

/// Destino de los eventos que empuja el dispositivo.
///
/// El dispositivo entrega los trozos de audio en el orden en que los produce;
/// el controlador nunca hace polling.
pub trait ChunkSink: Send + Sync {
  fn push_chunk(&self, chunk: Vec<u8>);

  /// Fallo asíncrono del hardware (desconexión, etc.).
  fn fail(&self, reason: String);

  /// El dispositivo ya entregó todo lo pendiente tras `request_stop`.
  fn finished(&self);
}

/// Handle exclusivo sobre el dispositivo de captura.
///
/// Mientras exista, el dispositivo está "en uso" (indicador de grabación
/// encendido). `release` debe ser idempotente.
pub trait CaptureHandle: Send + Sync {
  /// Empieza a producir trozos con la codificación negociada.
  fn start(&self, mime_type: &str);

  /// Deja de producir; lo pendiente se entrega antes de `ChunkSink::finished`.
  fn request_stop(&self);

  /// Detiene todas las pistas subyacentes y libera el dispositivo.
  fn release(&self);
}

/// Capacidad de captura de micrófono inyectada en el controlador.
///
/// Implementaciones posibles:
/// - hardware real (cpal, WebAudio vía wasm…)
/// - simulador para demos
/// - dobles de test
#[async_trait]
pub trait CaptureDevice: Send + Sync {
  /// `false` si la plataforma no tiene ninguna facilidad de captura.
  fn is_available(&self) -> bool;

  fn supports_format(&self, mime_type: &str) -> bool;

  /// Pide acceso exclusivo. Es el único punto de suspensión del arranque.
  async fn acquire(&self, sink: Arc<dyn ChunkSink>) -> Result<Arc<dyn CaptureHandle>, CaptureError>;
}
