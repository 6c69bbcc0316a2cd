use serde::{Deserialize, Serialize};

/// Estado de reproducción reflejado desde la fuente de audio.
///
/// Lo posee la capa de UI; el sincronizador de letras solo lo lee.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
  /// Posición actual en segundos.
  pub current_time: f64,
  /// Duración total en segundos (0 mientras no se conocen los metadatos).
  pub duration: f64,
  pub is_playing: bool,
}

impl PlaybackState {
  /// Progreso en `[0.0, 1.0]`, o `0.0` si la duración aún no es conocida.
  pub fn progress(&self) -> f64 {
    if self.duration > 0.0 { (self.current_time / self.duration).clamp(0.0, 1.0) } else { 0.0 }
  }
}
