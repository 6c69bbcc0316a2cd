use crate::domain::PlaybackState;

/// Fuente de tiempo de reproducción (el elemento de audio del host).
pub trait PlaybackSource {
  fn playback_state(&self) -> PlaybackState;
}

impl PlaybackSource for PlaybackState {
  fn playback_state(&self) -> PlaybackState {
    *self
  }
}
