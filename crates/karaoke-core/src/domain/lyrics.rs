use serde::{Deserialize, Serialize};

/// Una línea de letra con su instante de activación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricCue {
  /// Segundos desde el inicio de la pista (≥ 0).
  pub time: f64,
  /// Texto que se muestra mientras la línea está activa.
  pub text: String,
}

impl LyricCue {
  pub fn new(time: f64, text: impl Into<String>) -> Self {
    Self { time, text: text.into() }
  }
}
