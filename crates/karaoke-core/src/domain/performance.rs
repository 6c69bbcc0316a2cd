use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::entity::Entity;
use crate::domain::ids::{PerformanceId, SongId, UserId};

/// Audio grabado y ensamblado, etiquetado con su codificación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingBlob {
  /// Codificación negociada para la sesión (`audio/webm`, `audio/wav`…).
  pub mime_type: String,
  pub data: Vec<u8>,
}

impl RecordingBlob {
  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

/// Resultado de una sesión de grabación completada.
///
/// Se produce exactamente una vez por sesión y lo consume la persistencia
/// a través de `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceArtifact {
  /// Referencia efímera (`blob:`) al audio ensamblado.
  pub url: String,
  pub blob: RecordingBlob,
  pub song_id: SongId,
  /// Tiempo transcurrido entre el inicio de la captura y la orden de parada.
  pub duration: Duration,
}

/// Interpretación persistida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
  pub id: PerformanceId,
  pub user_id: UserId,
  pub song_id: SongId,
  pub recording_url: String,
  /// Duración en segundos.
  pub duration: f64,
  #[serde(default)]
  pub effects: Vec<String>,
  #[serde(default)]
  pub shared_platforms: Vec<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceDraft {
  pub user_id: UserId,
  pub song_id: SongId,
  pub recording_url: String,
  pub duration: f64,
  #[serde(default)]
  pub effects: Vec<String>,
  #[serde(default)]
  pub shared_platforms: Vec<String>,
}

impl PerformanceDraft {
  /// Borrador a partir de un artefacto recién grabado: sin efectos y sin
  /// compartir en ninguna plataforma.
  pub fn from_artifact(artifact: &PerformanceArtifact, user_id: UserId) -> Self {
    Self {
      user_id,
      song_id: artifact.song_id,
      recording_url: artifact.url.clone(),
      duration: artifact.duration.as_secs_f64(),
      effects: Vec::new(),
      shared_platforms: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformancePatch {
  pub recording_url: Option<String>,
  pub effects: Option<Vec<String>>,
  pub shared_platforms: Option<Vec<String>>,
}

impl Entity for Performance {
  type Id = PerformanceId;
  type Draft = PerformanceDraft;
  type Patch = PerformancePatch;

  const KIND: &'static str = "performance";

  fn id(&self) -> PerformanceId {
    self.id
  }

  fn from_draft(draft: PerformanceDraft, created_at: DateTime<Utc>) -> Self {
    Performance {
      id: PerformanceId::new(),
      user_id: draft.user_id,
      song_id: draft.song_id,
      recording_url: draft.recording_url,
      duration: draft.duration,
      effects: draft.effects,
      shared_platforms: draft.shared_platforms,
      created_at,
    }
  }

  fn apply(&mut self, patch: PerformancePatch) {
    if let Some(url) = patch.recording_url {
      self.recording_url = url;
    }
    if let Some(effects) = patch.effects {
      self.effects = effects;
    }
    if let Some(platforms) = patch.shared_platforms {
      self.shared_platforms = platforms;
    }
  }
}
