use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::Entity;
use crate::domain::ids::SongId;
use crate::domain::lyrics::LyricCue;

/// Canción del catálogo de karaoke.
///
/// Inmutable una vez cargada: la fuente de datos es la dueña y la sesión
/// activa solo mantiene una referencia compartida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
  pub id: SongId,
  pub title: String,
  pub artist: String,
  /// Ubicación del audio de acompañamiento.
  pub audio_url: String,
  /// Duración en segundos.
  pub duration: f64,
  /// Letra sincronizada, ordenada por `time`. Puede faltar.
  #[serde(default)]
  pub lyrics_data: Option<Vec<LyricCue>>,
  #[serde(default)]
  pub genre: Option<String>,
  #[serde(default)]
  pub cover_url: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

impl Song {
  /// Letra como slice; vacío si la canción no la trae.
  pub fn cues(&self) -> &[LyricCue] {
    self.lyrics_data.as_deref().unwrap_or(&[])
  }

  /// Coincidencia sin distinguir mayúsculas sobre título o artista.
  ///
  /// `needle` debe venir ya en minúsculas.
  pub fn matches(&self, needle: &str) -> bool {
    self.title.to_lowercase().contains(needle) || self.artist.to_lowercase().contains(needle)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongDraft {
  pub title: String,
  pub artist: String,
  pub audio_url: String,
  pub duration: f64,
  #[serde(default)]
  pub lyrics_data: Option<Vec<LyricCue>>,
  #[serde(default)]
  pub genre: Option<String>,
  #[serde(default)]
  pub cover_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongPatch {
  pub title: Option<String>,
  pub artist: Option<String>,
  pub audio_url: Option<String>,
  pub duration: Option<f64>,
  pub lyrics_data: Option<Vec<LyricCue>>,
  pub genre: Option<String>,
  pub cover_url: Option<String>,
}

impl Entity for Song {
  type Id = SongId;
  type Draft = SongDraft;
  type Patch = SongPatch;

  const KIND: &'static str = "song";

  fn id(&self) -> SongId {
    self.id
  }

  fn from_draft(draft: SongDraft, created_at: DateTime<Utc>) -> Self {
    Song {
      id: SongId::new(),
      title: draft.title,
      artist: draft.artist,
      audio_url: draft.audio_url,
      duration: draft.duration,
      lyrics_data: draft.lyrics_data,
      genre: draft.genre,
      cover_url: draft.cover_url,
      created_at: Some(created_at),
    }
  }

  fn apply(&mut self, patch: SongPatch) {
    if let Some(title) = patch.title {
      self.title = title;
    }
    if let Some(artist) = patch.artist {
      self.artist = artist;
    }
    if let Some(audio_url) = patch.audio_url {
      self.audio_url = audio_url;
    }
    if let Some(duration) = patch.duration {
      self.duration = duration;
    }
    if let Some(cues) = patch.lyrics_data {
      self.lyrics_data = Some(cues);
    }
    if let Some(genre) = patch.genre {
      self.genre = Some(genre);
    }
    if let Some(cover_url) = patch.cover_url {
      self.cover_url = Some(cover_url);
    }
  }
}
