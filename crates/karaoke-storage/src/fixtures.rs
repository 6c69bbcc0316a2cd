use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{info, warn};

use karaoke_core::domain::{Performance, Song, User};
use karaoke_core::services::lyric_sync::validate_cues;
use karaoke_fs::{FsError, read_json_opt};

const SONGS_JSON: &str = include_str!("fixtures/songs.json");
const PERFORMANCES_JSON: &str = include_str!("fixtures/performances.json");
const USERS_JSON: &str = include_str!("fixtures/users.json");

#[derive(Debug, Error)]
pub enum FixtureError {
  #[error(transparent)]
  Fs(#[from] FsError),

  #[error("embedded fixture {name} is invalid: {source}")]
  Embedded {
    name: &'static str,
    #[source]
    source: serde_json::Error,
  },

  #[error("config error: {0}")]
  Config(#[from] karaoke_config::ConfigError),
}

/// Seed data for the three stores.
#[derive(Debug, Clone)]
pub struct Fixtures {
  pub songs: Vec<Song>,
  pub performances: Vec<Performance>,
  pub users: Vec<User>,
}

fn embedded<T: DeserializeOwned>(name: &'static str, json: &str) -> Result<Vec<T>, FixtureError> {
  serde_json::from_str(json).map_err(|source| FixtureError::Embedded { name, source })
}

impl Fixtures {
  /// Fixtures compiled into the binary.
  pub fn embedded() -> Result<Self, FixtureError> {
    let fixtures = Fixtures {
      songs: embedded("songs.json", SONGS_JSON)?,
      performances: embedded("performances.json", PERFORMANCES_JSON)?,
      users: embedded("users.json", USERS_JSON)?,
    };
    fixtures.check_lyrics();
    Ok(fixtures)
  }

  /// Reads the three files from `dir` concurrently. A missing file falls
  /// back to its embedded counterpart; a malformed one is an error.
  pub async fn load_dir(dir: &Path) -> Result<Self, FixtureError> {
    let songs_path = dir.join("songs.json");
    let performances_path = dir.join("performances.json");
    let users_path = dir.join("users.json");

    let (songs, performances, users) = futures::try_join!(
      read_json_opt::<Vec<Song>>(&songs_path),
      read_json_opt::<Vec<Performance>>(&performances_path),
      read_json_opt::<Vec<User>>(&users_path),
    )?;

    let fixtures = Fixtures {
      songs: match songs {
        Some(s) => s,
        None => embedded("songs.json", SONGS_JSON)?,
      },
      performances: match performances {
        Some(p) => p,
        None => embedded("performances.json", PERFORMANCES_JSON)?,
      },
      users: match users {
        Some(u) => u,
        None => embedded("users.json", USERS_JSON)?,
      },
    };

    info!(
      dir = %dir.display(),
      songs = fixtures.songs.len(),
      performances = fixtures.performances.len(),
      users = fixtures.users.len(),
      "fixtures loaded"
    );
    fixtures.check_lyrics();
    Ok(fixtures)
  }

  /// Bad lyric sheets are a data issue, not a load failure.
  fn check_lyrics(&self) {
    for song in &self.songs {
      if let Err(e) = validate_cues(song.cues()) {
        warn!(song = %song.id, title = %song.title, error = %e, "invalid lyric sheet");
      }
    }
  }
}
