pub mod config;
pub mod fixtures;
pub mod store;

use std::sync::Arc;

use tracing::info;

use karaoke_core::domain::{Performance, Song, User};

pub use config::{FixtureConfig, LatencyConfig};
pub use fixtures::{FixtureError, Fixtures};
pub use store::FixtureStore;

/// The three fixture-backed data sources, shared by the host.
#[derive(Clone)]
pub struct KaraokeStore {
  pub songs: Arc<FixtureStore<Song>>,
  pub performances: Arc<FixtureStore<Performance>>,
  pub users: Arc<FixtureStore<User>>,
}

impl KaraokeStore {
  pub fn new(fixtures: Fixtures, latency: LatencyConfig) -> Self {
    Self {
      songs: Arc::new(FixtureStore::new(fixtures.songs, latency.clone())),
      performances: Arc::new(FixtureStore::new(fixtures.performances, latency.clone())),
      users: Arc::new(FixtureStore::new(fixtures.users, latency)),
    }
  }

  /// Loads `[fixtures]` from the config file and seeds the stores from the
  /// configured directory (or the embedded fixtures).
  pub async fn new_from_config() -> Result<Self, FixtureError> {
    let cfg = FixtureConfig::load()?;
    Self::from_config(&cfg).await
  }

  pub async fn from_config(cfg: &FixtureConfig) -> Result<Self, FixtureError> {
    let fixtures = match &cfg.dir {
      Some(dir) => Fixtures::load_dir(dir).await?,
      None => Fixtures::embedded()?,
    };
    info!(latency = ?cfg.latency, "fixture store ready");
    Ok(Self::new(fixtures, cfg.latency.clone()))
  }
}
