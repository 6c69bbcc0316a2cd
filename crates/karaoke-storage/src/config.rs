use karaoke_config::{CONFIG_BACKEND, ConfigBackend, ConfigError, PATHS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Simulated latency per data-source operation, in milliseconds.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LatencyConfig {
  pub get_all_ms: u64,
  pub get_by_id_ms: u64,
  pub create_ms: u64,
  pub update_ms: u64,
  pub delete_ms: u64,
}

impl Default for LatencyConfig {
  fn default() -> Self {
    Self { get_all_ms: 300, get_by_id_ms: 200, create_ms: 400, update_ms: 350, delete_ms: 250 }
  }
}

impl LatencyConfig {
  /// No artificial delay. Used by tests and tooling.
  pub fn none() -> Self {
    Self { get_all_ms: 0, get_by_id_ms: 0, create_ms: 0, update_ms: 0, delete_ms: 0 }
  }

  pub(crate) fn delay(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
  }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FixtureConfig {
  /// Directory with `songs.json`, `performances.json` and `users.json`.
  /// Missing files fall back to the embedded fixtures.
  pub dir: Option<PathBuf>,

  #[serde(default)]
  pub latency: LatencyConfig,
}

impl Default for FixtureConfig {
  fn default() -> Self {
    FixtureConfig { dir: Some(PATHS.fixtures_dir()), latency: LatencyConfig::default() }
  }
}

impl FixtureConfig {
  pub fn load() -> Result<Self, ConfigError> {
    let cfg = CONFIG_BACKEND.load_section_with_default("fixtures")?;
    CONFIG_BACKEND.save_section("fixtures", &cfg)?;
    Ok(cfg)
  }

  pub fn save(&self) -> Result<(), ConfigError> {
    CONFIG_BACKEND.save_section("fixtures", self)
  }
}
