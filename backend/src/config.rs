use karaoke_config::{CONFIG_BACKEND, ConfigBackend, ConfigError};
use karaoke_core::domain::UserId;
use karaoke_core::services::FormatPreference;
use serde::{Deserialize, Serialize};

/// `[recording]`: accepted encodings, primary first.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RecordingConfig {
  pub primary_format: String,
  pub fallback_format: String,
}

impl Default for RecordingConfig {
  fn default() -> Self {
    FormatPreference::default().into()
  }
}

impl From<FormatPreference> for RecordingConfig {
  fn from(p: FormatPreference) -> Self {
    RecordingConfig { primary_format: p.primary, fallback_format: p.fallback }
  }
}

impl From<RecordingConfig> for FormatPreference {
  fn from(cfg: RecordingConfig) -> Self {
    FormatPreference { primary: cfg.primary_format, fallback: cfg.fallback_format }
  }
}

impl RecordingConfig {
  pub fn load() -> Result<Self, ConfigError> {
    let cfg = CONFIG_BACKEND.load_section_with_default("recording")?;
    CONFIG_BACKEND.save_section("recording", &cfg)?;
    Ok(cfg)
  }
}

/// `[session]`: who owns the saved performances until there is real auth.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionConfig {
  pub user_id: UserId,
}

impl Default for SessionConfig {
  fn default() -> Self {
    // first user of the embedded fixtures
    let user_id = "6f1c2a4e-8d3b-4a7e-9c1f-2b5d8e7a9c10".parse().unwrap_or_else(|_| UserId::new());
    SessionConfig { user_id }
  }
}

impl SessionConfig {
  pub fn load() -> Result<Self, ConfigError> {
    let cfg = CONFIG_BACKEND.load_section_with_default("session")?;
    CONFIG_BACKEND.save_section("session", &cfg)?;
    Ok(cfg)
  }
}
