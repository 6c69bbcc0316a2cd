use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("toml error: {0}")]
  Toml(#[from] toml::de::Error),
  #[error("directories error: could not determine home directory")]
  Directories,
  #[error("other: {0}")]
  Other(String),
}

/// Variable de entorno que activa el modo portable.
pub const BASE_DIR_ENV: &str = "KARAOKE_BASE_DIR";

/// Directorios de la aplicación.
///
/// Con `KARAOKE_BASE_DIR` definido todo cuelga de esa carpeta (modo portable);
/// si no, se usan los directorios estándar de la plataforma.
#[derive(Debug, Clone)]
pub struct KaraokePaths {
  pub base_dir: PathBuf,
  pub config_dir: PathBuf,
  pub data_dir: PathBuf,
  pub cache_dir: PathBuf,
}

impl KaraokePaths {
  pub fn new() -> Result<Self, ConfigError> {
    match std::env::var_os(BASE_DIR_ENV) {
      Some(base) => Self::at(Path::new(&base)),
      None => Self::platform(),
    }
  }

  fn platform() -> Result<Self, ConfigError> {
    let dirs = ProjectDirs::from("com", "karaoke", "karaoke").ok_or(ConfigError::Directories)?;
    let config = dirs.config_dir();
    Self::prepared(config.to_path_buf(), config.to_path_buf(), dirs.data_dir().to_path_buf(), dirs.cache_dir().to_path_buf())
  }

  /// Layout portable bajo `base`.
  pub fn at(base: &Path) -> Result<Self, ConfigError> {
    Self::prepared(base.to_path_buf(), base.join("config"), base.join("data"), base.join("cache"))
  }

  fn prepared(base_dir: PathBuf, config_dir: PathBuf, data_dir: PathBuf, cache_dir: PathBuf) -> Result<Self, ConfigError> {
    for dir in [&config_dir, &data_dir, &cache_dir] {
      std::fs::create_dir_all(dir)?;
    }
    Ok(Self { base_dir, config_dir, data_dir, cache_dir })
  }

  pub fn detect() -> Result<Self, ConfigError> {
    Self::new()
  }

  pub fn config_file(&self) -> PathBuf {
    self.config_dir.join("karaoke.toml")
  }

  /// Carpeta opcional con `songs.json`, `performances.json` y `users.json`.
  pub fn fixtures_dir(&self) -> PathBuf {
    self.data_dir.join("fixtures")
  }
}
