use std::{fs, io};

use serde::Serialize;
use serde::de::DeserializeOwned;
use toml_edit::{DocumentMut, Item};
use tracing::debug;

use crate::paths::{ConfigError, KaraokePaths};

/// Per-section access to the settings file.
///
/// Each crate owns one `[section]` and never touches the others.
pub trait ConfigBackend {
  fn load_section<T: DeserializeOwned>(&self, section: &str) -> Result<T, ConfigError>;
  fn save_section<T: Serialize>(&self, section: &str, value: &T) -> Result<(), ConfigError>;
}

/// `karaoke.toml` under the configured paths.
pub struct TomlConfigBackend {
  paths: KaraokePaths,
}

impl TomlConfigBackend {
  pub fn new(paths: KaraokePaths) -> Self {
    Self { paths }
  }

  pub fn paths(&self) -> &KaraokePaths {
    &self.paths
  }

  /// Contenido del archivo, `None` si todavía no existe.
  fn read_file(&self) -> Result<Option<String>, ConfigError> {
    match fs::read_to_string(self.paths.config_file()) {
      Ok(text) => Ok(Some(text)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  fn section_value(text: &str, section: &str) -> Result<Option<toml::Value>, ConfigError> {
    let mut root: toml::Table = toml::from_str(text)?;
    Ok(root.remove(section))
  }

  fn decode<T: DeserializeOwned>(section: &str, value: toml::Value) -> Result<T, ConfigError> {
    value.try_into().map_err(|e| ConfigError::Other(format!("decode section [{section}]: {e}")))
  }

  /// Sección decodificada, o `T::default()` si el archivo o la sección faltan.
  pub fn load_section_with_default<T>(&self, section: &str) -> Result<T, ConfigError>
  where
    T: DeserializeOwned + Default,
  {
    let Some(text) = self.read_file()? else {
      debug!(section, "no config file yet, using defaults");
      return Ok(T::default());
    };

    match Self::section_value(&text, section)? {
      Some(value) => Self::decode(section, value),
      None => {
        debug!(section, "section missing, using defaults");
        Ok(T::default())
      }
    }
  }
}

impl ConfigBackend for TomlConfigBackend {
  fn load_section<T: DeserializeOwned>(&self, section: &str) -> Result<T, ConfigError> {
    let path = self.paths.config_file();
    let text = self.read_file()?.ok_or_else(|| ConfigError::Other(format!("{} does not exist", path.display())))?;

    let value = Self::section_value(&text, section)?
      .ok_or_else(|| ConfigError::Other(format!("missing section [{section}] in {}", path.display())))?;
    Self::decode(section, value)
  }

  fn save_section<T: Serialize>(&self, section: &str, value: &T) -> Result<(), ConfigError> {
    let path = self.paths.config_file();

    // toml_edit conserva comentarios y el orden del resto del documento
    let mut doc = match self.read_file()? {
      Some(text) => text.parse::<DocumentMut>().map_err(|e| ConfigError::Other(format!("parse {}: {e}", path.display())))?,
      None => DocumentMut::new(),
    };

    let encoded =
      toml::to_string(value).map_err(|e| ConfigError::Other(format!("encode section [{section}]: {e}")))?;
    let table = encoded
      .parse::<DocumentMut>()
      .map_err(|e| ConfigError::Other(format!("re-read section [{section}]: {e}")))?
      .as_table()
      .clone();
    doc[section] = Item::Table(table);

    karaoke_fs::atomic_write_str(&path, &doc.to_string())?;
    debug!(section, path = %path.display(), "config section saved");
    Ok(())
  }
}
