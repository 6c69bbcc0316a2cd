use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Writes through a sibling `.tmp` file and renames it over `path`, creating
/// the parent directory when needed. Readers never see a half-written file.
pub fn atomic_write_str(path: &Path, contents: &str) -> io::Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent)?;
  }

  let staging = path.with_extension("tmp");
  let mut file = fs::File::create(&staging)?;
  file.write_all(contents.as_bytes())?;
  file.sync_all()?;
  drop(file);

  fs::rename(&staging, path)
}
