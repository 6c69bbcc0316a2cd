use tracing::debug;

use crate::domain::{Song, SongId};
use crate::errors::CoreError;
use crate::ports::DataSource;

/// Read side of the song catalog.
pub struct SongCatalog<R>
where
  R: DataSource<Song>,
{
  repo: R,
}

impl<R> SongCatalog<R>
where
  R: DataSource<Song>,
{
  pub fn new(repo: R) -> Self {
    Self { repo }
  }

  pub async fn list(&self) -> Result<Vec<Song>, CoreError> {
    Ok(self.repo.get_all().await?)
  }

  pub async fn get(&self, id: SongId) -> Result<Song, CoreError> {
    Ok(self.repo.get_by_id(id).await?)
  }

  pub async fn search(&self, query: &str) -> Result<Vec<Song>, CoreError> {
    let songs = self.repo.get_all().await?;
    let found = filter_songs(songs, query);
    debug!(query, hits = found.len(), "song search");
    Ok(found)
  }
}

/// Case-insensitive match on title or artist. A blank query keeps everything.
pub fn filter_songs(songs: Vec<Song>, query: &str) -> Vec<Song> {
  let needle = query.trim().to_lowercase();
  if needle.is_empty() {
    return songs;
  }
  songs.into_iter().filter(|s| s.matches(&needle)).collect()
}
