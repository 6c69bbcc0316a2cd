use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use karaoke_core::domain::Entity;
use karaoke_core::ports::{DataSource, RepoError};

use crate::config::LatencyConfig;

/// In-memory `DataSource` over a fixture set.
///
/// Every call waits for the configured latency before touching the rows, so
/// the host sees the same timing as a remote service. Writes are kept for
/// the lifetime of the store.
pub struct FixtureStore<E: Entity> {
  rows: RwLock<Vec<E>>,
  latency: LatencyConfig,
}

impl<E: Entity> FixtureStore<E> {
  pub fn new(rows: Vec<E>, latency: LatencyConfig) -> Self {
    Self { rows: RwLock::new(rows), latency }
  }

  pub fn len(&self) -> usize {
    self.read().map(|rows| rows.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn read(&self) -> Result<RwLockReadGuard<'_, Vec<E>>, RepoError> {
    self.rows.read().map_err(|_| RepoError::Storage(format!("{} store lock poisoned", E::KIND)))
  }

  fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<E>>, RepoError> {
    self.rows.write().map_err(|_| RepoError::Storage(format!("{} store lock poisoned", E::KIND)))
  }
}

async fn simulate(ms: u64) {
  if let Some(delay) = LatencyConfig::delay(ms) {
    tokio::time::sleep(delay).await;
  }
}

#[async_trait]
impl<E: Entity> DataSource<E> for FixtureStore<E> {
  async fn get_all(&self) -> Result<Vec<E>, RepoError> {
    simulate(self.latency.get_all_ms).await;
    Ok(self.read()?.clone())
  }

  async fn get_by_id(&self, id: E::Id) -> Result<E, RepoError> {
    simulate(self.latency.get_by_id_ms).await;
    let rows = self.read()?;
    rows.iter().find(|e| e.id() == id).cloned().ok_or_else(|| RepoError::not_found::<E>(id))
  }

  async fn create(&self, draft: E::Draft) -> Result<E, RepoError> {
    simulate(self.latency.create_ms).await;
    let entity = E::from_draft(draft, Utc::now());
    debug!(kind = E::KIND, id = %entity.id(), "fixture create");
    self.write()?.push(entity.clone());
    Ok(entity)
  }

  async fn update(&self, id: E::Id, patch: E::Patch) -> Result<E, RepoError> {
    simulate(self.latency.update_ms).await;
    let mut rows = self.write()?;
    let entity = rows.iter_mut().find(|e| e.id() == id).ok_or_else(|| RepoError::not_found::<E>(id))?;
    entity.apply(patch);
    debug!(kind = E::KIND, id = %id, "fixture update");
    Ok(entity.clone())
  }

  async fn delete(&self, id: E::Id) -> Result<bool, RepoError> {
    simulate(self.latency.delete_ms).await;
    let mut rows = self.write()?;
    let index = rows.iter().position(|e| e.id() == id).ok_or_else(|| RepoError::not_found::<E>(id))?;
    rows.remove(index);
    debug!(kind = E::KIND, id = %id, "fixture delete");
    Ok(true)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  use karaoke_core::domain::song::{SongDraft, SongPatch};
  use karaoke_core::domain::user::{UserDraft, UserPatch};
  use karaoke_core::domain::{Song, SongId, User};

  fn draft(title: &str) -> SongDraft {
    SongDraft {
      title: title.into(),
      artist: "Tester".into(),
      audio_url: "/audio/test.mp3".into(),
      duration: 120.0,
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn create_assigns_id_and_timestamp() {
    let store = FixtureStore::<Song>::new(Vec::new(), LatencyConfig::none());

    let a = store.create(draft("A")).await.unwrap();
    let b = store.create(draft("B")).await.unwrap();

    assert_ne!(a.id, b.id);
    assert!(a.created_at.is_some());
    assert_eq!(store.get_by_id(b.id).await.unwrap().title, "B");
    assert_eq!(store.get_all().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn update_merges_only_given_fields() {
    let store = FixtureStore::<User>::new(Vec::new(), LatencyConfig::none());
    let user = store
      .create(UserDraft { username: "ana".into(), display_name: "Ana".into(), avatar_url: None })
      .await
      .unwrap();

    let patch = UserPatch { display_name: Some("Ana B.".into()), ..Default::default() };
    let updated = store.update(user.id, patch).await.unwrap();

    assert_eq!(updated.display_name, "Ana B.");
    assert_eq!(updated.username, "ana");
    assert_eq!(updated.created_at, user.created_at);
  }

  #[tokio::test]
  async fn missing_ids_are_not_found() {
    let store = FixtureStore::<Song>::new(Vec::new(), LatencyConfig::none());
    let ghost = SongId::new();

    assert!(matches!(store.get_by_id(ghost).await, Err(RepoError::NotFound { kind: "song", .. })));
    assert!(matches!(store.update(ghost, SongPatch::default()).await, Err(RepoError::NotFound { .. })));
    assert!(matches!(store.delete(ghost).await, Err(RepoError::NotFound { .. })));
  }

  #[tokio::test]
  async fn delete_removes_the_row() {
    let store = FixtureStore::<Song>::new(Vec::new(), LatencyConfig::none());
    let song = store.create(draft("Gone")).await.unwrap();

    assert!(store.delete(song.id).await.unwrap());
    assert!(store.is_empty());
    assert!(store.delete(song.id).await.is_err());
  }

  #[tokio::test(start_paused = true)]
  async fn operations_wait_for_the_configured_latency() {
    let store = FixtureStore::<Song>::new(Vec::new(), LatencyConfig::default());

    let started = tokio::time::Instant::now();
    store.get_all().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(300));

    let started = tokio::time::Instant::now();
    store.create(draft("Slow")).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(400));
  }
}
