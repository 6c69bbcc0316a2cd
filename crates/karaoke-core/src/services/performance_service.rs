use tracing::{info, warn};

use crate::domain::performance::{PerformanceDraft, PerformancePatch};
use crate::domain::{Performance, PerformanceArtifact, PerformanceId, SongId, UserId};
use crate::errors::{CoreError, SessionError};
use crate::ports::DataSource;

/// Persists finished recordings through the data-source collaborator.
pub struct PerformanceService<R>
where
  R: DataSource<Performance>,
{
  repo: R,
}

impl<R> PerformanceService<R>
where
  R: DataSource<Performance>,
{
  pub fn new(repo: R) -> Self {
    Self { repo }
  }

  /// Saves an artifact as a new performance with no effects and no shares.
  ///
  /// Any data-source failure is reported as `PersistenceFailure`; nothing is
  /// retried.
  pub async fn save(
    &self,
    artifact: &PerformanceArtifact,
    user_id: UserId,
  ) -> Result<Performance, SessionError> {
    let draft = PerformanceDraft::from_artifact(artifact, user_id);

    match self.repo.create(draft).await {
      Ok(performance) => {
        info!(performance = %performance.id, song = %performance.song_id, "performance saved");
        Ok(performance)
      }
      Err(e) => {
        warn!(error = %e, url = %artifact.url, "saving performance failed");
        Err(SessionError::PersistenceFailure(e.to_string()))
      }
    }
  }

  pub async fn list(&self) -> Result<Vec<Performance>, CoreError> {
    Ok(self.repo.get_all().await?)
  }

  pub async fn list_for_song(&self, song_id: SongId) -> Result<Vec<Performance>, CoreError> {
    let all = self.repo.get_all().await?;
    Ok(all.into_iter().filter(|p| p.song_id == song_id).collect())
  }

  /// Records that the performance was shared on `platform` (once per platform).
  pub async fn mark_shared(&self, id: PerformanceId, platform: &str) -> Result<Performance, CoreError> {
    let current = self.repo.get_by_id(id).await?;
    if current.shared_platforms.iter().any(|p| p == platform) {
      return Ok(current);
    }

    let mut platforms = current.shared_platforms;
    platforms.push(platform.to_string());
    let patch = PerformancePatch { shared_platforms: Some(platforms), ..Default::default() };
    Ok(self.repo.update(id, patch).await?)
  }

  pub async fn delete(&self, id: PerformanceId) -> Result<bool, CoreError> {
    Ok(self.repo.delete(id).await?)
  }
}
