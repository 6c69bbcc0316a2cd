use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{info, warn};

use karaoke_core::domain::{
  LyricCue, Performance, PerformanceArtifact, PerformanceId, PlaybackState, Song, SongId, UserId,
};
use karaoke_core::ports::{CaptureDevice, DataSource, Notifier};
use karaoke_core::services::{
  CueChange, LyricTracker, PerformanceService, RecordingController, SessionPhase, SongCatalog,
};
use karaoke_core::{CoreError, ErrorKind, SessionError};

use crate::infrastructure::notifier::{session_message, user_message};

/// Host-side facade: receives the rendering layer's intents and forwards them
/// into the core services.
///
/// Owns the selected song, the lyric tracker for it and the artifact of the
/// last completed recording until it is saved or discarded.
pub struct KaraokeStage<D, S, P, N>
where
  D: CaptureDevice + 'static,
  S: DataSource<Song>,
  P: DataSource<Performance>,
  N: Notifier + 'static,
{
  catalog: SongCatalog<S>,
  performances: PerformanceService<P>,
  recorder: RecordingController<D>,
  notifier: Arc<N>,
  user_id: UserId,
  songs: Vec<Arc<Song>>,
  selected: Option<Arc<Song>>,
  tracker: LyricTracker,
  pending: Arc<Mutex<Option<PerformanceArtifact>>>,
  /// Number of sessions completed so far.
  completed: Arc<watch::Sender<u64>>,
  /// Value of `completed` when the latest successful start began.
  awaited_after: AtomicU64,
}

impl<D, S, P, N> KaraokeStage<D, S, P, N>
where
  D: CaptureDevice + 'static,
  S: DataSource<Song>,
  P: DataSource<Performance>,
  N: Notifier + 'static,
{
  pub fn new(
    catalog: SongCatalog<S>,
    performances: PerformanceService<P>,
    recorder: RecordingController<D>,
    notifier: N,
    user_id: UserId,
  ) -> Self {
    let notifier = Arc::new(notifier);
    let pending = Arc::new(Mutex::new(None));
    let completed = Arc::new(watch::Sender::new(0u64));

    {
      let pending = Arc::clone(&pending);
      let completed = Arc::clone(&completed);
      let notifier = Arc::clone(&notifier);
      recorder.on_artifact_ready(move |artifact: &PerformanceArtifact| {
        info!(url = %artifact.url, bytes = artifact.blob.len(), "recording ready for review");
        *pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(artifact.clone());
        notifier.success("Recording stopped");
        completed.send_modify(|n| *n += 1);
      });
    }

    {
      let notifier = Arc::clone(&notifier);
      recorder.on_error(move |err: &SessionError| {
        notifier.error(err.kind(), session_message(err));
      });
    }

    Self {
      catalog,
      performances,
      recorder,
      notifier,
      user_id,
      songs: Vec::new(),
      selected: None,
      tracker: LyricTracker::empty(),
      pending,
      completed,
      awaited_after: AtomicU64::new(0),
    }
  }

  pub async fn load_songs(&mut self) -> Result<&[Arc<Song>], CoreError> {
    let songs = match self.catalog.list().await {
      Ok(songs) => songs,
      Err(e) => {
        warn!(error = %e, "loading songs failed");
        let kind = ErrorKind::CatalogUnavailable;
        self.notifier.error(kind, user_message(kind));
        return Err(e);
      }
    };
    info!(count = songs.len(), "songs loaded");
    self.songs = songs.into_iter().map(Arc::new).collect();
    Ok(&self.songs)
  }

  pub fn songs(&self) -> &[Arc<Song>] {
    &self.songs
  }

  pub async fn search(&self, query: &str) -> Result<Vec<Song>, CoreError> {
    self.catalog.search(query).await
  }

  /// Makes `id` the current song. A session still running for the previous
  /// song is stopped first; its artifact still becomes pending.
  pub async fn select_song(&mut self, id: SongId) -> Result<Arc<Song>, CoreError> {
    let song = match self.songs.iter().find(|s| s.id == id) {
      Some(song) => Arc::clone(song),
      None => Arc::new(self.catalog.get(id).await?),
    };

    if self.recorder.is_active() {
      info!(phase = ?self.recorder.phase(), "song changed during recording, stopping session");
      self.recorder.stop();
    }

    self.tracker = LyricTracker::new(song.cues().to_vec());
    self.selected = Some(Arc::clone(&song));
    self.notifier.success(&format!("\"{}\" selected", song.title));
    Ok(song)
  }

  pub fn selected(&self) -> Option<&Arc<Song>> {
    self.selected.as_ref()
  }

  /// Playback clock tick from the audio element.
  pub fn tick(&mut self, state: &PlaybackState) -> Option<CueChange> {
    self.tracker.on_tick(state)
  }

  pub fn current_cue(&self) -> Option<&LyricCue> {
    self.tracker.current_cue()
  }

  pub async fn start_recording(&self) -> Result<(), SessionError> {
    // a stop queued during acquisition can complete the session inside `start`
    let baseline = *self.completed.borrow();

    match self.recorder.start(self.selected.as_deref()).await {
      Ok(()) => {
        self.awaited_after.store(baseline, Ordering::SeqCst);
        self.notifier.success("Recording started");
        Ok(())
      }
      Err(err) => {
        // device failures already reached the notifier through on_error
        if matches!(err.kind(), ErrorKind::NoSongSelected | ErrorKind::SessionAlreadyActive) {
          self.notifier.error(err.kind(), user_message(err.kind()));
        }
        Err(err)
      }
    }
  }

  pub fn stop_recording(&self) {
    self.recorder.stop();
  }

  pub fn phase(&self) -> SessionPhase {
    self.recorder.phase()
  }

  pub fn recorder(&self) -> &RecordingController<D> {
    &self.recorder
  }

  /// Waits until the most recently started session delivers its artifact.
  ///
  /// Returns at once if it already has. Never returns for a session that
  /// ended in `Errored`; callers bound it with a timeout.
  pub async fn artifact_ready(&self) {
    let after = self.awaited_after.load(Ordering::SeqCst);
    let mut rx = self.completed.subscribe();
    // Err only if the sender is gone, which cannot happen while `self` lives
    let _ = rx.wait_for(|n| *n > after).await;
  }

  pub fn pending_artifact(&self) -> Option<PerformanceArtifact> {
    self.lock_pending().clone()
  }

  pub fn discard_recording(&self) -> Option<PerformanceArtifact> {
    let dropped = self.lock_pending().take();
    if let Some(artifact) = &dropped {
      info!(url = %artifact.url, "recording discarded");
    }
    dropped
  }

  /// Persists the pending artifact. On failure the artifact stays pending so
  /// the user can retry; `Ok(None)` when there is nothing to save.
  pub async fn save_performance(&self) -> Result<Option<Performance>, SessionError> {
    let Some(artifact) = self.lock_pending().take() else {
      warn!("save requested without a recording");
      return Ok(None);
    };

    match self.performances.save(&artifact, self.user_id).await {
      Ok(performance) => {
        self.notifier.success("Performance saved successfully!");
        Ok(Some(performance))
      }
      Err(err) => {
        self.notifier.error(err.kind(), user_message(err.kind()));
        self.lock_pending().get_or_insert(artifact);
        Err(err)
      }
    }
  }

  pub async fn performances(&self) -> Result<Vec<Performance>, CoreError> {
    self.performances.list().await
  }

  pub async fn share_performance(&self, id: PerformanceId, platform: &str) -> Result<Performance, CoreError> {
    let performance = self.performances.mark_shared(id, platform).await?;
    info!(performance = %id, platform, "performance shared");
    self.notifier.success("Shared to social media!");
    Ok(performance)
  }

  fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<PerformanceArtifact>> {
    self.pending.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  use async_trait::async_trait;
  use karaoke_core::domain::performance::{PerformanceDraft, PerformancePatch};
  use karaoke_core::domain::song::{SongDraft, SongPatch};
  use karaoke_core::ports::RepoError;
  use karaoke_core::services::FormatPreference;
  use karaoke_storage::{FixtureStore, Fixtures, LatencyConfig};

  use crate::infrastructure::microphone::{MicrophoneProfile, SimulatedMicrophone};

  #[derive(Clone, Default)]
  struct Toasts(Arc<Mutex<Vec<(Option<ErrorKind>, String)>>>);

  impl Toasts {
    fn errors(&self) -> Vec<ErrorKind> {
      self.0.lock().unwrap().iter().filter_map(|(k, _)| *k).collect()
    }

    fn messages(&self) -> Vec<String> {
      self.0.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }
  }

  impl Notifier for Toasts {
    fn success(&self, message: &str) {
      self.0.lock().unwrap().push((None, message.to_string()));
    }

    fn error(&self, kind: ErrorKind, message: &str) {
      self.0.lock().unwrap().push((Some(kind), message.to_string()));
    }
  }

  struct BrokenPerformances;

  #[async_trait]
  impl DataSource<Performance> for BrokenPerformances {
    async fn get_all(&self) -> Result<Vec<Performance>, RepoError> {
      Ok(Vec::new())
    }

    async fn get_by_id(&self, id: PerformanceId) -> Result<Performance, RepoError> {
      Err(RepoError::not_found::<Performance>(id))
    }

    async fn create(&self, _draft: PerformanceDraft) -> Result<Performance, RepoError> {
      Err(RepoError::Storage("disk full".into()))
    }

    async fn update(&self, id: PerformanceId, _patch: PerformancePatch) -> Result<Performance, RepoError> {
      Err(RepoError::not_found::<Performance>(id))
    }

    async fn delete(&self, id: PerformanceId) -> Result<bool, RepoError> {
      Err(RepoError::not_found::<Performance>(id))
    }
  }

  struct OfflineCatalog;

  #[async_trait]
  impl DataSource<Song> for OfflineCatalog {
    async fn get_all(&self) -> Result<Vec<Song>, RepoError> {
      Err(RepoError::Storage("connection refused".into()))
    }

    async fn get_by_id(&self, id: SongId) -> Result<Song, RepoError> {
      Err(RepoError::not_found::<Song>(id))
    }

    async fn create(&self, _draft: SongDraft) -> Result<Song, RepoError> {
      Err(RepoError::Storage("connection refused".into()))
    }

    async fn update(&self, id: SongId, _patch: SongPatch) -> Result<Song, RepoError> {
      Err(RepoError::not_found::<Song>(id))
    }

    async fn delete(&self, id: SongId) -> Result<bool, RepoError> {
      Err(RepoError::not_found::<Song>(id))
    }
  }

  type TestStage<P> = KaraokeStage<SimulatedMicrophone, FixtureStore<Song>, P, Toasts>;

  fn stage_with<P: DataSource<Performance>>(
    profile: MicrophoneProfile,
    performances: P,
  ) -> (TestStage<P>, Toasts) {
    let fixtures = Fixtures::embedded().unwrap();
    let songs = FixtureStore::new(fixtures.songs, LatencyConfig::none());
    let recorder = RecordingController::new(SimulatedMicrophone::new(profile), FormatPreference::default());
    let toasts = Toasts::default();
    let user_id = fixtures.users[0].id;

    let stage = KaraokeStage::new(
      SongCatalog::new(songs),
      PerformanceService::new(performances),
      recorder,
      toasts.clone(),
      user_id,
    );
    (stage, toasts)
  }

  fn stage() -> (TestStage<FixtureStore<Performance>>, Toasts) {
    let performances = FixtureStore::new(Vec::new(), LatencyConfig::none());
    stage_with(MicrophoneProfile::default(), performances)
  }

  async fn first_song_id<P: DataSource<Performance>>(stage: &mut TestStage<P>) -> SongId {
    stage.load_songs().await.unwrap()[0].id
  }

  #[tokio::test]
  async fn recording_without_a_song_is_reported() {
    let (stage, toasts) = stage();

    let err = stage.start_recording().await.unwrap_err();

    assert_eq!(err, SessionError::NoSongSelected);
    assert_eq!(stage.phase(), SessionPhase::Idle);
    assert_eq!(toasts.errors(), vec![ErrorKind::NoSongSelected]);
    assert_eq!(toasts.messages(), vec!["Please select a song first".to_string()]);
  }

  #[tokio::test(start_paused = true)]
  async fn record_stop_and_save_a_performance() {
    let (mut stage, toasts) = stage();
    let id = first_song_id(&mut stage).await;
    stage.select_song(id).await.unwrap();

    stage.start_recording().await.unwrap();
    assert_eq!(stage.phase(), SessionPhase::Capturing);

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    stage.stop_recording();
    stage.artifact_ready().await;

    assert_eq!(stage.phase(), SessionPhase::Completed);
    let artifact = stage.pending_artifact().unwrap();
    assert_eq!(artifact.song_id, id);
    assert_eq!(artifact.blob.mime_type, "audio/webm");
    assert!(!artifact.blob.is_empty());

    let saved = stage.save_performance().await.unwrap().unwrap();
    assert_eq!(saved.song_id, id);
    assert_eq!(saved.recording_url, artifact.url);
    assert!(stage.pending_artifact().is_none());
    assert_eq!(stage.performances().await.unwrap().len(), 1);

    let shared = stage.share_performance(saved.id, "instagram").await.unwrap();
    assert_eq!(shared.shared_platforms, vec!["instagram".to_string()]);

    let messages = toasts.messages();
    assert!(messages.contains(&"Recording started".to_string()));
    assert!(messages.contains(&"Recording stopped".to_string()));
    assert!(messages.contains(&"Performance saved successfully!".to_string()));
    assert_eq!(messages.last().map(String::as_str), Some("Shared to social media!"));
  }

  #[tokio::test(start_paused = true)]
  async fn changing_song_stops_the_running_session() {
    let (mut stage, _toasts) = stage();
    stage.load_songs().await.unwrap();
    let first = stage.songs()[0].id;
    let second = stage.songs()[1].id;

    stage.select_song(first).await.unwrap();
    stage.start_recording().await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    stage.select_song(second).await.unwrap();
    stage.artifact_ready().await;

    assert_eq!(stage.phase(), SessionPhase::Completed);
    assert_eq!(stage.pending_artifact().map(|a| a.song_id), Some(first));
    assert_eq!(stage.selected().map(|s| s.id), Some(second));
  }

  #[tokio::test(start_paused = true)]
  async fn second_start_is_rejected_while_capturing() {
    let (mut stage, toasts) = stage();
    let id = first_song_id(&mut stage).await;
    stage.select_song(id).await.unwrap();
    stage.start_recording().await.unwrap();

    let err = stage.start_recording().await.unwrap_err();

    assert_eq!(err, SessionError::SessionAlreadyActive);
    assert_eq!(stage.phase(), SessionPhase::Capturing);
    assert_eq!(toasts.errors(), vec![ErrorKind::SessionAlreadyActive]);
    stage.stop_recording();
    stage.artifact_ready().await;
  }

  #[tokio::test]
  async fn permission_denied_is_reported_once() {
    let profile = MicrophoneProfile { permission_granted: false, ..Default::default() };
    let (mut stage, toasts) = stage_with(profile, FixtureStore::new(Vec::new(), LatencyConfig::none()));
    let id = first_song_id(&mut stage).await;
    stage.select_song(id).await.unwrap();

    let err = stage.start_recording().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(stage.phase(), SessionPhase::Errored(ErrorKind::PermissionDenied));
    assert_eq!(toasts.errors(), vec![ErrorKind::PermissionDenied]);
    assert!(stage.pending_artifact().is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn failed_save_keeps_the_recording() {
    let (mut stage, toasts) = stage_with(MicrophoneProfile::default(), BrokenPerformances);
    let id = first_song_id(&mut stage).await;
    stage.select_song(id).await.unwrap();
    stage.start_recording().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    stage.stop_recording();
    stage.artifact_ready().await;

    let err = stage.save_performance().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
    assert!(stage.pending_artifact().is_some());
    assert_eq!(toasts.errors(), vec![ErrorKind::PersistenceFailure]);
    assert!(stage.discard_recording().is_some());
    assert!(stage.save_performance().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn ticks_follow_the_selected_lyrics() {
    let (mut stage, _toasts) = stage();
    let id = first_song_id(&mut stage).await;
    stage.select_song(id).await.unwrap();

    let at = |t: f64| PlaybackState { current_time: t, duration: 354.0, is_playing: true };

    assert_eq!(stage.tick(&at(0.5)).map(|c| c.current), Some(Some(0)));
    assert_eq!(stage.tick(&at(1.0)), None);
    assert_eq!(stage.tick(&at(5.0)).map(|c| c.current), Some(Some(1)));
    assert_eq!(stage.current_cue().map(|c| c.text.as_str()), Some("Is this just fantasy?"));
  }

  #[tokio::test]
  async fn search_matches_artist_case_insensitively() {
    let (stage, _toasts) = stage();
    let hits = stage.search("queen").await.unwrap();
    let titles: Vec<_> = hits.iter().map(|s| s.title.as_str()).collect();
    assert!(titles.contains(&"Bohemian Rhapsody"));
    assert!(titles.contains(&"Dancing Queen"));
  }

  #[tokio::test(start_paused = true)]
  async fn artifact_ready_ignores_sessions_nobody_waited_for() {
    let (mut stage, _toasts) = stage();
    let id = first_song_id(&mut stage).await;
    stage.select_song(id).await.unwrap();

    stage.start_recording().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    stage.stop_recording();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(stage.phase(), SessionPhase::Completed);
    assert!(stage.discard_recording().is_some());

    stage.start_recording().await.unwrap();
    let early = tokio::time::timeout(Duration::from_millis(400), stage.artifact_ready()).await;
    assert!(early.is_err());
    assert_eq!(stage.phase(), SessionPhase::Capturing);
    assert!(stage.pending_artifact().is_none());

    stage.stop_recording();
    stage.artifact_ready().await;
    assert_eq!(stage.phase(), SessionPhase::Completed);
    assert!(stage.pending_artifact().is_some());

    // already delivered: returns without waiting
    stage.artifact_ready().await;
  }

  #[tokio::test]
  async fn catalog_failure_is_reported() {
    let toasts = Toasts::default();
    let recorder =
      RecordingController::new(SimulatedMicrophone::default(), FormatPreference::default());
    let mut stage = KaraokeStage::new(
      SongCatalog::new(OfflineCatalog),
      PerformanceService::new(FixtureStore::<Performance>::new(Vec::new(), LatencyConfig::none())),
      recorder,
      toasts.clone(),
      UserId::new(),
    );

    assert!(stage.load_songs().await.is_err());
    assert!(stage.songs().is_empty());
    assert_eq!(toasts.errors(), vec![ErrorKind::CatalogUnavailable]);
    assert_eq!(toasts.messages(), vec!["Failed to load songs".to_string()]);
  }
}
