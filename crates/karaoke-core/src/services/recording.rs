//! Recording session controller.
//!
//! ```text
//! Idle -> Requesting -> Capturing -> Stopping -> Completed
//!             |             |
//!             +--> Errored <+
//! ```
//!
//! Transitions are driven by the host (`start`, `stop`, `finalize`) and by
//! the capture device through its [`ChunkSink`]. The device handle is owned
//! by the session and released on every path out of `Capturing`/`Stopping`.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::{PerformanceArtifact, RecordingBlob, SessionId, Song, SongId};
use crate::errors::{ErrorKind, SessionError};
use crate::ports::{CaptureDevice, CaptureError, CaptureHandle, ChunkSink, Clock, SystemClock};

/// Accepted encodings, in order of preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPreference {
  pub primary: String,
  pub fallback: String,
}

impl Default for FormatPreference {
  fn default() -> Self {
    Self { primary: "audio/webm".to_string(), fallback: "audio/wav".to_string() }
  }
}

impl FormatPreference {
  pub fn candidates(&self) -> Vec<String> {
    vec![self.primary.clone(), self.fallback.clone()]
  }

  /// Primary if the device supports it, else the fallback, else `None`.
  pub fn negotiate<D: CaptureDevice + ?Sized>(&self, device: &D) -> Option<String> {
    [&self.primary, &self.fallback].into_iter().find(|m| device.supports_format(m)).cloned()
  }
}

/// Observable state of the controller, as seen by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
  Idle,
  Requesting,
  Capturing,
  Stopping,
  Completed,
  Errored(ErrorKind),
}

impl SessionPhase {
  /// A session holds (or is about to hold) the device.
  pub fn is_active(&self) -> bool {
    matches!(self, SessionPhase::Requesting | SessionPhase::Capturing | SessionPhase::Stopping)
  }
}

struct ActiveSession {
  id: SessionId,
  song_id: SongId,
  mime_type: String,
  handle: Arc<dyn CaptureHandle>,
  started_at: Instant,
  chunks: Vec<Vec<u8>>,
}

impl ActiveSession {
  fn into_artifact(self, stopped_at: Instant) -> (Arc<dyn CaptureHandle>, PerformanceArtifact) {
    let duration = stopped_at.saturating_duration_since(self.started_at);
    let data = self.chunks.concat();

    let artifact = PerformanceArtifact {
      url: format!("blob:karaoke/{}", self.id),
      blob: RecordingBlob { mime_type: self.mime_type, data },
      song_id: self.song_id,
      duration,
    };

    (self.handle, artifact)
  }
}

enum SessionState {
  Idle,
  Requesting { id: SessionId, song_id: SongId, stop_requested: bool },
  Capturing(ActiveSession),
  Stopping { session: ActiveSession, stopped_at: Instant },
  Completed,
  Errored(ErrorKind),
}

impl SessionState {
  fn phase(&self) -> SessionPhase {
    match self {
      SessionState::Idle => SessionPhase::Idle,
      SessionState::Requesting { .. } => SessionPhase::Requesting,
      SessionState::Capturing(_) => SessionPhase::Capturing,
      SessionState::Stopping { .. } => SessionPhase::Stopping,
      SessionState::Completed => SessionPhase::Completed,
      SessionState::Errored(kind) => SessionPhase::Errored(*kind),
    }
  }

  fn session_id(&self) -> Option<SessionId> {
    match self {
      SessionState::Requesting { id, .. } => Some(*id),
      SessionState::Capturing(s) | SessionState::Stopping { session: s, .. } => Some(s.id),
      _ => None,
    }
  }
}

type ArtifactListener = Arc<dyn Fn(&PerformanceArtifact) + Send + Sync>;
type ErrorListener = Arc<dyn Fn(&SessionError) + Send + Sync>;
type PhaseListener = Arc<dyn Fn(SessionPhase) + Send + Sync>;

#[derive(Default)]
struct Listeners {
  artifact: Vec<ArtifactListener>,
  error: Vec<ErrorListener>,
  phase: Vec<PhaseListener>,
}

/// Work decided under the state lock and carried out after releasing it, so
/// device calls and listeners may re-enter the controller.
#[derive(Default)]
struct Effects {
  phases: Vec<SessionPhase>,
  release: Option<Arc<dyn CaptureHandle>>,
  start: Option<(Arc<dyn CaptureHandle>, String)>,
  request_stop: Option<Arc<dyn CaptureHandle>>,
  error: Option<SessionError>,
  artifact: Option<PerformanceArtifact>,
}

struct Shared {
  state: Mutex<SessionState>,
  listeners: Mutex<Listeners>,
  clock: Arc<dyn Clock>,
}

impl Shared {
  fn lock_state(&self) -> MutexGuard<'_, SessionState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn lock_listeners(&self) -> MutexGuard<'_, Listeners> {
    self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn apply(&self, fx: Effects) {
    if let Some(handle) = fx.release {
      handle.release();
    }

    let (phase_ls, error_ls, artifact_ls) = {
      let l = self.lock_listeners();
      (l.phase.clone(), l.error.clone(), l.artifact.clone())
    };

    for phase in &fx.phases {
      for listener in &phase_ls {
        listener(*phase);
      }
    }

    if let Some(err) = &fx.error {
      for listener in &error_ls {
        listener(err);
      }
    }

    if let Some(artifact) = &fx.artifact {
      for listener in &artifact_ls {
        listener(artifact);
      }
    }

    if let Some((handle, mime_type)) = fx.start {
      handle.start(&mime_type);
    }

    if let Some(handle) = fx.request_stop {
      handle.request_stop();
    }
  }

  /// Requesting -> Errored. A handle acquired before the failure is released.
  fn fail_request(
    &self,
    id: SessionId,
    err: SessionError,
    handle: Option<Arc<dyn CaptureHandle>>,
  ) -> SessionError {
    let mut fx = Effects { release: handle, ..Default::default() };

    {
      let mut state = self.lock_state();
      if matches!(&*state, SessionState::Requesting { id: sid, .. } if *sid == id) {
        warn!(session = %id, error = %err, "microphone request failed");
        *state = SessionState::Errored(err.kind());
        fx.phases.push(SessionPhase::Errored(err.kind()));
        fx.error = Some(err.clone());
      }
    }

    self.apply(fx);
    err
  }

  /// Requesting -> Capturing, or straight to Completed if a stop was queued
  /// while the device was being acquired.
  fn device_ready(
    &self,
    id: SessionId,
    handle: Arc<dyn CaptureHandle>,
    mime_type: String,
  ) -> Result<(), SessionError> {
    let mut fx = Effects::default();
    let mut result = Ok(());

    {
      let mut state = self.lock_state();
      match mem::replace(&mut *state, SessionState::Idle) {
        SessionState::Requesting { id: sid, song_id, stop_requested } if sid == id => {
          let now = self.clock.now();
          let session =
            ActiveSession { id, song_id, mime_type: mime_type.clone(), handle, started_at: now, chunks: Vec::new() };

          if stop_requested {
            info!(session = %id, "stop was queued during acquisition, completing empty session");
            let (handle, artifact) = session.into_artifact(now);
            *state = SessionState::Completed;
            fx.phases =
              vec![SessionPhase::Capturing, SessionPhase::Stopping, SessionPhase::Completed];
            fx.release = Some(handle);
            fx.artifact = Some(artifact);
          } else {
            info!(session = %id, mime_type = %mime_type, "capturing");
            fx.start = Some((Arc::clone(&session.handle), mime_type));
            *state = SessionState::Capturing(session);
            fx.phases.push(SessionPhase::Capturing);
          }
        }
        other => {
          // aborted while acquiring (device failure reported through the sink)
          *state = other;
          warn!(session = %id, "session no longer requesting, releasing late device handle");
          fx.release = Some(handle);
          result = Err(SessionError::AcquisitionFailed("session aborted during acquisition".into()));
        }
      }
    }

    self.apply(fx);
    result
  }

  /// The `start` future was dropped mid-acquisition: Requesting -> Errored.
  /// No-op once the session has left `Requesting`.
  fn abandon_request(&self, id: SessionId) {
    let mut fx = Effects::default();

    {
      let mut state = self.lock_state();
      if matches!(&*state, SessionState::Requesting { id: sid, .. } if *sid == id) {
        warn!(session = %id, "microphone request cancelled");
        let err = SessionError::AcquisitionFailed("microphone request cancelled".into());
        *state = SessionState::Errored(err.kind());
        fx.phases.push(SessionPhase::Errored(err.kind()));
        fx.error = Some(err);
      }
    }

    self.apply(fx);
  }

  fn stop(&self) {
    let mut fx = Effects::default();

    {
      let mut state = self.lock_state();
      *state = match mem::replace(&mut *state, SessionState::Idle) {
        SessionState::Requesting { id, song_id, .. } => {
          info!(session = %id, "stop queued until the microphone is ready");
          SessionState::Requesting { id, song_id, stop_requested: true }
        }
        SessionState::Capturing(session) => {
          info!(session = %session.id, chunks = session.chunks.len(), "stopping");
          fx.request_stop = Some(Arc::clone(&session.handle));
          fx.phases.push(SessionPhase::Stopping);
          SessionState::Stopping { session, stopped_at: self.clock.now() }
        }
        other => {
          debug!(phase = ?other.phase(), "stop ignored");
          other
        }
      };
    }

    self.apply(fx);
  }

  /// Stopping -> Completed. `only` restricts it to a given session (device
  /// callbacks); the host passes `None`.
  fn finalize(&self, only: Option<SessionId>) {
    let mut fx = Effects::default();

    {
      let mut state = self.lock_state();
      *state = match mem::replace(&mut *state, SessionState::Idle) {
        SessionState::Stopping { session, stopped_at } if only.is_none_or(|id| id == session.id) => {
          let id = session.id;
          let (handle, artifact) = session.into_artifact(stopped_at);
          info!(
            session = %id,
            bytes = artifact.blob.len(),
            duration_ms = artifact.duration.as_millis() as u64,
            "recording completed"
          );
          fx.release = Some(handle);
          fx.phases.push(SessionPhase::Completed);
          fx.artifact = Some(artifact);
          SessionState::Completed
        }
        other => {
          debug!(phase = ?other.phase(), "finalize ignored");
          other
        }
      };
    }

    self.apply(fx);
  }

  fn push_chunk(&self, id: SessionId, chunk: Vec<u8>) {
    if chunk.is_empty() {
      return;
    }

    let mut state = self.lock_state();
    match &mut *state {
      SessionState::Capturing(s) | SessionState::Stopping { session: s, .. } if s.id == id => {
        s.chunks.push(chunk);
      }
      _ => debug!(session = %id, "dropping chunk from inactive session"),
    }
  }

  fn device_failed(&self, id: SessionId, reason: String) {
    let mut fx = Effects::default();
    let mut finalize_stopping = false;

    {
      let mut state = self.lock_state();
      *state = match mem::replace(&mut *state, SessionState::Idle) {
        SessionState::Capturing(session) if session.id == id => {
          warn!(session = %id, reason = %reason, discarded = session.chunks.len(), "capture device failed");
          let err = SessionError::DeviceError(reason);
          fx.release = Some(session.handle);
          fx.phases.push(SessionPhase::Errored(err.kind()));
          fx.error = Some(err);
          SessionState::Errored(ErrorKind::DeviceError)
        }
        SessionState::Requesting { id: sid, .. } if sid == id => {
          warn!(session = %id, reason = %reason, "capture device failed during acquisition");
          let err = SessionError::AcquisitionFailed(reason);
          fx.phases.push(SessionPhase::Errored(err.kind()));
          fx.error = Some(err);
          SessionState::Errored(ErrorKind::DeviceError)
        }
        stopping @ SessionState::Stopping { .. } if stopping.session_id() == Some(id) => {
          // the user already asked to stop: keep what was captured
          warn!(session = %id, reason = %reason, "capture device failed while stopping");
          finalize_stopping = true;
          stopping
        }
        other => other,
      };
    }

    self.apply(fx);
    if finalize_stopping {
      self.finalize(Some(id));
    }
  }
}

impl Drop for Shared {
  fn drop(&mut self) {
    let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
    if let SessionState::Capturing(s) | SessionState::Stopping { session: s, .. } = state {
      warn!(session = %s.id, "controller dropped mid-session, releasing device");
      s.handle.release();
    }
  }
}

/// Lives as long as one `start` call. Leaves `Requesting` behind if the call
/// is cancelled while the device is being acquired.
struct RequestGuard<'a> {
  shared: &'a Shared,
  id: SessionId,
}

impl Drop for RequestGuard<'_> {
  fn drop(&mut self) {
    self.shared.abandon_request(self.id);
  }
}

/// Sink handed to the device for one session.
struct SessionSink {
  id: SessionId,
  shared: Weak<Shared>,
}

impl ChunkSink for SessionSink {
  fn push_chunk(&self, chunk: Vec<u8>) {
    if let Some(shared) = self.shared.upgrade() {
      shared.push_chunk(self.id, chunk);
    }
  }

  fn fail(&self, reason: String) {
    if let Some(shared) = self.shared.upgrade() {
      shared.device_failed(self.id, reason);
    }
  }

  fn finished(&self) {
    if let Some(shared) = self.shared.upgrade() {
      shared.finalize(Some(self.id));
    }
  }
}

fn map_capture_error(err: CaptureError) -> SessionError {
  match err {
    CaptureError::NotSupported => SessionError::DeviceUnavailable,
    CaptureError::PermissionDenied => SessionError::PermissionDenied,
    CaptureError::NotFound => SessionError::NoDeviceFound,
    CaptureError::Other(msg) => SessionError::AcquisitionFailed(msg),
  }
}

/// Drives one recording session at a time over an injected capture device.
///
/// Cloning yields another handle on the same controller.
pub struct RecordingController<D> {
  device: Arc<D>,
  formats: FormatPreference,
  shared: Arc<Shared>,
}

impl<D> Clone for RecordingController<D> {
  fn clone(&self) -> Self {
    Self { device: Arc::clone(&self.device), formats: self.formats.clone(), shared: Arc::clone(&self.shared) }
  }
}

impl<D: CaptureDevice> RecordingController<D> {
  pub fn new(device: D, formats: FormatPreference) -> Self {
    Self::with_clock(device, formats, Arc::new(SystemClock))
  }

  pub fn with_clock(device: D, formats: FormatPreference, clock: Arc<dyn Clock>) -> Self {
    let shared = Shared {
      state: Mutex::new(SessionState::Idle),
      listeners: Mutex::new(Listeners::default()),
      clock,
    };
    Self { device: Arc::new(device), formats, shared: Arc::new(shared) }
  }

  pub fn device(&self) -> &D {
    &self.device
  }

  pub fn formats(&self) -> &FormatPreference {
    &self.formats
  }

  pub fn phase(&self) -> SessionPhase {
    self.shared.lock_state().phase()
  }

  pub fn is_active(&self) -> bool {
    self.phase().is_active()
  }

  /// Encoding of the running session, if any.
  pub fn mime_type(&self) -> Option<String> {
    match &*self.shared.lock_state() {
      SessionState::Capturing(s) | SessionState::Stopping { session: s, .. } => {
        Some(s.mime_type.clone())
      }
      _ => None,
    }
  }

  pub fn buffered_chunks(&self) -> usize {
    match &*self.shared.lock_state() {
      SessionState::Capturing(s) | SessionState::Stopping { session: s, .. } => s.chunks.len(),
      _ => 0,
    }
  }

  /// Called exactly once per completed session.
  pub fn on_artifact_ready<F>(&self, f: F)
  where
    F: Fn(&PerformanceArtifact) + Send + Sync + 'static,
  {
    self.shared.lock_listeners().artifact.push(Arc::new(f));
  }

  /// Called on entry to `Errored`.
  pub fn on_error<F>(&self, f: F)
  where
    F: Fn(&SessionError) + Send + Sync + 'static,
  {
    self.shared.lock_listeners().error.push(Arc::new(f));
  }

  pub fn on_state_change<F>(&self, f: F)
  where
    F: Fn(SessionPhase) + Send + Sync + 'static,
  {
    self.shared.lock_listeners().phase.push(Arc::new(f));
  }

  /// Starts a fresh session for `song`.
  ///
  /// Suspends while the device is acquired. Returns once the session is
  /// capturing (or already completed, if `stop` was called meanwhile).
  pub async fn start(&self, song: Option<&Song>) -> Result<(), SessionError> {
    let Some(song) = song else {
      warn!("recording requested without a selected song");
      return Err(SessionError::NoSongSelected);
    };

    let id = SessionId::new();
    {
      let mut state = self.shared.lock_state();
      if state.phase().is_active() {
        warn!(active = ?state.session_id(), "recording already in progress, start rejected");
        return Err(SessionError::SessionAlreadyActive);
      }
      *state = SessionState::Requesting { id, song_id: song.id, stop_requested: false };
    }

    let _guard = RequestGuard { shared: &*self.shared, id };

    info!(session = %id, song = %song.id, title = %song.title, "requesting microphone");
    self.shared.apply(Effects { phases: vec![SessionPhase::Requesting], ..Default::default() });

    if !self.device.is_available() {
      return Err(self.shared.fail_request(id, SessionError::DeviceUnavailable, None));
    }

    let sink: Arc<dyn ChunkSink> = Arc::new(SessionSink { id, shared: Arc::downgrade(&self.shared) });
    let handle = match self.device.acquire(sink).await {
      Ok(handle) => handle,
      Err(e) => return Err(self.shared.fail_request(id, map_capture_error(e), None)),
    };

    let Some(mime_type) = self.formats.negotiate(&*self.device) else {
      let err = SessionError::FormatUnsupported { tried: self.formats.candidates() };
      return Err(self.shared.fail_request(id, err, Some(handle)));
    };

    self.shared.device_ready(id, handle, mime_type)
  }

  /// No-op unless a session is capturing; queued while the device is being
  /// acquired.
  pub fn stop(&self) {
    self.shared.stop();
  }

  /// Completes a stopping session with what has been buffered so far.
  ///
  /// Devices normally trigger this through `ChunkSink::finished`.
  pub fn finalize(&self) {
    self.shared.finalize(None);
  }
}
