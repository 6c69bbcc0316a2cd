use karaoke_core::{ErrorKind, SessionError};
use karaoke_core::ports::Notifier;
use tracing::{error, info};

/// Text shown to the user for each failure kind.
pub fn user_message(kind: ErrorKind) -> &'static str {
  match kind {
    ErrorKind::NoSongSelected => "Please select a song first",
    ErrorKind::SessionAlreadyActive => "A recording is already in progress",
    ErrorKind::DeviceUnavailable => "Recording is not supported on this device",
    ErrorKind::PermissionDenied => {
      "Microphone access denied. Please allow microphone access and try again."
    }
    ErrorKind::NoDeviceFound => "No microphone found. Please connect a microphone and try again.",
    ErrorKind::FormatUnsupported => "Audio recording format not supported",
    ErrorKind::DeviceError => "Recording error occurred",
    ErrorKind::PersistenceFailure => "Failed to save performance",
    ErrorKind::CatalogUnavailable => "Failed to load songs",
  }
}

/// Like [`user_message`], but tells a failed microphone request apart from a
/// failure in the middle of a take.
pub fn session_message(err: &SessionError) -> &'static str {
  match err {
    SessionError::AcquisitionFailed(_) => "Failed to access microphone",
    other => user_message(other.kind()),
  }
}

/// A `Notifier` that turns transient notifications into log lines.
///
/// Stands in for the toast layer when running headless.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  fn success(&self, message: &str) {
    info!(target: "karaoke::toast", "{message}");
  }

  fn error(&self, kind: ErrorKind, message: &str) {
    error!(target: "karaoke::toast", ?kind, "{message}");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn acquisition_failures_read_differently_from_capture_failures() {
    let acquiring = SessionError::AcquisitionFailed("busy".into());
    let capturing = SessionError::DeviceError("unplugged".into());

    assert_eq!(acquiring.kind(), capturing.kind());
    assert_eq!(session_message(&acquiring), "Failed to access microphone");
    assert_eq!(session_message(&capturing), "Recording error occurred");
    assert_eq!(session_message(&SessionError::NoSongSelected), "Please select a song first");
  }
}
