use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use karaoke_core::ports::{CaptureDevice, CaptureError, CaptureHandle, ChunkSink};

/// What the simulated platform offers.
#[derive(Debug, Clone)]
pub struct MicrophoneProfile {
  /// The platform has a capture facility at all.
  pub available: bool,
  pub permission_granted: bool,
  pub has_hardware: bool,
  pub formats: Vec<String>,
  pub chunk_interval: Duration,
  pub chunk_bytes: usize,
}

impl Default for MicrophoneProfile {
  fn default() -> Self {
    Self {
      available: true,
      permission_granted: true,
      has_hardware: true,
      formats: vec!["audio/webm".into(), "audio/wav".into()],
      chunk_interval: Duration::from_millis(250),
      chunk_bytes: 512,
    }
  }
}

/// Capture device that produces synthetic audio chunks on a timer.
///
/// Used by the headless host and by tests that need push delivery from a
/// separate task.
#[derive(Debug, Clone, Default)]
pub struct SimulatedMicrophone {
  profile: MicrophoneProfile,
}

impl SimulatedMicrophone {
  pub fn new(profile: MicrophoneProfile) -> Self {
    Self { profile }
  }
}

#[async_trait]
impl CaptureDevice for SimulatedMicrophone {
  fn is_available(&self) -> bool {
    self.profile.available
  }

  fn supports_format(&self, mime_type: &str) -> bool {
    self.profile.formats.iter().any(|f| f == mime_type)
  }

  async fn acquire(&self, sink: Arc<dyn ChunkSink>) -> Result<Arc<dyn CaptureHandle>, CaptureError> {
    if !self.profile.available {
      return Err(CaptureError::NotSupported);
    }
    if !self.profile.permission_granted {
      return Err(CaptureError::PermissionDenied);
    }
    if !self.profile.has_hardware {
      return Err(CaptureError::NotFound);
    }

    info!("simulated microphone acquired");
    Ok(Arc::new(SimulatedCapture {
      sink,
      interval: self.profile.chunk_interval,
      chunk_bytes: self.profile.chunk_bytes,
      stop: Arc::new(Notify::new()),
      task: Mutex::new(None),
      released: AtomicBool::new(false),
    }))
  }
}

struct SimulatedCapture {
  sink: Arc<dyn ChunkSink>,
  interval: Duration,
  chunk_bytes: usize,
  stop: Arc<Notify>,
  task: Mutex<Option<JoinHandle<()>>>,
  released: AtomicBool,
}

/// One chunk of a slow sawtooth; the first byte carries the chunk number.
fn synth_chunk(seq: u32, len: usize) -> Vec<u8> {
  let mut chunk: Vec<u8> = (0..len).map(|i| ((i as u32 + seq * 7) % 256) as u8).collect();
  if let Some(first) = chunk.first_mut() {
    *first = (seq % 256) as u8;
  }
  chunk
}

impl CaptureHandle for SimulatedCapture {
  fn start(&self, mime_type: &str) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
      warn!("no tokio runtime, simulated microphone stays silent");
      return;
    };

    debug!(mime_type, "simulated capture started");
    let sink = Arc::clone(&self.sink);
    let stop = Arc::clone(&self.stop);
    let period = self.interval;
    let len = self.chunk_bytes;

    let task = runtime.spawn(async move {
      let mut ticker = tokio::time::interval(period);
      ticker.tick().await;
      let mut seq = 0u32;

      loop {
        tokio::select! {
          _ = ticker.tick() => {
            sink.push_chunk(synth_chunk(seq, len));
            seq += 1;
          }
          _ = stop.notified() => {
            // flush the partial chunk, then report completion
            sink.push_chunk(synth_chunk(seq, len / 2));
            sink.finished();
            break;
          }
        }
      }
    });

    if let Ok(mut slot) = self.task.lock() {
      *slot = Some(task);
    }
  }

  fn request_stop(&self) {
    self.stop.notify_one();
  }

  fn release(&self) {
    if self.released.swap(true, Ordering::SeqCst) {
      return;
    }
    if let Ok(mut slot) = self.task.lock() {
      if let Some(task) = slot.take() {
        if !task.is_finished() {
          task.abort();
        }
      }
    }
    info!("simulated microphone released");
  }
}
