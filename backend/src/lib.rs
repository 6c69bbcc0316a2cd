mod config;
pub mod infrastructure;
pub mod stage;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use karaoke_core::domain::{Performance, PlaybackState, Song};
use karaoke_core::services::{PerformanceService, RecordingController, SongCatalog};
use karaoke_storage::{FixtureStore, KaraokeStore};

pub use crate::config::{RecordingConfig, SessionConfig};
use infrastructure::microphone::SimulatedMicrophone;
use infrastructure::notifier::TracingNotifier;
use stage::KaraokeStage;

/// Type alias to simplify the generic signature of the stage.
pub type ConcreteStage =
  KaraokeStage<SimulatedMicrophone, Arc<FixtureStore<Song>>, Arc<FixtureStore<Performance>>, TracingNotifier>;

/// How often the demo advances the accompaniment clock.
const TICK: Duration = Duration::from_millis(100);

fn init_tracing() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();
}

/// Wires the adapters into the core services.
pub async fn build_stage() -> anyhow::Result<ConcreteStage> {
  // 1. Data source (fixtures + simulated latency)
  let store = KaraokeStore::new_from_config().await.context("loading fixtures")?;

  // 2. Capture adapter
  let recording = RecordingConfig::load().context("loading [recording]")?;
  let recorder = RecordingController::new(SimulatedMicrophone::default(), recording.into());

  // 3. Services
  let session = SessionConfig::load().context("loading [session]")?;
  let stage = KaraokeStage::new(
    SongCatalog::new(Arc::clone(&store.songs)),
    PerformanceService::new(Arc::clone(&store.performances)),
    recorder,
    TracingNotifier,
    session.user_id,
  );

  Ok(stage)
}

/// Scripted session: pick a song, sing along for a few seconds, save.
pub async fn run() -> anyhow::Result<()> {
  init_tracing();

  let mut stage = build_stage().await?;

  let first = {
    let songs = stage.load_songs().await?;
    for song in songs {
      info!(id = %song.id, title = %song.title, artist = %song.artist, "available");
    }
    songs.first().map(|s| s.id).context("no songs in the catalog")?
  };

  let song = stage.select_song(first).await?;
  if let Err(e) = stage.start_recording().await {
    warn!(error = %e, "recording did not start");
    return Ok(());
  }

  let mut playback = PlaybackState { current_time: 0.0, duration: song.duration, is_playing: true };
  while playback.current_time < 6.0 {
    if let Some(change) = stage.tick(&playback) {
      if let Some(cue) = change.current.and_then(|i| song.cues().get(i)) {
        info!(time = playback.current_time, "♪ {}", cue.text);
      }
    }
    tokio::time::sleep(TICK).await;
    playback.current_time += TICK.as_secs_f64();
  }

  stage.stop_recording();
  tokio::time::timeout(Duration::from_secs(5), stage.artifact_ready())
    .await
    .context("recording never finished")?;

  if let Some(performance) = stage.save_performance().await? {
    let performance = stage.share_performance(performance.id, "youtube").await?;
    info!("saved:\n{}", serde_json::to_string_pretty(&performance)?);
  }

  let total = stage.performances().await?.len();
  info!(total, "performances in store");
  Ok(())
}
