pub mod catalog_service;
pub mod lyric_sync;
pub mod performance_service;
pub mod recording;

pub use catalog_service::SongCatalog;
pub use lyric_sync::{CueChange, LyricTracker, active_cue_index};
pub use performance_service::PerformanceService;
pub use recording::{FormatPreference, RecordingController, SessionPhase};
