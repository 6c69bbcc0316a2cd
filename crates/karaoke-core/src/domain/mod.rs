pub mod entity;
pub mod ids;
pub mod lyrics;
pub mod performance;
pub mod playback;
pub mod song;
pub mod user;

pub use entity::Entity;
pub use ids::{PerformanceId, SessionId, SongId, UserId};
pub use lyrics::LyricCue;
pub use performance::{Performance, PerformanceArtifact, RecordingBlob};
pub use playback::PlaybackState;
pub use song::Song;
pub use user::User;
