pub mod capture;
pub mod clock;
pub mod data_source;
pub mod notifier;
pub mod playback;

pub use capture::{CaptureDevice, CaptureError, CaptureHandle, ChunkSink};
pub use clock::{Clock, SystemClock};
pub use data_source::{DataSource, RepoError};
pub use notifier::Notifier;
pub use playback::PlaybackSource;
