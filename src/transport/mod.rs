pub mod hub;
pub mod messages;
pub mod recorder;

pub use hub::AudioHub;
pub use messages::{AudioBufferMessage, AudioFileBufferMessage, PcmMessage};
pub use recorder::{FileBufferOutcome, FileRecorder};
