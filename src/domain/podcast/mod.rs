pub mod model;

pub use model::{Podcast, PodcastSegment, SegmentAudio};

/// Version tag written by the synthesis engine for freshly produced audio.
pub const DEFAULT_VERSION_TAG: &str = "default";
