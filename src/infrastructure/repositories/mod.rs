pub mod persona_repository;
pub mod podcast_repository;
pub mod segment_audio_repository;
pub mod task_repository;

pub use persona_repository::{PersonaRepository, PgPersonaRepository};
pub use podcast_repository::{PgPodcastRepository, PodcastRepository};
pub use segment_audio_repository::{PgSegmentAudioRepository, SegmentAudioRepository};
pub use task_repository::{PgTaskRepository, TaskRepository};
