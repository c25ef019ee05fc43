use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Podcast {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of dialogue in a podcast script. Immutable once handed to the
/// synthesis engine; `speaker_persona_id` is resolved before synthesis.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PodcastSegment {
    pub id: Uuid,
    pub podcast_id: Uuid,
    pub idx: i32,
    pub speaker_name: String,
    pub speaker_persona_id: Option<i32>,
    pub text: String,
}

/// A persisted audio artifact for one segment. Rows are append-only; the
/// latest row for a (segment, version_tag) pair wins for playback and merge.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SegmentAudio {
    pub id: Uuid,
    pub segment_id: Uuid,
    pub version_tag: String,
    pub audio_url: String,
    pub params: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
