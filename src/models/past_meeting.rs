use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::meeting::{Committee, Visibility};

// One contiguous in-progress segment; a restart appends a new session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_uid: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Recording,
    Transcript,
}

// Metadata reference to a provider-produced artifact; bytes live in
// object storage, the engine only keeps the pointer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub artifact_uid: String,
    pub kind: ArtifactKind,
    pub object_uid: Option<String>,
    pub url: Option<String>,
    pub file_size: Option<u64>,
}

// Reconciliation state for one (meeting, occurrence) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Open,
    Closed,
    Enriched,
}

/// Durable record of one occurrence that actually happened.
///
/// Meeting fields are a snapshot taken at first webhook touch and never
/// retroactively refreshed from later meeting edits. Exactly one record
/// exists per (meeting_uid, occurrence_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PastMeeting {
    pub uid: String,
    pub meeting_uid: String,
    pub occurrence_id: String,
    pub project_uid: String,
    pub title: String,
    pub description: String,
    pub committees: Vec<Committee>,
    pub visibility: Visibility,
    pub restricted: bool,
    pub platform: String,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_duration: u32,
    pub sessions: Vec<Session>,
    pub artifacts: Vec<ArtifactRef>,
}

impl PastMeeting {
    /// Current reconciliation state. `has_summary` is whether a summary
    /// record exists for this past meeting; summaries live in their own
    /// table so the caller supplies the flag.
    pub fn lifecycle_state(&self, has_summary: bool) -> LifecycleState {
        if self.sessions.iter().any(|s| s.end_time.is_none()) {
            LifecycleState::Open
        } else if has_summary || !self.artifacts.is_empty() {
            LifecycleState::Enriched
        } else {
            LifecycleState::Closed
        }
    }
}

// Manual past-meeting entry; must obey the same (meeting, occurrence)
// uniqueness as the webhook path
#[derive(Debug, Clone, Deserialize)]
pub struct PastMeetingInput {
    pub meeting_uid: String,
    pub occurrence_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PastMeetingParticipant {
    pub uid: String,
    pub past_meeting_uid: String,
    pub email: String,
    pub name: String,
    // Independent flags: invited without attending, or walk-in attendance
    pub is_invited: bool,
    pub is_attended: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticipantUpdateInput {
    #[serde(default)]
    pub is_invited: Option<bool>,
    #[serde(default)]
    pub is_attended: Option<bool>,
}

/// AI-generated summary with an editable overlay. The raw fields are
/// only ever written by reconciliation; the edited fields are only ever
/// written by clients, so neither side can destroy the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PastMeetingSummary {
    pub uid: String,
    pub past_meeting_uid: String,
    pub summary_overview: String,
    pub summary_details: String,
    pub edited_overview: Option<String>,
    pub edited_details: Option<String>,
    pub approved: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryUpdateInput {
    #[serde(default)]
    pub edited_overview: Option<String>,
    #[serde(default)]
    pub edited_details: Option<String>,
    #[serde(default)]
    pub approved: Option<bool>,
}
