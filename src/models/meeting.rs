use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Meeting visibility values accepted by the scheduling API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

// Committee attached to a meeting, with the voting statuses that
// qualify a member for committee-derived registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committee {
    pub uid: String,
    #[serde(default)]
    pub allowed_voting_statuses: Vec<String>,
}

/// Recurrence rule in the provider's wire shape.
///
/// `type`: 1 = daily, 2 = weekly, 3 = monthly. Weekly rules carry
/// `weekly_days` as a comma-separated list of weekday codes 1-7
/// (Sunday = 1). Monthly rules carry either `monthly_day` or the
/// `monthly_week` + `monthly_week_day` pair, never both. Termination is
/// `end_times` (absolute count) or `end_date_time` (inclusive); with
/// neither set the rule is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    #[serde(rename = "type")]
    pub recurrence_type: i32,
    #[serde(default = "default_repeat_interval")]
    pub repeat_interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_days: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_week: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_week_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_times: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date_time: Option<DateTime<Utc>>,
}

fn default_repeat_interval() -> u32 {
    1
}

// Durable meeting record owned by the scheduling API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub uid: String,
    pub project_uid: String,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub duration: u32, // minutes, 0-600
    pub timezone: String,
    pub recurrence: Option<RecurrenceRule>,
    pub visibility: Visibility,
    pub restricted: bool,
    pub committees: Vec<Committee>,
    pub platform: String,
    pub organizers: Vec<String>,
    pub recording_enabled: bool,
    pub transcript_enabled: bool,
    pub youtube_upload_enabled: bool,
    pub artifact_visibility: String,
    pub join_url: Option<String>,
    pub provider_meeting_id: Option<String>,
    pub created_by: String,
}

// Request body shared by meeting create and update
#[derive(Debug, Clone, Deserialize)]
pub struct MeetingInput {
    pub project_uid: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub duration: u32,
    pub timezone: String,
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    pub visibility: Visibility,
    #[serde(default)]
    pub restricted: bool,
    #[serde(default)]
    pub committees: Vec<Committee>,
    pub platform: String,
    #[serde(default)]
    pub organizers: Vec<String>,
    #[serde(default)]
    pub recording_enabled: bool,
    #[serde(default)]
    pub transcript_enabled: bool,
    #[serde(default)]
    pub youtube_upload_enabled: bool,
    #[serde(default = "default_artifact_visibility")]
    pub artifact_visibility: String,
}

fn default_artifact_visibility() -> String {
    "meeting_hosts".to_string()
}

// Per-meeting settings, versioned independently of the meeting itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSettings {
    pub meeting_uid: String,
    pub organizers: Vec<String>,
    pub recording_enabled: bool,
    pub transcript_enabled: bool,
    pub youtube_upload_enabled: bool,
    pub artifact_visibility: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingSettingsInput {
    pub organizers: Vec<String>,
    pub recording_enabled: bool,
    pub transcript_enabled: bool,
    pub youtube_upload_enabled: bool,
    pub artifact_visibility: String,
}

/// One resolved occurrence of a meeting: the raw expansion with any
/// override (cancellation, edited start/duration/topic) and the RSVP
/// counters applied.
#[derive(Debug, Clone, Serialize)]
pub struct Occurrence {
    pub occurrence_id: String,
    pub start_time: DateTime<Utc>,
    pub duration: u32,
    pub title: String,
    pub cancelled: bool,
    pub registrant_count: u32,
    pub accepted_count: u32,
    pub declined_count: u32,
}

// Request body for editing a single occurrence without touching the rule
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccurrenceEdit {
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
}
