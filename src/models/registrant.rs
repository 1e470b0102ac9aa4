use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// How the registrant came to be attached to the meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrantType {
    Direct,
    Committee,
}

/// Registrant attached to exactly one meeting.
///
/// `occurrence_id` of `None` means the registrant is invited to every
/// occurrence. `invited_count` and `attended_count` are read-only from
/// the client's point of view; reconciliation maintains them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registrant {
    pub uid: String,
    pub meeting_uid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub org: Option<String>,
    pub host: bool,
    pub occurrence_id: Option<String>,
    #[serde(rename = "type")]
    pub registrant_type: RegistrantType,
    pub invited_count: u32,
    pub attended_count: u32,
    pub provider_registrant_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrantInput {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub host: bool,
    #[serde(default)]
    pub occurrence_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpResponse {
    Accepted,
    Maybe,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpScope {
    Single,
    All,
    ThisAndFollowing,
}

/// One RSVP submission. Records are append-only: a newer submission
/// supersedes older ones occurrence-by-occurrence but never deletes
/// them, so the audit trail survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rsvp {
    pub uid: String,
    pub meeting_uid: String,
    pub registrant_uid: String,
    pub response: RsvpResponse,
    pub scope: RsvpScope,
    pub occurrence_id: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RsvpInput {
    pub registrant_uid: String,
    pub response: RsvpResponse,
    pub scope: RsvpScope,
    #[serde(default)]
    pub occurrence_id: Option<String>,
}
