use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Provider lifecycle event, dispatched on the `event` field with the
/// domain payload under `payload`. Kinds the engine does not know fold
/// into `Unknown` so the reconciler match stays exhaustive without
/// failing the whole delivery.
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    MeetingStarted(MeetingStartedPayload),
    MeetingEnded(MeetingEndedPayload),
    ParticipantJoined(ParticipantPayload),
    ParticipantLeft(ParticipantPayload),
    RecordingCompleted(ArtifactPayload),
    TranscriptCompleted(ArtifactPayload),
    SummaryCompleted(SummaryPayload),
    UrlValidation(UrlValidationPayload),
    Unknown,
}

// The `event` tag is an open-ended string on the wire, and unknown kinds
// still carry a payload, so the envelope is read in two steps: tag first,
// then the payload for the kinds the engine knows. Anything else folds to
// `Unknown` with its payload left undecoded.
impl<'de> Deserialize<'de> for ProviderEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Envelope {
            event: String,
            #[serde(default)]
            payload: serde_json::Value,
        }

        let Envelope { event, payload } = Envelope::deserialize(deserializer)?;
        Ok(match event.as_str() {
            "meeting.started" => ProviderEvent::MeetingStarted(
                serde_json::from_value(payload).map_err(de::Error::custom)?,
            ),
            "meeting.ended" => ProviderEvent::MeetingEnded(
                serde_json::from_value(payload).map_err(de::Error::custom)?,
            ),
            "meeting.participant_joined" => ProviderEvent::ParticipantJoined(
                serde_json::from_value(payload).map_err(de::Error::custom)?,
            ),
            "meeting.participant_left" => ProviderEvent::ParticipantLeft(
                serde_json::from_value(payload).map_err(de::Error::custom)?,
            ),
            "recording.completed" => ProviderEvent::RecordingCompleted(
                serde_json::from_value(payload).map_err(de::Error::custom)?,
            ),
            "transcript.completed" => ProviderEvent::TranscriptCompleted(
                serde_json::from_value(payload).map_err(de::Error::custom)?,
            ),
            "meeting.summary_completed" => ProviderEvent::SummaryCompleted(
                serde_json::from_value(payload).map_err(de::Error::custom)?,
            ),
            "endpoint.url_validation" => ProviderEvent::UrlValidation(
                serde_json::from_value(payload).map_err(de::Error::custom)?,
            ),
            _ => ProviderEvent::Unknown,
        })
    }
}

impl ProviderEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderEvent::MeetingStarted(_) => "meeting.started",
            ProviderEvent::MeetingEnded(_) => "meeting.ended",
            ProviderEvent::ParticipantJoined(_) => "meeting.participant_joined",
            ProviderEvent::ParticipantLeft(_) => "meeting.participant_left",
            ProviderEvent::RecordingCompleted(_) => "recording.completed",
            ProviderEvent::TranscriptCompleted(_) => "transcript.completed",
            ProviderEvent::SummaryCompleted(_) => "meeting.summary_completed",
            ProviderEvent::UrlValidation(_) => "endpoint.url_validation",
            ProviderEvent::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingStartedPayload {
    pub meeting_uid: String,
    #[serde(default)]
    pub occurrence_id: Option<String>,
    #[serde(default)]
    pub session_uid: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingEndedPayload {
    pub meeting_uid: String,
    #[serde(default)]
    pub occurrence_id: Option<String>,
    #[serde(default)]
    pub session_uid: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantPayload {
    pub meeting_uid: String,
    #[serde(default)]
    pub occurrence_id: Option<String>,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactPayload {
    pub meeting_uid: String,
    #[serde(default)]
    pub occurrence_id: Option<String>,
    pub artifact_uid: String,
    #[serde(default)]
    pub object_uid: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryPayload {
    pub meeting_uid: String,
    #[serde(default)]
    pub occurrence_id: Option<String>,
    pub summary_overview: String,
    #[serde(default)]
    pub summary_details: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlValidationPayload {
    pub plain_token: String,
}

// Handshake answer for endpoint.url_validation; never touches domain state
#[derive(Debug, Serialize)]
pub struct UrlValidationResponse {
    pub plain_token: String,
    pub encrypted_token: String,
}

// Acknowledgement body for every other authenticated delivery
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}
