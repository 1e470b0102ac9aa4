use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use crate::auth::WebhookAuth;
use crate::errors::ServiceError;
use crate::models::common::{PaginationParams, VersionedBody};
use crate::models::meeting::{MeetingInput, MeetingSettingsInput, OccurrenceEdit};
use crate::models::past_meeting::{ParticipantUpdateInput, PastMeetingInput, SummaryUpdateInput};
use crate::models::registrant::{RegistrantInput, RsvpInput};
use crate::models::webhook::{ProviderEvent, UrlValidationResponse, WebhookAck};
use crate::services::lifecycle::MeetingLifecycleService;
use crate::services::reconciler::WebhookReconciler;

/// Shared application state passed to all handlers
pub struct AppState {
    pub lifecycle: Arc<MeetingLifecycleService>,
    pub reconciler: Arc<WebhookReconciler>,
    pub webhook_secret: String,
}

// Conditional requests carry the expected revision as a quoted etag
fn expected_revision(headers: &HeaderMap) -> Result<u64, ServiceError> {
    let raw = headers
        .get("if-match")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ServiceError::Validation("If-Match header is required for this operation".to_string())
        })?;
    raw.trim()
        .trim_matches('"')
        .parse::<u64>()
        .map_err(|_| ServiceError::Validation(format!("malformed If-Match value: {}", raw)))
}

fn caller(headers: &HeaderMap) -> String {
    headers
        .get("x-requested-by")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("api")
        .to_string()
}

// ----- Webhook -----

/// Entry point for provider webhook deliveries.
///
/// Signature verification happens over the raw body before any event
/// parsing. Deliveries that parse to an unrecognized shape are
/// acknowledged and dropped so the provider does not redeliver them
/// forever.
pub async fn handle_provider_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, ServiceError> {
    let signature = headers
        .get("x-provider-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ServiceError::Unauthorized("missing x-provider-signature header".to_string())
        })?;
    let timestamp = headers
        .get("x-provider-request-timestamp")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| {
            ServiceError::Unauthorized(
                "missing or malformed x-provider-request-timestamp header".to_string(),
            )
        })?;

    WebhookAuth::verify(&state.webhook_secret, timestamp, &body, signature)?;

    let event: ProviderEvent = match serde_json::from_str(&body) {
        Ok(event) => event,
        Err(err) => {
            warn!("Dropping undecodable webhook payload: {}", err);
            return Ok(Json(WebhookAck { status: "ignored" }).into_response());
        }
    };

    if let ProviderEvent::UrlValidation(payload) = &event {
        info!("Answering webhook url_validation handshake");
        let response = UrlValidationResponse {
            plain_token: payload.plain_token.clone(),
            encrypted_token: WebhookAuth::validation_token(
                &state.webhook_secret,
                &payload.plain_token,
            ),
        };
        return Ok(Json(response).into_response());
    }

    state.reconciler.process(event)?;
    Ok(Json(WebhookAck { status: "ok" }).into_response())
}

// ----- Meetings -----

pub async fn create_meeting(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<MeetingInput>,
) -> Result<Response, ServiceError> {
    let (meeting, revision) = state
        .lifecycle
        .create_meeting(&caller(&headers), input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(VersionedBody::new(meeting, revision)),
    )
        .into_response())
}

pub async fn list_meetings(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Response {
    let mut records = state.lifecycle.list_meetings();
    records.sort_by_key(|(meeting, _)| meeting.start_time);
    let meetings: Vec<_> = records
        .into_iter()
        .skip(pagination.page.saturating_sub(1) * pagination.page_size)
        .take(pagination.page_size)
        .map(|(meeting, revision)| VersionedBody::new(meeting, revision))
        .collect();
    Json(meetings).into_response()
}

pub async fn get_meeting(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Response, ServiceError> {
    let (meeting, revision) = state.lifecycle.get_meeting(&uid)?;
    Ok(Json(VersionedBody::new(meeting, revision)).into_response())
}

pub async fn update_meeting(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    Json(input): Json<MeetingInput>,
) -> Result<Response, ServiceError> {
    let expected = expected_revision(&headers)?;
    let (meeting, revision) = state.lifecycle.update_meeting(&uid, expected, input).await?;
    Ok(Json(VersionedBody::new(meeting, revision)).into_response())
}

pub async fn delete_meeting(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let expected = expected_revision(&headers)?;
    state.lifecycle.delete_meeting(&uid, expected).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ----- Settings -----

pub async fn get_meeting_settings(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Response, ServiceError> {
    let (settings, revision) = state.lifecycle.get_settings(&uid)?;
    Ok(Json(VersionedBody::new(settings, revision)).into_response())
}

pub async fn update_meeting_settings(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    Json(input): Json<MeetingSettingsInput>,
) -> Result<Response, ServiceError> {
    let expected = expected_revision(&headers)?;
    let (settings, revision) = state.lifecycle.update_settings(&uid, expected, input)?;
    Ok(Json(VersionedBody::new(settings, revision)).into_response())
}

// ----- Occurrences -----

pub async fn list_occurrences(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Response, ServiceError> {
    let occurrences = state.lifecycle.list_occurrences(&uid)?;
    Ok(Json(occurrences).into_response())
}

pub async fn update_occurrence(
    State(state): State<Arc<AppState>>,
    Path((uid, occurrence_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(edit): Json<OccurrenceEdit>,
) -> Result<Response, ServiceError> {
    let expected = expected_revision(&headers)?;
    state
        .lifecycle
        .edit_occurrence(&uid, &occurrence_id, expected, edit)?;
    let occurrences = state.lifecycle.list_occurrences(&uid)?;
    Ok(Json(occurrences).into_response())
}

pub async fn cancel_occurrence(
    State(state): State<Arc<AppState>>,
    Path((uid, occurrence_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let expected = expected_revision(&headers)?;
    state
        .lifecycle
        .cancel_occurrence(&uid, &occurrence_id, expected)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ----- Registrants -----

pub async fn create_registrant(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(input): Json<RegistrantInput>,
) -> Result<Response, ServiceError> {
    let (registrant, revision) = state.lifecycle.create_registrant(&uid, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(VersionedBody::new(registrant, revision)),
    )
        .into_response())
}

pub async fn list_registrants(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Response, ServiceError> {
    let registrants: Vec<_> = state
        .lifecycle
        .list_registrants(&uid)?
        .into_iter()
        .map(|(registrant, revision)| VersionedBody::new(registrant, revision))
        .collect();
    Ok(Json(registrants).into_response())
}

pub async fn get_registrant(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Response, ServiceError> {
    let (registrant, revision) = state.lifecycle.get_registrant(&uid)?;
    Ok(Json(VersionedBody::new(registrant, revision)).into_response())
}

pub async fn update_registrant(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    Json(input): Json<RegistrantInput>,
) -> Result<Response, ServiceError> {
    let expected = expected_revision(&headers)?;
    let (registrant, revision) = state
        .lifecycle
        .update_registrant(&uid, expected, input)
        .await?;
    Ok(Json(VersionedBody::new(registrant, revision)).into_response())
}

pub async fn delete_registrant(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let expected = expected_revision(&headers)?;
    state.lifecycle.delete_registrant(&uid, expected).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn resend_invitation(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Response, ServiceError> {
    let join_url = state.lifecycle.resend_invitation(&uid).await?;
    Ok(Json(serde_json::json!({ "join_url": join_url })).into_response())
}

// ----- RSVPs -----

pub async fn submit_rsvp(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(input): Json<RsvpInput>,
) -> Result<Response, ServiceError> {
    let applied = state.lifecycle.submit_rsvp(&uid, &input)?;
    Ok((StatusCode::CREATED, Json(applied)).into_response())
}

pub async fn list_rsvps(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Response, ServiceError> {
    let rsvps = state.lifecycle.list_rsvps(&uid)?;
    Ok(Json(rsvps).into_response())
}

// ----- Past meetings -----

pub async fn list_past_meetings(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Response {
    let mut records = state.lifecycle.list_past_meetings();
    records.sort_by_key(|(record, _)| record.scheduled_start);
    let records: Vec<_> = records
        .into_iter()
        .skip(pagination.page.saturating_sub(1) * pagination.page_size)
        .take(pagination.page_size)
        .map(|(record, revision)| VersionedBody::new(record, revision))
        .collect();
    Json(records).into_response()
}

pub async fn get_past_meeting(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Response, ServiceError> {
    let (record, revision) = state.lifecycle.get_past_meeting(&uid)?;
    Ok(Json(VersionedBody::new(record, revision)).into_response())
}

pub async fn create_past_meeting(
    State(state): State<Arc<AppState>>,
    Json(input): Json<PastMeetingInput>,
) -> Result<Response, ServiceError> {
    let (record, revision) = state.lifecycle.create_past_meeting(input)?;
    Ok((
        StatusCode::CREATED,
        Json(VersionedBody::new(record, revision)),
    )
        .into_response())
}

pub async fn delete_past_meeting(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let expected = expected_revision(&headers)?;
    state.lifecycle.delete_past_meeting(&uid, expected)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ----- Past meeting participants -----

pub async fn list_participants(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Response, ServiceError> {
    let participants: Vec<_> = state
        .lifecycle
        .list_participants(&uid)?
        .into_iter()
        .map(|(participant, revision)| VersionedBody::new(participant, revision))
        .collect();
    Ok(Json(participants).into_response())
}

pub async fn get_participant(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Response, ServiceError> {
    let (participant, revision) = state.lifecycle.get_participant(&uid)?;
    Ok(Json(VersionedBody::new(participant, revision)).into_response())
}

pub async fn update_participant(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    Json(input): Json<ParticipantUpdateInput>,
) -> Result<Response, ServiceError> {
    let expected = expected_revision(&headers)?;
    let (participant, revision) = state.lifecycle.update_participant(&uid, expected, input)?;
    Ok(Json(VersionedBody::new(participant, revision)).into_response())
}

// ----- Past meeting summaries -----

pub async fn list_summaries(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Response, ServiceError> {
    let summaries: Vec<_> = state
        .lifecycle
        .list_summaries(&uid)?
        .into_iter()
        .map(|(summary, revision)| VersionedBody::new(summary, revision))
        .collect();
    Ok(Json(summaries).into_response())
}

pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Response, ServiceError> {
    let (summary, revision) = state.lifecycle.get_summary(&uid)?;
    Ok(Json(VersionedBody::new(summary, revision)).into_response())
}

pub async fn update_summary(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    Json(input): Json<SummaryUpdateInput>,
) -> Result<Response, ServiceError> {
    let expected = expected_revision(&headers)?;
    let (summary, revision) = state.lifecycle.update_summary(&uid, expected, input)?;
    Ok(Json(VersionedBody::new(summary, revision)).into_response())
}
