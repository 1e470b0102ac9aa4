use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::meeting::Meeting;
use crate::models::past_meeting::{
    ArtifactKind, ArtifactRef, PastMeeting, PastMeetingParticipant, PastMeetingSummary, Session,
};
use crate::models::webhook::{
    ArtifactPayload, MeetingEndedPayload, MeetingStartedPayload, ParticipantPayload,
    ProviderEvent, SummaryPayload,
};
use crate::services::recurrence::occurrence_id_for;
use crate::services::store::LifecycleStore;

// Sessions reported without a provider session uid are deduplicated by
// start-time proximity instead
const SESSION_DEDUPE_TOLERANCE_SECS: i64 = 60;

/// Folds provider lifecycle events into durable past-meeting records.
///
/// Every handler is idempotent under at-least-once, any-order delivery:
/// duplicates are absorbed by upsert keys (session uid, participant
/// email, artifact uid) and out-of-order events degrade to no-ops
/// rather than errors. Processing for one (meeting, occurrence) pair is
/// serialized by the store's keyed locks; the provider is never called
/// from this path.
pub struct WebhookReconciler {
    store: Arc<LifecycleStore>,
}

impl WebhookReconciler {
    pub fn new(store: Arc<LifecycleStore>) -> Self {
        Self { store }
    }

    /// Dispatch one authenticated event. Malformed or unknown domain
    /// content is logged and dropped rather than failing the delivery,
    /// so the provider does not retry events we can never use.
    pub fn process(&self, event: ProviderEvent) -> Result<(), ServiceError> {
        debug!("Reconciling provider event: {}", event.kind());
        match event {
            ProviderEvent::MeetingStarted(payload) => self.on_meeting_started(payload),
            ProviderEvent::MeetingEnded(payload) => self.on_meeting_ended(payload),
            ProviderEvent::ParticipantJoined(payload) => self.on_participant(payload, true),
            ProviderEvent::ParticipantLeft(payload) => self.on_participant(payload, false),
            ProviderEvent::RecordingCompleted(payload) => {
                self.on_artifact(payload, ArtifactKind::Recording)
            }
            ProviderEvent::TranscriptCompleted(payload) => {
                self.on_artifact(payload, ArtifactKind::Transcript)
            }
            ProviderEvent::SummaryCompleted(payload) => self.on_summary(payload),
            ProviderEvent::UrlValidation(_) => {
                // Answered at the transport boundary; nothing to fold
                debug!("URL validation event reached the reconciler; ignoring");
                Ok(())
            }
            ProviderEvent::Unknown => {
                warn!("Dropping provider event of unknown kind");
                Ok(())
            }
        }
    }

    // Look up the originating meeting; a payload naming a meeting we do
    // not know is dropped, not failed
    fn meeting_for(&self, meeting_uid: &str) -> Option<Meeting> {
        let meetings = self.store.meetings.lock().unwrap_or_else(|e| e.into_inner());
        meetings.get(meeting_uid).map(|(meeting, _)| meeting)
    }

    fn occurrence_id(&self, meeting: &Meeting, occurrence_id: Option<String>) -> String {
        occurrence_id.unwrap_or_else(|| occurrence_id_for(meeting.start_time))
    }

    /// First webhook touch for a (meeting, occurrence) pair creates the
    /// PastMeeting with a snapshot of the meeting as it is right now;
    /// later meeting edits never refresh the snapshot. Invited
    /// registrants are seeded as participants so invitation tracking
    /// does not depend on whether they ever join.
    fn upsert_past_meeting(&self, meeting: &Meeting, occurrence_id: &str) -> String {
        if let Some(uid) = self.store.past_meeting_uid_for(&meeting.uid, occurrence_id) {
            return uid;
        }

        let uid = Uuid::new_v4().to_string();
        let record = PastMeeting {
            uid: uid.clone(),
            meeting_uid: meeting.uid.clone(),
            occurrence_id: occurrence_id.to_string(),
            project_uid: meeting.project_uid.clone(),
            title: meeting.title.clone(),
            description: meeting.description.clone(),
            committees: meeting.committees.clone(),
            visibility: meeting.visibility,
            restricted: meeting.restricted,
            platform: meeting.platform.clone(),
            scheduled_start: meeting.start_time,
            scheduled_duration: meeting.duration,
            sessions: Vec::new(),
            artifacts: Vec::new(),
        };

        if self
            .store
            .claim_past_meeting_key(&meeting.uid, occurrence_id, &uid)
            .is_err()
        {
            // Lost a race with another creator for a different pair key
            // holder; use theirs
            if let Some(existing) = self.store.past_meeting_uid_for(&meeting.uid, occurrence_id) {
                return existing;
            }
        }

        {
            let mut past_meetings = self
                .store
                .past_meetings
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if past_meetings.insert(&uid, record).is_err() {
                warn!("Past meeting {} already present; keeping existing record", uid);
            }
        }

        info!(
            "Created past meeting {} for meeting {} occurrence {}",
            uid, meeting.uid, occurrence_id
        );

        self.seed_invited_participants(meeting, occurrence_id, &uid);
        uid
    }

    fn seed_invited_participants(
        &self,
        meeting: &Meeting,
        occurrence_id: &str,
        past_meeting_uid: &str,
    ) {
        let invited: Vec<_> = {
            let registrants = self
                .store
                .registrants
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            registrants
                .find(|r| {
                    r.meeting_uid == meeting.uid
                        && r.occurrence_id
                            .as_deref()
                            .map(|id| id == occurrence_id)
                            .unwrap_or(true)
                })
                .into_iter()
                .map(|(r, _)| r)
                .collect()
        };

        for registrant in invited {
            let participant = PastMeetingParticipant {
                uid: Uuid::new_v4().to_string(),
                past_meeting_uid: past_meeting_uid.to_string(),
                email: registrant.email.clone(),
                name: format!("{} {}", registrant.first_name, registrant.last_name)
                    .trim()
                    .to_string(),
                is_invited: true,
                is_attended: false,
            };
            let uid = participant.uid.clone();
            let mut participants = self
                .store
                .participants
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if participants.insert(&uid, participant).is_ok() {
                drop(participants);
                self.bump_registrant_invited(&registrant.uid);
            }
        }
    }

    fn bump_registrant_invited(&self, registrant_uid: &str) {
        let mut registrants = self
            .store
            .registrants
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let _ = registrants.update(registrant_uid, None, |r| {
            r.invited_count += 1;
            Ok(())
        });
    }

    fn bump_registrant_attended(&self, meeting_uid: &str, email: &str) {
        let mut registrants = self
            .store
            .registrants
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let matching: Vec<String> = registrants
            .find(|r| r.meeting_uid == meeting_uid && r.email == email)
            .into_iter()
            .map(|(r, _)| r.uid)
            .collect();
        for uid in matching {
            let _ = registrants.update(&uid, None, |r| {
                r.attended_count += 1;
                Ok(())
            });
        }
    }

    fn on_meeting_started(&self, payload: MeetingStartedPayload) -> Result<(), ServiceError> {
        let Some(meeting) = self.meeting_for(&payload.meeting_uid) else {
            warn!(
                "meeting.started for unknown meeting {}; dropping",
                payload.meeting_uid
            );
            return Ok(());
        };
        let occurrence_id = self.occurrence_id(&meeting, payload.occurrence_id.clone());

        let lock = self.store.occurrence_lock(&meeting.uid, &occurrence_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let uid = self.upsert_past_meeting(&meeting, &occurrence_id);

        let mut past_meetings = self
            .store
            .past_meetings
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let (record, _) = past_meetings.update(&uid, None, |past| {
            if session_already_known(&past.sessions, &payload) {
                debug!(
                    "Duplicate meeting.started for past meeting {}; session already recorded",
                    past.uid
                );
                return Ok(());
            }
            past.sessions.push(Session {
                session_uid: payload.session_uid.clone(),
                start_time: payload.start_time,
                end_time: None,
            });
            Ok(())
        })?;

        info!(
            "Past meeting {} now has {} session(s), state {:?}",
            record.uid,
            record.sessions.len(),
            record.lifecycle_state(false)
        );
        Ok(())
    }

    fn on_meeting_ended(&self, payload: MeetingEndedPayload) -> Result<(), ServiceError> {
        let Some(meeting) = self.meeting_for(&payload.meeting_uid) else {
            warn!(
                "meeting.ended for unknown meeting {}; dropping",
                payload.meeting_uid
            );
            return Ok(());
        };
        let occurrence_id = self.occurrence_id(&meeting, payload.occurrence_id.clone());

        let lock = self.store.occurrence_lock(&meeting.uid, &occurrence_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let uid = self.upsert_past_meeting(&meeting, &occurrence_id);

        let mut past_meetings = self
            .store
            .past_meetings
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        past_meetings.update(&uid, None, |past| {
            // Close the most recent open session; a duplicate or
            // out-of-order ended event finds none and is a no-op
            let open = past
                .sessions
                .iter_mut()
                .filter(|s| s.end_time.is_none())
                .max_by_key(|s| s.start_time);
            match open {
                Some(session) => session.end_time = Some(payload.end_time),
                None => debug!(
                    "meeting.ended with no open session for past meeting {}; ignoring",
                    past.uid
                ),
            }
            Ok(())
        })?;
        Ok(())
    }

    fn on_participant(
        &self,
        payload: ParticipantPayload,
        joined: bool,
    ) -> Result<(), ServiceError> {
        let Some(meeting) = self.meeting_for(&payload.meeting_uid) else {
            warn!(
                "participant event for unknown meeting {}; dropping",
                payload.meeting_uid
            );
            return Ok(());
        };
        let occurrence_id = self.occurrence_id(&meeting, payload.occurrence_id.clone());

        let lock = self.store.occurrence_lock(&meeting.uid, &occurrence_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let past_meeting_uid = self.upsert_past_meeting(&meeting, &occurrence_id);

        let newly_attended = {
            let mut participants = self
                .store
                .participants
                .lock()
                .unwrap_or_else(|e| e.into_inner());

            let existing = participants
                .find(|p| p.past_meeting_uid == past_meeting_uid && p.email == payload.email)
                .into_iter()
                .next();

            match existing {
                Some((participant, _)) => {
                    // Attendance is a historical fact: join and left
                    // events both prove presence, and nothing unsets it
                    let newly = !participant.is_attended;
                    participants.update(&participant.uid, None, |p| {
                        p.is_attended = true;
                        if !payload.name.is_empty() {
                            p.name = payload.name.clone();
                        }
                        Ok(())
                    })?;
                    newly
                }
                None => {
                    // Walk-in: attended without being pre-invited
                    let participant = PastMeetingParticipant {
                        uid: Uuid::new_v4().to_string(),
                        past_meeting_uid: past_meeting_uid.clone(),
                        email: payload.email.clone(),
                        name: payload.name.clone(),
                        is_invited: false,
                        is_attended: true,
                    };
                    let uid = participant.uid.clone();
                    participants.insert(&uid, participant)?;
                    true
                }
            }
        };

        if newly_attended {
            self.bump_registrant_attended(&meeting.uid, &payload.email);
        }

        debug!(
            "Recorded participant {} ({}) for past meeting {}",
            payload.email,
            if joined { "joined" } else { "left" },
            past_meeting_uid
        );
        Ok(())
    }

    fn on_artifact(
        &self,
        payload: ArtifactPayload,
        kind: ArtifactKind,
    ) -> Result<(), ServiceError> {
        let Some(meeting) = self.meeting_for(&payload.meeting_uid) else {
            warn!(
                "artifact event for unknown meeting {}; dropping",
                payload.meeting_uid
            );
            return Ok(());
        };
        let occurrence_id = self.occurrence_id(&meeting, payload.occurrence_id.clone());

        let lock = self.store.occurrence_lock(&meeting.uid, &occurrence_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let uid = self.upsert_past_meeting(&meeting, &occurrence_id);

        let mut past_meetings = self
            .store
            .past_meetings
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        past_meetings.update(&uid, None, |past| {
            if past
                .artifacts
                .iter()
                .any(|a| a.artifact_uid == payload.artifact_uid)
            {
                debug!(
                    "Duplicate artifact {} for past meeting {}; ignoring",
                    payload.artifact_uid, past.uid
                );
                return Ok(());
            }
            past.artifacts.push(ArtifactRef {
                artifact_uid: payload.artifact_uid.clone(),
                kind,
                object_uid: payload.object_uid.clone(),
                url: payload.url.clone(),
                file_size: payload.file_size,
            });
            Ok(())
        })?;
        Ok(())
    }

    fn on_summary(&self, payload: SummaryPayload) -> Result<(), ServiceError> {
        let Some(meeting) = self.meeting_for(&payload.meeting_uid) else {
            warn!(
                "summary event for unknown meeting {}; dropping",
                payload.meeting_uid
            );
            return Ok(());
        };
        let occurrence_id = self.occurrence_id(&meeting, payload.occurrence_id.clone());

        let lock = self.store.occurrence_lock(&meeting.uid, &occurrence_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let past_meeting_uid = self.upsert_past_meeting(&meeting, &occurrence_id);

        let mut summaries = self
            .store
            .summaries
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let existing = summaries
            .find(|s| s.past_meeting_uid == past_meeting_uid)
            .into_iter()
            .next();

        match existing {
            Some((summary, _)) => {
                // Redelivery refreshes the raw content only; the edited
                // overlay and approval flag belong to clients
                summaries.update(&summary.uid, None, |s| {
                    s.summary_overview = payload.summary_overview.clone();
                    s.summary_details = payload.summary_details.clone();
                    Ok(())
                })?;
                info!(
                    "Refreshed raw summary {} for past meeting {}",
                    summary.uid, past_meeting_uid
                );
            }
            None => {
                let summary = PastMeetingSummary {
                    uid: Uuid::new_v4().to_string(),
                    past_meeting_uid: past_meeting_uid.clone(),
                    summary_overview: payload.summary_overview.clone(),
                    summary_details: payload.summary_details.clone(),
                    edited_overview: None,
                    edited_details: None,
                    approved: false,
                };
                let uid = summary.uid.clone();
                summaries.insert(&uid, summary)?;
                info!(
                    "Created summary {} for past meeting {}",
                    uid, past_meeting_uid
                );
            }
        }
        Ok(())
    }
}

fn session_already_known(sessions: &[Session], payload: &MeetingStartedPayload) -> bool {
    if let Some(session_uid) = &payload.session_uid {
        if sessions
            .iter()
            .any(|s| s.session_uid.as_deref() == Some(session_uid))
        {
            return true;
        }
    }
    sessions.iter().any(|s| {
        within_tolerance(s.start_time, payload.start_time, SESSION_DEDUPE_TOLERANCE_SECS)
    })
}

fn within_tolerance(a: DateTime<Utc>, b: DateTime<Utc>, tolerance_secs: i64) -> bool {
    (a - b).abs() <= Duration::seconds(tolerance_secs)
}
