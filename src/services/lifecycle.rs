use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::{ConferencingProvider, ProviderMeetingRequest, ProviderRegistrantRequest};
use crate::errors::ServiceError;
use crate::models::meeting::{
    Meeting, MeetingInput, MeetingSettings, MeetingSettingsInput, Occurrence, OccurrenceEdit,
};
use crate::models::past_meeting::{
    ParticipantUpdateInput, PastMeeting, PastMeetingInput, PastMeetingParticipant,
    PastMeetingSummary, SummaryUpdateInput,
};
use crate::models::registrant::{
    Registrant, RegistrantInput, RegistrantType, Rsvp, RsvpInput,
};
use crate::services::occurrences::OccurrenceStore;
use crate::services::recurrence::validate_rule;
use crate::services::rsvp::{self, AppliedRsvp};
use crate::services::store::LifecycleStore;

// Hard cap from the scheduling API contract
const MAX_DURATION_MINUTES: u32 = 600;

/// Orchestrates the scheduling surface over the expander, occurrence
/// store, RSVP resolver and versioned tables. Each mutating operation
/// is one optimistic-concurrency transaction over a single root entity
/// plus its directly dependent counters. Provider calls happen here and
/// only here; the webhook path never reaches the provider.
pub struct MeetingLifecycleService {
    store: Arc<LifecycleStore>,
    occurrences: Arc<OccurrenceStore>,
    provider: Arc<dyn ConferencingProvider>,
    horizon_days: i64,
}

impl MeetingLifecycleService {
    pub fn new(
        store: Arc<LifecycleStore>,
        occurrences: Arc<OccurrenceStore>,
        provider: Arc<dyn ConferencingProvider>,
        horizon_days: i64,
    ) -> Self {
        Self {
            store,
            occurrences,
            provider,
            horizon_days,
        }
    }

    fn horizon(&self) -> DateTime<Utc> {
        Utc::now() + Duration::days(self.horizon_days)
    }

    fn validate_meeting_input(input: &MeetingInput) -> Result<(), ServiceError> {
        if input.title.trim().is_empty() {
            return Err(ServiceError::Validation("title must not be empty".to_string()));
        }
        if input.duration > MAX_DURATION_MINUTES {
            return Err(ServiceError::Validation(format!(
                "duration must be at most {} minutes",
                MAX_DURATION_MINUTES
            )));
        }
        if input.timezone.trim().is_empty() {
            return Err(ServiceError::Validation(
                "timezone must not be empty".to_string(),
            ));
        }
        if let Some(rule) = &input.recurrence {
            validate_rule(rule)?;
        }
        Ok(())
    }

    // ----- Meetings -----

    pub async fn create_meeting(
        &self,
        caller: &str,
        input: MeetingInput,
    ) -> Result<(Meeting, u64), ServiceError> {
        Self::validate_meeting_input(&input)?;

        let provider_meeting = self
            .provider
            .create_meeting(&ProviderMeetingRequest {
                topic: input.title.clone(),
                start_time: input.start_time,
                duration: input.duration,
                timezone: input.timezone.clone(),
                recurrence: input.recurrence.clone(),
            })
            .await?;

        let meeting = Meeting {
            uid: Uuid::new_v4().to_string(),
            project_uid: input.project_uid,
            title: input.title,
            description: input.description,
            start_time: input.start_time,
            duration: input.duration,
            timezone: input.timezone,
            recurrence: input.recurrence,
            visibility: input.visibility,
            restricted: input.restricted,
            committees: input.committees,
            platform: input.platform,
            organizers: input.organizers.clone(),
            recording_enabled: input.recording_enabled,
            transcript_enabled: input.transcript_enabled,
            youtube_upload_enabled: input.youtube_upload_enabled,
            artifact_visibility: input.artifact_visibility.clone(),
            join_url: Some(provider_meeting.join_url),
            provider_meeting_id: Some(provider_meeting.provider_meeting_id),
            created_by: caller.to_string(),
        };

        let settings = MeetingSettings {
            meeting_uid: meeting.uid.clone(),
            organizers: input.organizers,
            recording_enabled: meeting.recording_enabled,
            transcript_enabled: meeting.transcript_enabled,
            youtube_upload_enabled: meeting.youtube_upload_enabled,
            artifact_visibility: input.artifact_visibility,
        };

        let revision = {
            let mut meetings = self.store.meetings.lock().unwrap_or_else(|e| e.into_inner());
            meetings.insert(&meeting.uid, meeting.clone())?
        };
        {
            let mut table = self.store.settings.lock().unwrap_or_else(|e| e.into_inner());
            table.insert(&meeting.uid, settings)?;
        }

        info!("Created meeting {} for caller {}", meeting.uid, caller);
        Ok((meeting, revision))
    }

    pub fn get_meeting(&self, uid: &str) -> Result<(Meeting, u64), ServiceError> {
        let meetings = self.store.meetings.lock().unwrap_or_else(|e| e.into_inner());
        meetings
            .get(uid)
            .ok_or_else(|| ServiceError::NotFound(format!("meeting {} not found", uid)))
    }

    pub fn list_meetings(&self) -> Vec<(Meeting, u64)> {
        let meetings = self.store.meetings.lock().unwrap_or_else(|e| e.into_inner());
        meetings.list()
    }

    pub async fn update_meeting(
        &self,
        uid: &str,
        expected: u64,
        input: MeetingInput,
    ) -> Result<(Meeting, u64), ServiceError> {
        Self::validate_meeting_input(&input)?;

        // Check the precondition before touching the provider, so a
        // stale caller fails without a remote side effect
        let (current, revision) = self.get_meeting(uid)?;
        if revision != expected {
            return Err(ServiceError::Conflict(format!(
                "meeting {} already modified",
                uid
            )));
        }

        if let Some(provider_meeting_id) = &current.provider_meeting_id {
            self.provider
                .update_meeting(
                    provider_meeting_id,
                    &ProviderMeetingRequest {
                        topic: input.title.clone(),
                        start_time: input.start_time,
                        duration: input.duration,
                        timezone: input.timezone.clone(),
                        recurrence: input.recurrence.clone(),
                    },
                )
                .await?;
        }

        let mut meetings = self.store.meetings.lock().unwrap_or_else(|e| e.into_inner());
        meetings.update(uid, Some(expected), |meeting| {
            // Recurrence edits recompute future occurrences on the next
            // resolve; individually cancelled or edited occurrences stay
            // overridden because overrides live outside the rule
            meeting.project_uid = input.project_uid.clone();
            meeting.title = input.title.clone();
            meeting.description = input.description.clone();
            meeting.start_time = input.start_time;
            meeting.duration = input.duration;
            meeting.timezone = input.timezone.clone();
            meeting.recurrence = input.recurrence.clone();
            meeting.visibility = input.visibility;
            meeting.restricted = input.restricted;
            meeting.committees = input.committees.clone();
            meeting.platform = input.platform.clone();
            meeting.organizers = input.organizers.clone();
            meeting.recording_enabled = input.recording_enabled;
            meeting.transcript_enabled = input.transcript_enabled;
            meeting.youtube_upload_enabled = input.youtube_upload_enabled;
            meeting.artifact_visibility = input.artifact_visibility.clone();
            Ok(())
        })
    }

    /// Logical deletion: future scheduling is removed, past-meeting
    /// history survives untouched.
    pub async fn delete_meeting(&self, uid: &str, expected: u64) -> Result<(), ServiceError> {
        let (current, revision) = self.get_meeting(uid)?;
        if revision != expected {
            return Err(ServiceError::Conflict(format!(
                "meeting {} already modified",
                uid
            )));
        }

        if let Some(provider_meeting_id) = &current.provider_meeting_id {
            self.provider.delete_meeting(provider_meeting_id).await?;
        }

        {
            let mut meetings = self.store.meetings.lock().unwrap_or_else(|e| e.into_inner());
            meetings.remove(uid, Some(expected))?;
        }
        {
            let mut settings = self.store.settings.lock().unwrap_or_else(|e| e.into_inner());
            if settings.remove(uid, None).is_err() {
                warn!("Meeting {} had no settings record to remove", uid);
            }
        }
        {
            let mut registrants = self
                .store
                .registrants
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            let owned: Vec<String> = registrants
                .find(|r| r.meeting_uid == uid)
                .into_iter()
                .map(|(r, _)| r.uid)
                .collect();
            for registrant_uid in owned {
                let _ = registrants.remove(&registrant_uid, None);
            }
        }
        self.occurrences.forget_meeting(uid);

        info!("Deleted meeting {} (history retained)", uid);
        Ok(())
    }

    // ----- Settings -----

    pub fn get_settings(&self, meeting_uid: &str) -> Result<(MeetingSettings, u64), ServiceError> {
        let settings = self.store.settings.lock().unwrap_or_else(|e| e.into_inner());
        settings.get(meeting_uid).ok_or_else(|| {
            ServiceError::NotFound(format!("settings for meeting {} not found", meeting_uid))
        })
    }

    pub fn update_settings(
        &self,
        meeting_uid: &str,
        expected: u64,
        input: MeetingSettingsInput,
    ) -> Result<(MeetingSettings, u64), ServiceError> {
        let mut settings = self.store.settings.lock().unwrap_or_else(|e| e.into_inner());
        settings.update(meeting_uid, Some(expected), |record| {
            record.organizers = input.organizers.clone();
            record.recording_enabled = input.recording_enabled;
            record.transcript_enabled = input.transcript_enabled;
            record.youtube_upload_enabled = input.youtube_upload_enabled;
            record.artifact_visibility = input.artifact_visibility.clone();
            Ok(())
        })
    }

    // ----- Occurrences -----

    pub fn list_occurrences(&self, meeting_uid: &str) -> Result<Vec<Occurrence>, ServiceError> {
        let (meeting, _) = self.get_meeting(meeting_uid)?;
        self.occurrences.resolve(&meeting, self.horizon())
    }

    pub fn cancel_occurrence(
        &self,
        meeting_uid: &str,
        occurrence_id: &str,
        expected: u64,
    ) -> Result<(), ServiceError> {
        let (meeting, _) = self.get_meeting(meeting_uid)?;
        let resolved = self.occurrences.resolve(&meeting, self.horizon())?;
        if !resolved.iter().any(|o| o.occurrence_id == occurrence_id) {
            return Err(ServiceError::NotFound(format!(
                "occurrence {} does not resolve for meeting {}",
                occurrence_id, meeting_uid
            )));
        }

        // The cancellation is a mutation of the meeting's schedule, so
        // it advances the meeting revision under the caller's etag
        {
            let mut meetings = self.store.meetings.lock().unwrap_or_else(|e| e.into_inner());
            meetings.update(meeting_uid, Some(expected), |_| Ok(()))?;
        }
        self.occurrences.cancel(meeting_uid, occurrence_id);

        info!(
            "Cancelled occurrence {} of meeting {}",
            occurrence_id, meeting_uid
        );
        Ok(())
    }

    pub fn edit_occurrence(
        &self,
        meeting_uid: &str,
        occurrence_id: &str,
        expected: u64,
        edit: OccurrenceEdit,
    ) -> Result<(), ServiceError> {
        if let Some(duration) = edit.duration {
            if duration > MAX_DURATION_MINUTES {
                return Err(ServiceError::Validation(format!(
                    "duration must be at most {} minutes",
                    MAX_DURATION_MINUTES
                )));
            }
        }

        let (meeting, _) = self.get_meeting(meeting_uid)?;
        let resolved = self.occurrences.resolve(&meeting, self.horizon())?;
        if !resolved.iter().any(|o| o.occurrence_id == occurrence_id) {
            return Err(ServiceError::NotFound(format!(
                "occurrence {} does not resolve for meeting {}",
                occurrence_id, meeting_uid
            )));
        }

        {
            let mut meetings = self.store.meetings.lock().unwrap_or_else(|e| e.into_inner());
            meetings.update(meeting_uid, Some(expected), |_| Ok(()))?;
        }
        self.occurrences.edit(meeting_uid, occurrence_id, &edit);
        Ok(())
    }

    // ----- Registrants -----

    fn covered_occurrence_ids(
        &self,
        meeting: &Meeting,
        occurrence_id: Option<&str>,
    ) -> Result<Vec<String>, ServiceError> {
        let resolved = self.occurrences.resolve(meeting, self.horizon())?;
        Ok(match occurrence_id {
            Some(target) => resolved
                .iter()
                .filter(|o| o.occurrence_id == target)
                .map(|o| o.occurrence_id.clone())
                .collect(),
            None => resolved
                .iter()
                .filter(|o| !o.cancelled)
                .map(|o| o.occurrence_id.clone())
                .collect(),
        })
    }

    pub async fn create_registrant(
        &self,
        meeting_uid: &str,
        input: RegistrantInput,
    ) -> Result<(Registrant, u64), ServiceError> {
        if input.email.trim().is_empty() {
            return Err(ServiceError::Validation("email must not be empty".to_string()));
        }

        let (meeting, _) = self.get_meeting(meeting_uid)?;

        if let Some(target) = input.occurrence_id.as_deref() {
            let resolved = self.occurrences.resolve(&meeting, self.horizon())?;
            if !resolved.iter().any(|o| o.occurrence_id == target) {
                return Err(ServiceError::NotFound(format!(
                    "occurrence {} does not resolve for meeting {}",
                    target, meeting_uid
                )));
            }
        }

        // Email uniqueness within one meeting is a hard constraint
        {
            let registrants = self
                .store
                .registrants
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if !registrants
                .find(|r| r.meeting_uid == meeting_uid && r.email == input.email)
                .is_empty()
            {
                return Err(ServiceError::Conflict(format!(
                    "registrant {} already exists for meeting {}",
                    input.email, meeting_uid
                )));
            }
        }

        let provider_registrant_id = match &meeting.provider_meeting_id {
            Some(provider_meeting_id) => Some(
                self.provider
                    .create_registrant(
                        provider_meeting_id,
                        &ProviderRegistrantRequest {
                            email: input.email.clone(),
                            first_name: input.first_name.clone(),
                            last_name: input.last_name.clone(),
                            occurrence_id: input.occurrence_id.clone(),
                        },
                    )
                    .await?
                    .provider_registrant_id,
            ),
            None => None,
        };

        let registrant = Registrant {
            uid: Uuid::new_v4().to_string(),
            meeting_uid: meeting_uid.to_string(),
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
            org: input.org,
            host: input.host,
            occurrence_id: input.occurrence_id.clone(),
            registrant_type: RegistrantType::Direct,
            invited_count: 0,
            attended_count: 0,
            provider_registrant_id,
        };

        let revision = {
            let mut registrants = self
                .store
                .registrants
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            // Re-check under the write lock in case of a concurrent create
            if !registrants
                .find(|r| r.meeting_uid == meeting_uid && r.email == registrant.email)
                .is_empty()
            {
                return Err(ServiceError::Conflict(format!(
                    "registrant {} already exists for meeting {}",
                    registrant.email, meeting_uid
                )));
            }
            registrants.insert(&registrant.uid, registrant.clone())?
        };

        let covered = self.covered_occurrence_ids(&meeting, input.occurrence_id.as_deref())?;
        self.occurrences
            .shift_registrant_count(meeting_uid, &covered, 1);

        info!(
            "Created registrant {} ({}) for meeting {}",
            registrant.uid, registrant.email, meeting_uid
        );
        Ok((registrant, revision))
    }

    pub fn get_registrant(&self, uid: &str) -> Result<(Registrant, u64), ServiceError> {
        let registrants = self
            .store
            .registrants
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        registrants
            .get(uid)
            .ok_or_else(|| ServiceError::NotFound(format!("registrant {} not found", uid)))
    }

    pub fn list_registrants(&self, meeting_uid: &str) -> Result<Vec<(Registrant, u64)>, ServiceError> {
        self.get_meeting(meeting_uid)?;
        let registrants = self
            .store
            .registrants
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        Ok(registrants.find(|r| r.meeting_uid == meeting_uid))
    }

    pub async fn update_registrant(
        &self,
        uid: &str,
        expected: u64,
        input: RegistrantInput,
    ) -> Result<(Registrant, u64), ServiceError> {
        let (current, revision) = self.get_registrant(uid)?;
        if revision != expected {
            return Err(ServiceError::Conflict(format!(
                "registrant {} already modified",
                uid
            )));
        }
        let (meeting, _) = self.get_meeting(&current.meeting_uid)?;

        // Changing the email must not collide with another registrant
        {
            let registrants = self
                .store
                .registrants
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if !registrants
                .find(|r| {
                    r.meeting_uid == current.meeting_uid
                        && r.email == input.email
                        && r.uid != uid
                })
                .is_empty()
            {
                return Err(ServiceError::Conflict(format!(
                    "registrant {} already exists for meeting {}",
                    input.email, current.meeting_uid
                )));
            }
        }

        if let (Some(provider_meeting_id), Some(provider_registrant_id)) = (
            &meeting.provider_meeting_id,
            &current.provider_registrant_id,
        ) {
            self.provider
                .update_registrant(
                    provider_meeting_id,
                    provider_registrant_id,
                    &ProviderRegistrantRequest {
                        email: input.email.clone(),
                        first_name: input.first_name.clone(),
                        last_name: input.last_name.clone(),
                        occurrence_id: input.occurrence_id.clone(),
                    },
                )
                .await?;
        }

        let updated = {
            let mut registrants = self
                .store
                .registrants
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            registrants.update(uid, Some(expected), |registrant| {
                registrant.email = input.email.clone();
                registrant.first_name = input.first_name.clone();
                registrant.last_name = input.last_name.clone();
                registrant.org = input.org.clone();
                registrant.host = input.host;
                registrant.occurrence_id = input.occurrence_id.clone();
                Ok(())
            })?
        };

        // Re-target the headcount when the registered occurrence changed
        if current.occurrence_id != input.occurrence_id {
            let old = self.covered_occurrence_ids(&meeting, current.occurrence_id.as_deref())?;
            let new = self.covered_occurrence_ids(&meeting, input.occurrence_id.as_deref())?;
            self.occurrences
                .shift_registrant_count(&current.meeting_uid, &old, -1);
            self.occurrences
                .shift_registrant_count(&current.meeting_uid, &new, 1);
        }

        Ok(updated)
    }

    pub async fn delete_registrant(&self, uid: &str, expected: u64) -> Result<(), ServiceError> {
        let (current, revision) = self.get_registrant(uid)?;
        if revision != expected {
            return Err(ServiceError::Conflict(format!(
                "registrant {} already modified",
                uid
            )));
        }
        let (meeting, _) = self.get_meeting(&current.meeting_uid)?;

        if let (Some(provider_meeting_id), Some(provider_registrant_id)) = (
            &meeting.provider_meeting_id,
            &current.provider_registrant_id,
        ) {
            self.provider
                .delete_registrant(provider_meeting_id, provider_registrant_id)
                .await?;
        }

        {
            let mut registrants = self
                .store
                .registrants
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            registrants.remove(uid, Some(expected))?;
        }

        let covered = self.covered_occurrence_ids(&meeting, current.occurrence_id.as_deref())?;
        self.occurrences
            .shift_registrant_count(&current.meeting_uid, &covered, -1);

        info!("Deleted registrant {} from meeting {}", uid, current.meeting_uid);
        Ok(())
    }

    /// Decide that an invitation must be re-sent. The engine resolves
    /// the join link; composing and delivering the notification is the
    /// notifier collaborator's job.
    pub async fn resend_invitation(&self, uid: &str) -> Result<String, ServiceError> {
        let (registrant, _) = self.get_registrant(uid)?;
        let (meeting, _) = self.get_meeting(&registrant.meeting_uid)?;

        let provider_meeting_id = meeting.provider_meeting_id.as_deref().ok_or_else(|| {
            ServiceError::Validation(format!(
                "meeting {} has no provider meeting",
                meeting.uid
            ))
        })?;
        let join_url = self.provider.get_join_link(provider_meeting_id).await?;

        info!(
            "Invitation resend requested for registrant {} ({})",
            registrant.uid, registrant.email
        );
        Ok(join_url)
    }

    // ----- RSVPs -----

    pub fn submit_rsvp(
        &self,
        meeting_uid: &str,
        input: &RsvpInput,
    ) -> Result<AppliedRsvp, ServiceError> {
        let (meeting, _) = self.get_meeting(meeting_uid)?;
        rsvp::apply(&self.store, &self.occurrences, &meeting, input, self.horizon())
    }

    pub fn list_rsvps(&self, meeting_uid: &str) -> Result<Vec<Rsvp>, ServiceError> {
        self.get_meeting(meeting_uid)?;
        Ok(rsvp::list_for_meeting(&self.store, meeting_uid))
    }

    // ----- Past meetings -----

    pub fn list_past_meetings(&self) -> Vec<(PastMeeting, u64)> {
        let past_meetings = self
            .store
            .past_meetings
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        past_meetings.list()
    }

    pub fn get_past_meeting(&self, uid: &str) -> Result<(PastMeeting, u64), ServiceError> {
        let past_meetings = self
            .store
            .past_meetings
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        past_meetings
            .get(uid)
            .ok_or_else(|| ServiceError::NotFound(format!("past meeting {} not found", uid)))
    }

    /// Manual past-meeting entry. Uses the same (meeting, occurrence)
    /// claim as the webhook path, so a record that reconciliation
    /// already created cannot be duplicated by hand.
    pub fn create_past_meeting(
        &self,
        input: PastMeetingInput,
    ) -> Result<(PastMeeting, u64), ServiceError> {
        let (meeting, _) = self.get_meeting(&input.meeting_uid)?;

        let record = PastMeeting {
            uid: Uuid::new_v4().to_string(),
            meeting_uid: meeting.uid.clone(),
            occurrence_id: input.occurrence_id.clone(),
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

        self.store
            .claim_past_meeting_key(&meeting.uid, &input.occurrence_id, &record.uid)?;

        let revision = {
            let mut past_meetings = self
                .store
                .past_meetings
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            match past_meetings.insert(&record.uid, record.clone()) {
                Ok(revision) => revision,
                Err(err) => {
                    self.store
                        .release_past_meeting_key(&meeting.uid, &input.occurrence_id);
                    return Err(err);
                }
            }
        };

        info!(
            "Manually created past meeting {} for meeting {} occurrence {}",
            record.uid, meeting.uid, input.occurrence_id
        );
        Ok((record, revision))
    }

    pub fn delete_past_meeting(&self, uid: &str, expected: u64) -> Result<(), ServiceError> {
        let removed = {
            let mut past_meetings = self
                .store
                .past_meetings
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            past_meetings.remove(uid, Some(expected))?
        };
        self.store
            .release_past_meeting_key(&removed.meeting_uid, &removed.occurrence_id);

        // Dependent records go with the parent
        {
            let mut participants = self
                .store
                .participants
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            let owned: Vec<String> = participants
                .find(|p| p.past_meeting_uid == uid)
                .into_iter()
                .map(|(p, _)| p.uid)
                .collect();
            for participant_uid in owned {
                let _ = participants.remove(&participant_uid, None);
            }
        }
        {
            let mut summaries = self
                .store
                .summaries
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            let owned: Vec<String> = summaries
                .find(|s| s.past_meeting_uid == uid)
                .into_iter()
                .map(|(s, _)| s.uid)
                .collect();
            for summary_uid in owned {
                let _ = summaries.remove(&summary_uid, None);
            }
        }

        info!("Deleted past meeting {}", uid);
        Ok(())
    }

    // ----- Past meeting participants -----

    pub fn list_participants(
        &self,
        past_meeting_uid: &str,
    ) -> Result<Vec<(PastMeetingParticipant, u64)>, ServiceError> {
        self.get_past_meeting(past_meeting_uid)?;
        let participants = self
            .store
            .participants
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        Ok(participants.find(|p| p.past_meeting_uid == past_meeting_uid))
    }

    pub fn get_participant(
        &self,
        uid: &str,
    ) -> Result<(PastMeetingParticipant, u64), ServiceError> {
        let participants = self
            .store
            .participants
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        participants
            .get(uid)
            .ok_or_else(|| ServiceError::NotFound(format!("participant {} not found", uid)))
    }

    pub fn update_participant(
        &self,
        uid: &str,
        expected: u64,
        input: ParticipantUpdateInput,
    ) -> Result<(PastMeetingParticipant, u64), ServiceError> {
        let mut participants = self
            .store
            .participants
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        participants.update(uid, Some(expected), |participant| {
            if let Some(is_invited) = input.is_invited {
                participant.is_invited = is_invited;
            }
            if let Some(is_attended) = input.is_attended {
                participant.is_attended = is_attended;
            }
            Ok(())
        })
    }

    // ----- Past meeting summaries -----

    pub fn list_summaries(
        &self,
        past_meeting_uid: &str,
    ) -> Result<Vec<(PastMeetingSummary, u64)>, ServiceError> {
        self.get_past_meeting(past_meeting_uid)?;
        let summaries = self
            .store
            .summaries
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        Ok(summaries.find(|s| s.past_meeting_uid == past_meeting_uid))
    }

    pub fn get_summary(&self, uid: &str) -> Result<(PastMeetingSummary, u64), ServiceError> {
        let summaries = self
            .store
            .summaries
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        summaries
            .get(uid)
            .ok_or_else(|| ServiceError::NotFound(format!("summary {} not found", uid)))
    }

    /// Clients may only touch the edited overlay; the raw AI content
    /// stays auditable underneath.
    pub fn update_summary(
        &self,
        uid: &str,
        expected: u64,
        input: SummaryUpdateInput,
    ) -> Result<(PastMeetingSummary, u64), ServiceError> {
        let mut summaries = self
            .store
            .summaries
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        summaries.update(uid, Some(expected), |summary| {
            if let Some(edited_overview) = &input.edited_overview {
                summary.edited_overview = Some(edited_overview.clone());
            }
            if let Some(edited_details) = &input.edited_details {
                summary.edited_details = Some(edited_details.clone());
            }
            if let Some(approved) = input.approved {
                summary.approved = approved;
            }
            Ok(())
        })
    }
}
