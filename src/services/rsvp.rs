use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::meeting::Meeting;
use crate::models::registrant::{Rsvp, RsvpInput, RsvpResponse, RsvpScope};
use crate::services::occurrences::OccurrenceStore;
use crate::services::recurrence::occurrence_start_ts;
use crate::services::store::LifecycleStore;

// Result of applying one RSVP submission
#[derive(Debug, Serialize)]
pub struct AppliedRsvp {
    pub rsvp: Rsvp,
    pub affected_occurrence_ids: Vec<String>,
}

/// Whether an RSVP's scope covers the given occurrence. Occurrence ids
/// encode the nominal start time, so this_and_following reduces to a
/// numeric comparison.
pub fn scope_covers(rsvp: &Rsvp, occurrence_id: &str) -> bool {
    match rsvp.scope {
        RsvpScope::All => true,
        RsvpScope::Single => rsvp.occurrence_id.as_deref() == Some(occurrence_id),
        RsvpScope::ThisAndFollowing => {
            let anchor = rsvp
                .occurrence_id
                .as_deref()
                .and_then(occurrence_start_ts);
            let target = occurrence_start_ts(occurrence_id);
            match (anchor, target) {
                (Some(anchor), Some(target)) => target >= anchor,
                _ => false,
            }
        }
    }
}

/// Apply an RSVP submission at the current time
pub fn apply(
    store: &LifecycleStore,
    occurrences: &OccurrenceStore,
    meeting: &Meeting,
    input: &RsvpInput,
    horizon: DateTime<Utc>,
) -> Result<AppliedRsvp, ServiceError> {
    apply_at(store, occurrences, meeting, input, horizon, Utc::now())
}

/// Apply an RSVP submission with an explicit submission timestamp.
///
/// Precedence is resolved occurrence-by-occurrence: for each occurrence
/// the submission's scope reaches, the most recently submitted RSVP
/// covering that occurrence wins. A superseded submission is still
/// recorded for the audit trail; it just stops being effective.
/// Counter updates happen inside the same critical section as the RSVP
/// write, with the old response bucket decremented and the new one
/// incremented as a pair, so no double-counted intermediate state is
/// observable.
pub fn apply_at(
    store: &LifecycleStore,
    occurrences: &OccurrenceStore,
    meeting: &Meeting,
    input: &RsvpInput,
    horizon: DateTime<Utc>,
    submitted_at: DateTime<Utc>,
) -> Result<AppliedRsvp, ServiceError> {
    // The registrant must exist and belong to this meeting
    let registrant = {
        let registrants = store.registrants.lock().unwrap_or_else(|e| e.into_inner());
        registrants
            .get(&input.registrant_uid)
            .map(|(record, _)| record)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("registrant {} not found", input.registrant_uid))
            })?
    };
    if registrant.meeting_uid != meeting.uid {
        return Err(ServiceError::NotFound(format!(
            "registrant {} does not belong to meeting {}",
            input.registrant_uid, meeting.uid
        )));
    }

    let resolved = occurrences.resolve(meeting, horizon)?;

    // Scope / occurrence id consistency checks
    let affected: Vec<String> = match input.scope {
        RsvpScope::All => {
            if input.occurrence_id.is_some() {
                return Err(ServiceError::Validation(
                    "occurrence_id must be empty when scope is all".to_string(),
                ));
            }
            resolved
                .iter()
                .filter(|o| !o.cancelled)
                .map(|o| o.occurrence_id.clone())
                .collect()
        }
        RsvpScope::Single => {
            let target = input.occurrence_id.as_deref().ok_or_else(|| {
                ServiceError::Validation(
                    "occurrence_id is required when scope is single".to_string(),
                )
            })?;
            if !resolved.iter().any(|o| o.occurrence_id == target) {
                return Err(ServiceError::Validation(format!(
                    "occurrence {} does not resolve for meeting {}",
                    target, meeting.uid
                )));
            }
            vec![target.to_string()]
        }
        RsvpScope::ThisAndFollowing => {
            let target = input.occurrence_id.as_deref().ok_or_else(|| {
                ServiceError::Validation(
                    "occurrence_id is required when scope is this_and_following".to_string(),
                )
            })?;
            let anchor_ts = occurrence_start_ts(target).ok_or_else(|| {
                ServiceError::Validation(format!("malformed occurrence id: {}", target))
            })?;
            if !resolved.iter().any(|o| o.occurrence_id == target) {
                return Err(ServiceError::Validation(format!(
                    "occurrence {} does not resolve for meeting {}",
                    target, meeting.uid
                )));
            }
            resolved
                .iter()
                .filter(|o| {
                    !o.cancelled
                        && occurrence_start_ts(&o.occurrence_id)
                            .map(|ts| ts >= anchor_ts)
                            .unwrap_or(false)
                })
                .map(|o| o.occurrence_id.clone())
                .collect()
        }
    };

    let rsvp = Rsvp {
        uid: Uuid::new_v4().to_string(),
        meeting_uid: meeting.uid.to_string(),
        registrant_uid: registrant.uid.clone(),
        response: input.response,
        scope: input.scope,
        occurrence_id: input.occurrence_id.clone(),
        submitted_at,
    };

    // Atomic read-modify-write over this registrant's RSVP records:
    // the audit-trail append and every counter delta happen while the
    // RSVP table lock is held.
    let mut rsvps = store.rsvps.lock().unwrap_or_else(|e| e.into_inner());

    let mut effective = Vec::new();
    for occurrence_id in &affected {
        let prior = rsvps
            .iter()
            .filter(|r| {
                r.meeting_uid == meeting.uid
                    && r.registrant_uid == registrant.uid
                    && scope_covers(r, occurrence_id)
            })
            .max_by_key(|r| r.submitted_at);

        if let Some(prior) = prior {
            if prior.submitted_at > submitted_at {
                // A newer submission already covers this occurrence;
                // per-occurrence precedence leaves it in place
                debug!(
                    "RSVP {} superseded for occurrence {} by newer submission {}",
                    rsvp.uid, occurrence_id, prior.uid
                );
                continue;
            }
        }

        let prior_response = prior.map(|r| r.response);
        occurrences.with_counters(&meeting.uid, occurrence_id, |counters| {
            match prior_response {
                Some(RsvpResponse::Accepted) => {
                    counters.accepted_count = counters.accepted_count.saturating_sub(1)
                }
                Some(RsvpResponse::Declined) => {
                    counters.declined_count = counters.declined_count.saturating_sub(1)
                }
                _ => {}
            }
            match rsvp.response {
                RsvpResponse::Accepted => counters.accepted_count += 1,
                RsvpResponse::Declined => counters.declined_count += 1,
                RsvpResponse::Maybe => {}
            }
        });

        effective.push(occurrence_id.clone());
    }

    rsvps.push(rsvp.clone());

    info!(
        "Applied RSVP {} from registrant {} to {} of {} targeted occurrences",
        rsvp.uid,
        registrant.uid,
        effective.len(),
        affected.len()
    );

    Ok(AppliedRsvp {
        rsvp,
        affected_occurrence_ids: effective,
    })
}

/// All RSVP submissions for a meeting, newest first
pub fn list_for_meeting(store: &LifecycleStore, meeting_uid: &str) -> Vec<Rsvp> {
    let rsvps = store.rsvps.lock().unwrap_or_else(|e| e.into_inner());
    let mut records: Vec<Rsvp> = rsvps
        .iter()
        .filter(|r| r.meeting_uid == meeting_uid)
        .cloned()
        .collect();
    records.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    records
}
