use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::errors::ServiceError;
use crate::models::meeting::{Meeting, Occurrence, OccurrenceEdit};
use crate::services::recurrence::{expand_within, occurrence_id_for};

// Per-occurrence override, kept separate from the raw expansion so rule
// edits never silently revert an individually cancelled or edited
// occurrence
#[derive(Debug, Clone, Default)]
struct OccurrenceOverride {
    cancelled: bool,
    start_time: Option<DateTime<Utc>>,
    duration: Option<u32>,
    title: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OccurrenceCounters {
    pub registrant_count: u32,
    pub accepted_count: u32,
    pub declined_count: u32,
}

#[derive(Default)]
struct MeetingOccurrences {
    overrides: HashMap<String, OccurrenceOverride>,
    counters: HashMap<String, OccurrenceCounters>,
}

/// Materialized, mutable view of a meeting's occurrences.
///
/// Holds overrides and RSVP counters keyed by occurrence id; the raw
/// sequence itself is always recomputed from the current rule.
/// Overrides for ids the current rule no longer produces are retained
/// but simply stop appearing in resolved views, so cancellation history
/// survives rule edits.
pub struct OccurrenceStore {
    state: Mutex<HashMap<String, MeetingOccurrences>>,
}

impl OccurrenceStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Expanded sequence with overrides and counters applied, capped at
    /// the horizon. Non-recurring meetings resolve to their single
    /// occurrence.
    pub fn resolve(
        &self,
        meeting: &Meeting,
        horizon: DateTime<Utc>,
    ) -> Result<Vec<Occurrence>, ServiceError> {
        let starts = match &meeting.recurrence {
            Some(rule) => expand_within(rule, meeting.start_time, Some(horizon))?,
            None => vec![meeting.start_time],
        };

        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let entry = state.get(&meeting.uid);

        let mut occurrences: Vec<Occurrence> = starts
            .into_iter()
            .map(|nominal_start| {
                let occurrence_id = occurrence_id_for(nominal_start);
                let overrides = entry.and_then(|m| m.overrides.get(&occurrence_id));
                let counters = entry
                    .and_then(|m| m.counters.get(&occurrence_id))
                    .copied()
                    .unwrap_or_default();

                Occurrence {
                    start_time: overrides
                        .and_then(|o| o.start_time)
                        .unwrap_or(nominal_start),
                    duration: overrides
                        .and_then(|o| o.duration)
                        .unwrap_or(meeting.duration),
                    title: overrides
                        .and_then(|o| o.title.clone())
                        .unwrap_or_else(|| meeting.title.clone()),
                    cancelled: overrides.map(|o| o.cancelled).unwrap_or(false),
                    registrant_count: counters.registrant_count,
                    accepted_count: counters.accepted_count,
                    declined_count: counters.declined_count,
                    occurrence_id,
                }
            })
            .collect();

        occurrences.sort_by_key(|o| o.start_time);
        Ok(occurrences)
    }

    /// Mark an occurrence cancelled. Idempotent: cancelling an already
    /// cancelled occurrence changes nothing.
    pub fn cancel(&self, meeting_uid: &str, occurrence_id: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .entry(meeting_uid.to_string())
            .or_default()
            .overrides
            .entry(occurrence_id.to_string())
            .or_default()
            .cancelled = true;
    }

    /// Merge an edit into the occurrence override without touching the
    /// base rule. Fields left unset keep their current override value.
    pub fn edit(&self, meeting_uid: &str, occurrence_id: &str, edit: &OccurrenceEdit) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let overrides = state
            .entry(meeting_uid.to_string())
            .or_default()
            .overrides
            .entry(occurrence_id.to_string())
            .or_default();

        if let Some(start_time) = edit.start_time {
            overrides.start_time = Some(start_time);
        }
        if let Some(duration) = edit.duration {
            overrides.duration = Some(duration);
        }
        if let Some(title) = &edit.title {
            overrides.title = Some(title.clone());
        }
    }

    pub fn counters(&self, meeting_uid: &str, occurrence_id: &str) -> OccurrenceCounters {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .get(meeting_uid)
            .and_then(|m| m.counters.get(occurrence_id))
            .copied()
            .unwrap_or_default()
    }

    /// Apply a counter mutation for one occurrence under the store lock
    pub fn with_counters<F>(&self, meeting_uid: &str, occurrence_id: &str, apply: F)
    where
        F: FnOnce(&mut OccurrenceCounters),
    {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let counters = state
            .entry(meeting_uid.to_string())
            .or_default()
            .counters
            .entry(occurrence_id.to_string())
            .or_default();
        apply(counters);
    }

    /// Adjust the registrant headcount on a set of occurrences when a
    /// registrant is created or deleted
    pub fn shift_registrant_count(
        &self,
        meeting_uid: &str,
        occurrence_ids: &[String],
        delta: i64,
    ) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let counters = &mut state.entry(meeting_uid.to_string()).or_default().counters;
        for occurrence_id in occurrence_ids {
            let entry = counters.entry(occurrence_id.clone()).or_default();
            entry.registrant_count = (entry.registrant_count as i64 + delta).max(0) as u32;
        }
    }

    /// Drop all occurrence state for a meeting (logical meeting removal)
    pub fn forget_meeting(&self, meeting_uid: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.remove(meeting_uid);
    }
}

impl Default for OccurrenceStore {
    fn default() -> Self {
        Self::new()
    }
}
