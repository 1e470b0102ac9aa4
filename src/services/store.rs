use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::errors::ServiceError;
use crate::models::meeting::{Meeting, MeetingSettings};
use crate::models::past_meeting::{PastMeeting, PastMeetingParticipant, PastMeetingSummary};
use crate::models::registrant::{Registrant, Rsvp};

/// Flat, independently lockable table of versioned records keyed by UID.
///
/// Every row carries a monotonically advancing revision. Revisions are
/// the optimistic-concurrency token: a conditional mutation supplies the
/// revision it last read and is rejected with a conflict when the stored
/// revision has moved. Deleted UIDs leave a tombstone so a re-created
/// row resumes the old sequence instead of restarting at 1, which would
/// let a stale client's token match again.
pub struct VersionedTable<T: Clone> {
    rows: HashMap<String, (u64, T)>,
    tombstones: HashMap<String, u64>,
}

impl<T: Clone> VersionedTable<T> {
    pub fn new() -> Self {
        Self {
            rows: HashMap::new(),
            tombstones: HashMap::new(),
        }
    }

    /// Insert a new row. Creation carries no expected revision; the only
    /// failure is a uniqueness violation on the UID.
    pub fn insert(&mut self, uid: &str, record: T) -> Result<u64, ServiceError> {
        if self.rows.contains_key(uid) {
            return Err(ServiceError::Conflict(format!(
                "record {} already exists",
                uid
            )));
        }
        let revision = self.tombstones.get(uid).copied().unwrap_or(0) + 1;
        self.rows.insert(uid.to_string(), (revision, record));
        Ok(revision)
    }

    pub fn get(&self, uid: &str) -> Option<(T, u64)> {
        self.rows
            .get(uid)
            .map(|(revision, record)| (record.clone(), *revision))
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.rows.contains_key(uid)
    }

    pub fn list(&self) -> Vec<(T, u64)> {
        self.rows
            .values()
            .map(|(revision, record)| (record.clone(), *revision))
            .collect()
    }

    pub fn find<F>(&self, predicate: F) -> Vec<(T, u64)>
    where
        F: Fn(&T) -> bool,
    {
        self.rows
            .values()
            .filter(|(_, record)| predicate(record))
            .map(|(revision, record)| (record.clone(), *revision))
            .collect()
    }

    /// Conditionally mutate a row. `expected` of `None` is reserved for
    /// internal callers that serialize access by other means (the
    /// reconciler's keyed locks); client-driven mutations always supply
    /// the revision they last read. On mismatch nothing is mutated.
    pub fn update<F>(
        &mut self,
        uid: &str,
        expected: Option<u64>,
        mutate: F,
    ) -> Result<(T, u64), ServiceError>
    where
        F: FnOnce(&mut T) -> Result<(), ServiceError>,
    {
        let (revision, record) = self
            .rows
            .get_mut(uid)
            .ok_or_else(|| ServiceError::NotFound(format!("record {} not found", uid)))?;

        if let Some(expected) = expected {
            if *revision != expected {
                return Err(ServiceError::Conflict(format!(
                    "record {} already modified (expected revision {}, found {})",
                    uid, expected, revision
                )));
            }
        }

        let mut draft = record.clone();
        mutate(&mut draft)?;
        *record = draft;
        *revision += 1;
        Ok((record.clone(), *revision))
    }

    pub fn remove(&mut self, uid: &str, expected: Option<u64>) -> Result<T, ServiceError> {
        let (revision, _) = self
            .rows
            .get(uid)
            .ok_or_else(|| ServiceError::NotFound(format!("record {} not found", uid)))?;

        if let Some(expected) = expected {
            if *revision != expected {
                return Err(ServiceError::Conflict(format!(
                    "record {} already modified (expected revision {}, found {})",
                    uid, expected, revision
                )));
            }
        }

        match self.rows.remove(uid) {
            Some((revision, record)) => {
                self.tombstones.insert(uid.to_string(), revision);
                Ok(record)
            }
            None => Err(ServiceError::NotFound(format!("record {} not found", uid))),
        }
    }
}

impl<T: Clone> Default for VersionedTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Arena tables for every entity the engine owns, plus the keyed locks
/// that serialize webhook reconciliation per (meeting, occurrence) pair.
///
/// Ownership relations are foreign-key fields on flat records, not
/// embedded graphs, so concurrent upserts and version checks stay
/// per-row.
pub struct LifecycleStore {
    pub meetings: Mutex<VersionedTable<Meeting>>,
    pub settings: Mutex<VersionedTable<MeetingSettings>>,
    pub registrants: Mutex<VersionedTable<Registrant>>,
    pub rsvps: Mutex<Vec<Rsvp>>,
    pub past_meetings: Mutex<VersionedTable<PastMeeting>>,
    pub participants: Mutex<VersionedTable<PastMeetingParticipant>>,
    pub summaries: Mutex<VersionedTable<PastMeetingSummary>>,
    // (meeting_uid, occurrence_id) -> past meeting uid
    past_meeting_index: Mutex<HashMap<(String, String), String>>,
    occurrence_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LifecycleStore {
    pub fn new() -> Self {
        Self {
            meetings: Mutex::new(VersionedTable::new()),
            settings: Mutex::new(VersionedTable::new()),
            registrants: Mutex::new(VersionedTable::new()),
            rsvps: Mutex::new(Vec::new()),
            past_meetings: Mutex::new(VersionedTable::new()),
            participants: Mutex::new(VersionedTable::new()),
            summaries: Mutex::new(VersionedTable::new()),
            past_meeting_index: Mutex::new(HashMap::new()),
            occurrence_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Per-(meeting, occurrence) lock. The reconciler state machine is
    /// not safe to apply to the same pair from two threads, so every
    /// webhook handler holds this for the duration of its fold.
    pub fn occurrence_lock(&self, meeting_uid: &str, occurrence_id: &str) -> Arc<Mutex<()>> {
        let key = format!("{}:{}", meeting_uid, occurrence_id);
        let mut locks = self.occurrence_locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(key).or_default())
    }

    pub fn past_meeting_uid_for(&self, meeting_uid: &str, occurrence_id: &str) -> Option<String> {
        let index = self.past_meeting_index.lock().unwrap_or_else(|e| e.into_inner());
        index
            .get(&(meeting_uid.to_string(), occurrence_id.to_string()))
            .cloned()
    }

    /// Register the (meeting, occurrence) -> past meeting mapping.
    /// Fails with a conflict when the pair is already claimed, which is
    /// what keeps the one-record-per-pair invariant under both the
    /// webhook and the manual-entry path.
    pub fn claim_past_meeting_key(
        &self,
        meeting_uid: &str,
        occurrence_id: &str,
        past_meeting_uid: &str,
    ) -> Result<(), ServiceError> {
        let mut index = self.past_meeting_index.lock().unwrap_or_else(|e| e.into_inner());
        let key = (meeting_uid.to_string(), occurrence_id.to_string());
        if index.contains_key(&key) {
            return Err(ServiceError::Conflict(format!(
                "past meeting already exists for meeting {} occurrence {}",
                meeting_uid, occurrence_id
            )));
        }
        index.insert(key, past_meeting_uid.to_string());
        Ok(())
    }

    pub fn release_past_meeting_key(&self, meeting_uid: &str, occurrence_id: &str) {
        let mut index = self.past_meeting_index.lock().unwrap_or_else(|e| e.into_inner());
        index.remove(&(meeting_uid.to_string(), occurrence_id.to_string()));
    }
}

impl Default for LifecycleStore {
    fn default() -> Self {
        Self::new()
    }
}
