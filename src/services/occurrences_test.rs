#[cfg(test)]
mod occurrences_tests {
    use chrono::{TimeZone, Utc};

    use crate::models::meeting::{Meeting, OccurrenceEdit, RecurrenceRule, Visibility};
    use crate::services::occurrences::OccurrenceStore;
    use crate::services::recurrence::occurrence_id_for;

    fn weekly_meeting() -> Meeting {
        Meeting {
            uid: "m1".to_string(),
            project_uid: "p1".to_string(),
            title: "Weekly sync".to_string(),
            description: String::new(),
            // 2025-01-06 is a Monday
            start_time: Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap(),
            duration: 60,
            timezone: "UTC".to_string(),
            recurrence: Some(RecurrenceRule {
                recurrence_type: 2,
                repeat_interval: 1,
                weekly_days: Some("2,4".to_string()),
                monthly_day: None,
                monthly_week: None,
                monthly_week_day: None,
                end_times: Some(4),
                end_date_time: None,
            }),
            visibility: Visibility::Public,
            restricted: false,
            committees: Vec::new(),
            platform: "conferencing".to_string(),
            organizers: Vec::new(),
            recording_enabled: false,
            transcript_enabled: false,
            youtube_upload_enabled: false,
            artifact_visibility: "meeting_hosts".to_string(),
            join_url: None,
            provider_meeting_id: None,
            created_by: "test".to_string(),
        }
    }

    fn horizon() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_resolve_recurring_meeting() {
        let store = OccurrenceStore::new();
        let meeting = weekly_meeting();

        let occurrences = store.resolve(&meeting, horizon()).unwrap();
        assert_eq!(occurrences.len(), 4);
        assert!(occurrences.windows(2).all(|w| w[0].start_time < w[1].start_time));
        assert!(occurrences.iter().all(|o| !o.cancelled));
        assert!(occurrences.iter().all(|o| o.duration == 60));
        assert!(occurrences.iter().all(|o| o.title == "Weekly sync"));
    }

    #[test]
    fn test_resolve_non_recurring_meeting() {
        let store = OccurrenceStore::new();
        let mut meeting = weekly_meeting();
        meeting.recurrence = None;

        let occurrences = store.resolve(&meeting, horizon()).unwrap();
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].occurrence_id, occurrence_id_for(meeting.start_time));
    }

    #[test]
    fn test_cancel_is_idempotent_and_survives_resolve() {
        let store = OccurrenceStore::new();
        let meeting = weekly_meeting();
        let occurrences = store.resolve(&meeting, horizon()).unwrap();
        let target = occurrences[1].occurrence_id.clone();

        store.cancel(&meeting.uid, &target);
        store.cancel(&meeting.uid, &target);

        let resolved = store.resolve(&meeting, horizon()).unwrap();
        let cancelled: Vec<_> = resolved.iter().filter(|o| o.cancelled).collect();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].occurrence_id, target);
    }

    #[test]
    fn test_override_hidden_when_rule_stops_producing_id() {
        let store = OccurrenceStore::new();
        let mut meeting = weekly_meeting();

        let occurrences = store.resolve(&meeting, horizon()).unwrap();
        // Second occurrence is a Wednesday
        let wednesday = occurrences[1].occurrence_id.clone();
        store.cancel(&meeting.uid, &wednesday);

        // Drop Wednesdays from the rule; the cancelled id no longer resolves
        if let Some(rule) = meeting.recurrence.as_mut() {
            rule.weekly_days = Some("2".to_string());
        }
        let resolved = store.resolve(&meeting, horizon()).unwrap();
        assert!(resolved.iter().all(|o| o.occurrence_id != wednesday));

        // Restoring the rule brings the cancellation back
        if let Some(rule) = meeting.recurrence.as_mut() {
            rule.weekly_days = Some("2,4".to_string());
        }
        let resolved = store.resolve(&meeting, horizon()).unwrap();
        let restored = resolved
            .iter()
            .find(|o| o.occurrence_id == wednesday)
            .unwrap();
        assert!(restored.cancelled);
    }

    #[test]
    fn test_edit_merges_into_override() {
        let store = OccurrenceStore::new();
        let meeting = weekly_meeting();
        let occurrences = store.resolve(&meeting, horizon()).unwrap();
        let target = occurrences[0].occurrence_id.clone();

        store.edit(
            &meeting.uid,
            &target,
            &OccurrenceEdit {
                start_time: None,
                duration: Some(90),
                title: None,
            },
        );
        store.edit(
            &meeting.uid,
            &target,
            &OccurrenceEdit {
                start_time: None,
                duration: None,
                title: Some("Extended sync".to_string()),
            },
        );

        let resolved = store.resolve(&meeting, horizon()).unwrap();
        let edited = resolved.iter().find(|o| o.occurrence_id == target).unwrap();
        // Both edits apply; the second did not clear the first
        assert_eq!(edited.duration, 90);
        assert_eq!(edited.title, "Extended sync");
        assert_eq!(edited.start_time, meeting.start_time);

        let untouched = resolved.iter().find(|o| o.occurrence_id != target).unwrap();
        assert_eq!(untouched.duration, 60);
    }

    #[test]
    fn test_registrant_count_shift_clamps_at_zero() {
        let store = OccurrenceStore::new();
        let meeting = weekly_meeting();
        let occurrences = store.resolve(&meeting, horizon()).unwrap();
        let ids: Vec<String> = occurrences.iter().map(|o| o.occurrence_id.clone()).collect();

        store.shift_registrant_count(&meeting.uid, &ids, 2);
        store.shift_registrant_count(&meeting.uid, &ids[..1], -5);

        let resolved = store.resolve(&meeting, horizon()).unwrap();
        assert_eq!(resolved[0].registrant_count, 0);
        assert_eq!(resolved[1].registrant_count, 2);
    }

    #[test]
    fn test_forget_meeting_drops_state() {
        let store = OccurrenceStore::new();
        let meeting = weekly_meeting();
        let occurrences = store.resolve(&meeting, horizon()).unwrap();
        store.cancel(&meeting.uid, &occurrences[0].occurrence_id);

        store.forget_meeting(&meeting.uid);

        let resolved = store.resolve(&meeting, horizon()).unwrap();
        assert!(resolved.iter().all(|o| !o.cancelled));
    }
}
