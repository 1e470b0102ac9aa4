#[cfg(test)]
mod rsvp_tests {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::errors::ServiceError;
    use crate::models::meeting::{Meeting, RecurrenceRule, Visibility};
    use crate::models::registrant::{
        Registrant, RegistrantType, RsvpInput, RsvpResponse, RsvpScope,
    };
    use crate::services::occurrences::OccurrenceStore;
    use crate::services::rsvp::{apply_at, list_for_meeting, scope_covers};
    use crate::services::store::LifecycleStore;

    fn daily_meeting() -> Meeting {
        Meeting {
            uid: "m1".to_string(),
            project_uid: "p1".to_string(),
            title: "Standup".to_string(),
            description: String::new(),
            start_time: Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap(),
            duration: 30,
            timezone: "UTC".to_string(),
            recurrence: Some(RecurrenceRule {
                recurrence_type: 1,
                repeat_interval: 1,
                weekly_days: None,
                monthly_day: None,
                monthly_week: None,
                monthly_week_day: None,
                end_times: Some(3),
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

    fn registrant(uid: &str, meeting_uid: &str) -> Registrant {
        Registrant {
            uid: uid.to_string(),
            meeting_uid: meeting_uid.to_string(),
            email: format!("{}@example.com", uid),
            first_name: "Pat".to_string(),
            last_name: "Doe".to_string(),
            org: None,
            host: false,
            occurrence_id: None,
            registrant_type: RegistrantType::Direct,
            invited_count: 0,
            attended_count: 0,
            provider_registrant_id: None,
        }
    }

    fn setup() -> (LifecycleStore, OccurrenceStore, Meeting, Vec<String>) {
        let store = LifecycleStore::new();
        let occurrences = OccurrenceStore::new();
        let meeting = daily_meeting();
        {
            let mut registrants = store.registrants.lock().unwrap();
            registrants.insert("r1", registrant("r1", &meeting.uid)).unwrap();
        }
        let ids: Vec<String> = occurrences
            .resolve(&meeting, horizon())
            .unwrap()
            .into_iter()
            .map(|o| o.occurrence_id)
            .collect();
        (store, occurrences, meeting, ids)
    }

    fn horizon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 5, 12, minute, 0).unwrap()
    }

    fn input(response: RsvpResponse, scope: RsvpScope, occurrence_id: Option<&str>) -> RsvpInput {
        RsvpInput {
            registrant_uid: "r1".to_string(),
            response,
            scope,
            occurrence_id: occurrence_id.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_scope_all_covers_every_occurrence() {
        let (store, occurrences, meeting, ids) = setup();

        let applied = apply_at(
            &store,
            &occurrences,
            &meeting,
            &input(RsvpResponse::Accepted, RsvpScope::All, None),
            horizon(),
            at(0),
        )
        .unwrap();

        assert_eq!(applied.affected_occurrence_ids, ids);
        for id in &ids {
            assert_eq!(occurrences.counters(&meeting.uid, id).accepted_count, 1);
        }
    }

    #[test]
    fn test_scope_all_rejects_occurrence_id() {
        let (store, occurrences, meeting, ids) = setup();
        let err = apply_at(
            &store,
            &occurrences,
            &meeting,
            &input(RsvpResponse::Accepted, RsvpScope::All, Some(&ids[0])),
            horizon(),
            at(0),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_scope_single_requires_resolving_occurrence() {
        let (store, occurrences, meeting, _) = setup();

        let err = apply_at(
            &store,
            &occurrences,
            &meeting,
            &input(RsvpResponse::Accepted, RsvpScope::Single, None),
            horizon(),
            at(0),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = apply_at(
            &store,
            &occurrences,
            &meeting,
            &input(RsvpResponse::Accepted, RsvpScope::Single, Some("12345")),
            horizon(),
            at(0),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_this_and_following_does_not_touch_earlier() {
        let (store, occurrences, meeting, ids) = setup();

        let applied = apply_at(
            &store,
            &occurrences,
            &meeting,
            &input(
                RsvpResponse::Declined,
                RsvpScope::ThisAndFollowing,
                Some(&ids[1]),
            ),
            horizon(),
            at(0),
        )
        .unwrap();

        assert_eq!(applied.affected_occurrence_ids, vec![ids[1].clone(), ids[2].clone()]);
        assert_eq!(occurrences.counters(&meeting.uid, &ids[0]).declined_count, 0);
        assert_eq!(occurrences.counters(&meeting.uid, &ids[1]).declined_count, 1);
        assert_eq!(occurrences.counters(&meeting.uid, &ids[2]).declined_count, 1);
    }

    #[test]
    fn test_newer_single_supersedes_all_per_occurrence() {
        let (store, occurrences, meeting, ids) = setup();

        apply_at(
            &store,
            &occurrences,
            &meeting,
            &input(RsvpResponse::Accepted, RsvpScope::All, None),
            horizon(),
            at(0),
        )
        .unwrap();

        apply_at(
            &store,
            &occurrences,
            &meeting,
            &input(RsvpResponse::Declined, RsvpScope::Single, Some(&ids[1])),
            horizon(),
            at(1),
        )
        .unwrap();

        // Occurrence 1 flipped to declined with the paired decrement;
        // the others keep the blanket accept
        let flipped = occurrences.counters(&meeting.uid, &ids[1]);
        assert_eq!(flipped.accepted_count, 0);
        assert_eq!(flipped.declined_count, 1);
        let kept = occurrences.counters(&meeting.uid, &ids[0]);
        assert_eq!(kept.accepted_count, 1);
        assert_eq!(kept.declined_count, 0);
    }

    #[test]
    fn test_older_submission_does_not_override_newer() {
        let (store, occurrences, meeting, ids) = setup();

        apply_at(
            &store,
            &occurrences,
            &meeting,
            &input(RsvpResponse::Declined, RsvpScope::Single, Some(&ids[0])),
            horizon(),
            at(10),
        )
        .unwrap();

        // A blanket accept submitted earlier arrives late
        let applied = apply_at(
            &store,
            &occurrences,
            &meeting,
            &input(RsvpResponse::Accepted, RsvpScope::All, None),
            horizon(),
            at(5),
        )
        .unwrap();

        // It lands only where nothing newer covers
        assert_eq!(
            applied.affected_occurrence_ids,
            vec![ids[1].clone(), ids[2].clone()]
        );
        let first = occurrences.counters(&meeting.uid, &ids[0]);
        assert_eq!(first.declined_count, 1);
        assert_eq!(first.accepted_count, 0);

        // Both submissions remain in the audit trail
        assert_eq!(list_for_meeting(&store, &meeting.uid).len(), 2);
    }

    #[test]
    fn test_maybe_counts_in_neither_bucket() {
        let (store, occurrences, meeting, ids) = setup();

        apply_at(
            &store,
            &occurrences,
            &meeting,
            &input(RsvpResponse::Accepted, RsvpScope::Single, Some(&ids[0])),
            horizon(),
            at(0),
        )
        .unwrap();
        apply_at(
            &store,
            &occurrences,
            &meeting,
            &input(RsvpResponse::Maybe, RsvpScope::Single, Some(&ids[0])),
            horizon(),
            at(1),
        )
        .unwrap();

        let counters = occurrences.counters(&meeting.uid, &ids[0]);
        assert_eq!(counters.accepted_count, 0);
        assert_eq!(counters.declined_count, 0);
    }

    #[test]
    fn test_repeated_same_response_not_double_counted() {
        let (store, occurrences, meeting, ids) = setup();

        for minute in 0..3 {
            apply_at(
                &store,
                &occurrences,
                &meeting,
                &input(RsvpResponse::Accepted, RsvpScope::Single, Some(&ids[0])),
                horizon(),
                at(minute),
            )
            .unwrap();
        }

        assert_eq!(occurrences.counters(&meeting.uid, &ids[0]).accepted_count, 1);
    }

    #[test]
    fn test_unknown_registrant_rejected() {
        let (store, occurrences, meeting, _) = setup();
        let mut bad = input(RsvpResponse::Accepted, RsvpScope::All, None);
        bad.registrant_uid = "ghost".to_string();

        let err = apply_at(&store, &occurrences, &meeting, &bad, horizon(), at(0)).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn test_scope_covers_boundaries() {
        let rsvp = crate::models::registrant::Rsvp {
            uid: "v1".to_string(),
            meeting_uid: "m1".to_string(),
            registrant_uid: "r1".to_string(),
            response: RsvpResponse::Accepted,
            scope: RsvpScope::ThisAndFollowing,
            occurrence_id: Some("1000".to_string()),
            submitted_at: at(0),
        };
        assert!(scope_covers(&rsvp, "1000"));
        assert!(scope_covers(&rsvp, "2000"));
        assert!(!scope_covers(&rsvp, "999"));
        assert!(!scope_covers(&rsvp, "garbage"));
    }
}
