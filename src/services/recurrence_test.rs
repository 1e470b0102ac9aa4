#[cfg(test)]
mod recurrence_tests {
    use chrono::{TimeZone, Utc};

    use crate::errors::ServiceError;
    use crate::models::meeting::RecurrenceRule;
    use crate::services::recurrence::{
        expand_within, occurrence_id_for, occurrence_start_ts, validate_rule, RecurrenceIter,
    };

    fn rule(recurrence_type: i32) -> RecurrenceRule {
        RecurrenceRule {
            recurrence_type,
            repeat_interval: 1,
            weekly_days: None,
            monthly_day: None,
            monthly_week: None,
            monthly_week_day: None,
            end_times: None,
            end_date_time: None,
        }
    }

    #[test]
    fn test_occurrence_id_roundtrip() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap();
        let id = occurrence_id_for(start);
        assert_eq!(id, start.timestamp().to_string());
        assert_eq!(occurrence_start_ts(&id), Some(start.timestamp()));
        assert_eq!(occurrence_start_ts("not-a-timestamp"), None);
    }

    #[test]
    fn test_daily_with_interval_and_count() {
        let mut r = rule(1);
        r.repeat_interval = 3;
        r.end_times = Some(4);

        let anchor = Utc.with_ymd_and_hms(2025, 1, 1, 15, 0, 0).unwrap();
        let starts = expand_within(&r, anchor, None).unwrap();

        assert_eq!(starts.len(), 4);
        assert_eq!(starts[0], anchor);
        assert_eq!(starts[1], Utc.with_ymd_and_hms(2025, 1, 4, 15, 0, 0).unwrap());
        assert_eq!(starts[3], Utc.with_ymd_and_hms(2025, 1, 10, 15, 0, 0).unwrap());
    }

    #[test]
    fn test_weekly_expansion_chronological() {
        // Sunday = 1, so "2,4" is Monday and Wednesday
        let mut r = rule(2);
        r.weekly_days = Some("2,4".to_string());
        r.end_times = Some(4);

        // 2025-01-06 is a Monday
        let anchor = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        let starts = expand_within(&r, anchor, None).unwrap();

        assert_eq!(
            starts,
            vec![
                Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 1, 8, 10, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 1, 13, 10, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_weekly_every_other_week() {
        let mut r = rule(2);
        r.weekly_days = Some("2".to_string());
        r.repeat_interval = 2;
        r.end_times = Some(3);

        let anchor = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        let starts = expand_within(&r, anchor, None).unwrap();

        // Mondays two weeks apart
        assert_eq!(
            starts,
            vec![
                Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 1, 20, 10, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 2, 3, 10, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_end_date_time_is_inclusive() {
        let mut r = rule(1);
        r.end_date_time = Some(Utc.with_ymd_and_hms(2025, 1, 3, 9, 0, 0).unwrap());

        let anchor = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let starts = expand_within(&r, anchor, None).unwrap();

        // Jan 1, 2 and 3; the occurrence exactly at the bound is kept
        assert_eq!(starts.len(), 3);
        assert_eq!(starts[2], Utc.with_ymd_and_hms(2025, 1, 3, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_monthly_short_months_skipped() {
        let mut r = rule(3);
        r.monthly_day = Some(31);
        r.end_times = Some(3);

        let anchor = Utc.with_ymd_and_hms(2025, 1, 31, 18, 0, 0).unwrap();
        let starts = expand_within(&r, anchor, None).unwrap();

        // February and April have no day 31 and produce nothing
        assert_eq!(
            starts,
            vec![
                Utc.with_ymd_and_hms(2025, 1, 31, 18, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 3, 31, 18, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 5, 31, 18, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_monthly_day_never_producible_terminates() {
        // Day 31 every 12 months anchored in February lands on Feb 31
        // forever; the expansion must come back empty instead of
        // scanning months without end.
        let mut r = rule(3);
        r.monthly_day = Some(31);
        r.repeat_interval = 12;
        r.end_times = Some(2);

        let anchor = Utc.with_ymd_and_hms(2025, 2, 10, 9, 0, 0).unwrap();
        let starts = expand_within(&r, anchor, None).unwrap();
        assert!(starts.is_empty());

        // Day 29 on the same cadence is rare but real: the next leap
        // year still gets found
        let mut r = rule(3);
        r.monthly_day = Some(29);
        r.repeat_interval = 12;
        r.end_times = Some(1);

        let anchor = Utc.with_ymd_and_hms(2025, 2, 10, 9, 0, 0).unwrap();
        let starts = expand_within(&r, anchor, None).unwrap();
        assert_eq!(
            starts,
            vec![Utc.with_ymd_and_hms(2028, 2, 29, 9, 0, 0).unwrap()]
        );
    }

    #[test]
    fn test_monthly_last_weekday() {
        // week -1, weekday 6 = Friday
        let mut r = rule(3);
        r.monthly_week = Some(-1);
        r.monthly_week_day = Some(6);
        r.end_times = Some(2);

        let anchor = Utc.with_ymd_and_hms(2025, 1, 1, 16, 0, 0).unwrap();
        let starts = expand_within(&r, anchor, None).unwrap();

        assert_eq!(
            starts,
            vec![
                Utc.with_ymd_and_hms(2025, 1, 31, 16, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 2, 28, 16, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_unbounded_requires_horizon() {
        let mut r = rule(1);
        r.end_times = None;
        r.end_date_time = None;

        let anchor = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let err = expand_within(&r, anchor, None).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let horizon = Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap();
        let starts = expand_within(&r, anchor, Some(horizon)).unwrap();
        assert_eq!(starts.len(), 5);
    }

    #[test]
    fn test_horizon_caps_bounded_rule() {
        let mut r = rule(1);
        r.end_times = Some(100);

        let anchor = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let horizon = Utc.with_ymd_and_hms(2025, 1, 3, 9, 0, 0).unwrap();
        let starts = expand_within(&r, anchor, Some(horizon)).unwrap();

        assert_eq!(starts.len(), 3);
    }

    #[test]
    fn test_fast_forward_preserves_count_accounting() {
        let mut r = rule(1);
        r.end_times = Some(5);

        let anchor = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let mut iter = RecurrenceIter::new(&r, anchor).unwrap();
        iter.fast_forward(Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap());

        // Two occurrences were consumed by the fast-forward, three remain
        let rest: Vec<_> = iter.collect();
        assert_eq!(
            rest,
            vec![
                Utc.with_ymd_and_hms(2025, 1, 3, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 1, 4, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_ids_stable_across_re_expansion() {
        let mut r = rule(2);
        r.weekly_days = Some("2,4".to_string());
        r.end_times = Some(4);

        let anchor = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        let first: Vec<String> = expand_within(&r, anchor, None)
            .unwrap()
            .into_iter()
            .map(occurrence_id_for)
            .collect();

        // Narrowing the rule keeps the ids of starts still on the grid
        r.weekly_days = Some("2".to_string());
        r.end_times = Some(2);
        let second: Vec<String> = expand_within(&r, anchor, None)
            .unwrap()
            .into_iter()
            .map(occurrence_id_for)
            .collect();

        assert!(second.iter().all(|id| first.contains(id)));
    }

    #[test]
    fn test_validation_rejects_contradictions() {
        // Both terminators
        let mut r = rule(1);
        r.end_times = Some(3);
        r.end_date_time = Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        assert!(matches!(
            validate_rule(&r),
            Err(ServiceError::Validation(_))
        ));

        // Zero interval
        let mut r = rule(1);
        r.repeat_interval = 0;
        assert!(validate_rule(&r).is_err());

        // Weekly without days
        let r = rule(2);
        assert!(validate_rule(&r).is_err());

        // Weekday code out of range
        let mut r = rule(2);
        r.weekly_days = Some("2,9".to_string());
        assert!(validate_rule(&r).is_err());

        // Both monthly forms
        let mut r = rule(3);
        r.monthly_day = Some(15);
        r.monthly_week = Some(2);
        r.monthly_week_day = Some(3);
        assert!(validate_rule(&r).is_err());

        // Neither monthly form
        let r = rule(3);
        assert!(validate_rule(&r).is_err());

        // Unknown type
        let r = rule(9);
        assert!(validate_rule(&r).is_err());
    }
}
