use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::errors::ServiceError;
use crate::models::meeting::RecurrenceRule;

// Rule type codes on the provider wire
const TYPE_DAILY: i32 = 1;
const TYPE_WEEKLY: i32 = 2;
const TYPE_MONTHLY: i32 = 3;

// A month-day grid can miss every month it visits (day 31 on a 12-month
// interval anchored in February). Four years of consecutive misses covers
// every month-length and leap-year combination the grid can reach, so the
// sequence is empty from there on.
const MAX_MONTHLY_MISSES: u32 = 48;

/// Stable occurrence identifier derived from the nominal start time.
///
/// Using the decimal Unix timestamp keeps ids deterministic across
/// re-expansion: editing a rule preserves the id of every start time
/// that still falls on the new grid, and id ordering matches start-time
/// ordering.
pub fn occurrence_id_for(start: DateTime<Utc>) -> String {
    start.timestamp().to_string()
}

/// Nominal start time encoded in an occurrence id, if well-formed
pub fn occurrence_start_ts(occurrence_id: &str) -> Option<i64> {
    occurrence_id.parse::<i64>().ok()
}

/// Check a rule for contradictions before any expansion happens.
/// Surfaces `ValidationError` synchronously; no partial state results.
pub fn validate_rule(rule: &RecurrenceRule) -> Result<(), ServiceError> {
    if rule.repeat_interval < 1 {
        return Err(ServiceError::Validation(
            "repeat_interval must be at least 1".to_string(),
        ));
    }

    if rule.end_times.is_some() && rule.end_date_time.is_some() {
        return Err(ServiceError::Validation(
            "end_times and end_date_time are mutually exclusive".to_string(),
        ));
    }
    if let Some(0) = rule.end_times {
        return Err(ServiceError::Validation(
            "end_times must be at least 1".to_string(),
        ));
    }

    match rule.recurrence_type {
        TYPE_DAILY => Ok(()),
        TYPE_WEEKLY => {
            let days = rule
                .weekly_days
                .as_deref()
                .ok_or_else(|| {
                    ServiceError::Validation("weekly rule requires weekly_days".to_string())
                })?;
            parse_weekly_days(days).map(|_| ())
        }
        TYPE_MONTHLY => {
            let by_day = rule.monthly_day.is_some();
            let by_week = rule.monthly_week.is_some() || rule.monthly_week_day.is_some();
            if by_day && by_week {
                return Err(ServiceError::Validation(
                    "monthly_day and monthly_week are mutually exclusive".to_string(),
                ));
            }
            if by_day {
                let day = rule.monthly_day.unwrap_or(0);
                if !(1..=31).contains(&day) {
                    return Err(ServiceError::Validation(
                        "monthly_day must be between 1 and 31".to_string(),
                    ));
                }
                return Ok(());
            }
            let week = rule.monthly_week.ok_or_else(|| {
                ServiceError::Validation(
                    "monthly rule requires monthly_day or monthly_week".to_string(),
                )
            })?;
            let weekday = rule.monthly_week_day.ok_or_else(|| {
                ServiceError::Validation(
                    "monthly_week requires monthly_week_day".to_string(),
                )
            })?;
            if !matches!(week, -1 | 1 | 2 | 3 | 4) {
                return Err(ServiceError::Validation(
                    "monthly_week must be -1 or 1-4".to_string(),
                ));
            }
            if !(1..=7).contains(&weekday) {
                return Err(ServiceError::Validation(
                    "monthly_week_day must be between 1 and 7".to_string(),
                ));
            }
            Ok(())
        }
        other => Err(ServiceError::Validation(format!(
            "unknown recurrence type: {}",
            other
        ))),
    }
}

// Parse "2,4" style weekday lists, Sunday = 1
fn parse_weekly_days(raw: &str) -> Result<Vec<u32>, ServiceError> {
    let mut days = Vec::new();
    for part in raw.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        let code = trimmed.parse::<u32>().map_err(|_| {
            ServiceError::Validation(format!("invalid weekday code: {}", trimmed))
        })?;
        if !(1..=7).contains(&code) {
            return Err(ServiceError::Validation(format!(
                "weekday code out of range: {}",
                code
            )));
        }
        if !days.contains(&code) {
            days.push(code);
        }
    }
    if days.is_empty() {
        return Err(ServiceError::Validation(
            "weekly_days must name at least one weekday".to_string(),
        ));
    }
    Ok(days)
}

fn weekday_code(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday() + 1
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

fn add_months(year: i32, month: u32, delta: u32) -> (i32, u32) {
    let index = (month - 1) + delta;
    (year + (index / 12) as i32, index % 12 + 1)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = add_months(year, month, 1);
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap_or(NaiveDate::MAX);
    (first_of_next - Duration::days(1)).day()
}

// Nth weekday of a month; week -1 means last. Weeks 1-4 always exist.
fn nth_weekday_of_month(year: i32, month: u32, week: i32, weekday: u32) -> Option<NaiveDate> {
    if week == -1 {
        let last_day = days_in_month(year, month);
        let mut date = NaiveDate::from_ymd_opt(year, month, last_day)?;
        while weekday_code(date) != weekday {
            date -= Duration::days(1);
        }
        return Some(date);
    }

    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset = (weekday + 7 - weekday_code(first)) % 7;
    let day = 1 + offset + (week as u32 - 1) * 7;
    NaiveDate::from_ymd_opt(year, month, day)
}

enum Frequency {
    Daily {
        next: NaiveDate,
    },
    Weekly {
        cursor: NaiveDate,
        anchor_week: NaiveDate,
        days: Vec<u32>,
    },
    Monthly {
        year: i32,
        month: u32,
        grid: MonthlyGrid,
        floor: NaiveDate,
    },
}

enum MonthlyGrid {
    Day(u32),
    Nth { week: i32, weekday: u32 },
}

/// Lazy expansion of a recurrence rule into occurrence start times.
///
/// The iterator is unbounded when the rule has no terminator, so callers
/// materializing "all occurrences" must cap it themselves (see
/// `expand_within`). Incremental consumers can pull one occurrence at a
/// time and resume later with `fast_forward`.
pub struct RecurrenceIter {
    freq: Frequency,
    interval: i64,
    time: NaiveTime,
    remaining: Option<u32>,
    until: Option<DateTime<Utc>>,
    pending: Option<DateTime<Utc>>,
}

impl RecurrenceIter {
    pub fn new(rule: &RecurrenceRule, anchor: DateTime<Utc>) -> Result<Self, ServiceError> {
        validate_rule(rule)?;

        let anchor_date = anchor.date_naive();
        let freq = match rule.recurrence_type {
            TYPE_DAILY => Frequency::Daily { next: anchor_date },
            TYPE_WEEKLY => {
                let days = parse_weekly_days(rule.weekly_days.as_deref().unwrap_or_default())?;
                Frequency::Weekly {
                    cursor: anchor_date,
                    anchor_week: week_start(anchor_date),
                    days,
                }
            }
            _ => {
                let grid = match rule.monthly_day {
                    Some(day) => MonthlyGrid::Day(day),
                    None => MonthlyGrid::Nth {
                        week: rule.monthly_week.unwrap_or(1),
                        weekday: rule.monthly_week_day.unwrap_or(1),
                    },
                };
                Frequency::Monthly {
                    year: anchor_date.year(),
                    month: anchor_date.month(),
                    grid,
                    floor: anchor_date,
                }
            }
        };

        Ok(Self {
            freq,
            interval: rule.repeat_interval as i64,
            time: anchor.time(),
            remaining: rule.end_times,
            until: rule.end_date_time,
            pending: None,
        })
    }

    /// Resume expansion strictly after the given instant. Occurrences at
    /// or before it are consumed internally so that `end_times`
    /// accounting still reflects the full sequence.
    pub fn fast_forward(&mut self, after: DateTime<Utc>) {
        while let Some(dt) = self.step() {
            if dt > after {
                self.pending = Some(dt);
                break;
            }
        }
    }

    fn step(&mut self) -> Option<DateTime<Utc>> {
        if self.remaining == Some(0) {
            return None;
        }

        let date = match &mut self.freq {
            Frequency::Daily { next } => {
                let date = *next;
                *next += Duration::days(self.interval);
                date
            }
            Frequency::Weekly {
                cursor,
                anchor_week,
                days,
            } => loop {
                let date = *cursor;
                *cursor += Duration::days(1);
                let weeks = (week_start(date) - *anchor_week).num_days() / 7;
                if weeks % self.interval == 0 && days.contains(&weekday_code(date)) {
                    break date;
                }
            },
            Frequency::Monthly {
                year,
                month,
                grid,
                floor,
            } => {
                let mut misses = 0;
                loop {
                    let candidate = match grid {
                        // Months shorter than the target day are skipped so
                        // occurrence ids stay stable across re-expansion
                        MonthlyGrid::Day(day) => NaiveDate::from_ymd_opt(*year, *month, *day),
                        MonthlyGrid::Nth { week, weekday } => {
                            nth_weekday_of_month(*year, *month, *week, *weekday)
                        }
                    };
                    let (next_year, next_month) = add_months(*year, *month, self.interval as u32);
                    *year = next_year;
                    *month = next_month;
                    if let Some(date) = candidate {
                        if date >= *floor {
                            break date;
                        }
                    }
                    misses += 1;
                    if misses >= MAX_MONTHLY_MISSES {
                        self.remaining = Some(0);
                        return None;
                    }
                }
            }
        };

        let dt = Utc.from_utc_datetime(&date.and_time(self.time));
        if let Some(until) = self.until {
            if dt > until {
                self.remaining = Some(0);
                return None;
            }
        }
        if let Some(n) = self.remaining.as_mut() {
            *n -= 1;
        }
        Some(dt)
    }
}

impl Iterator for RecurrenceIter {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<DateTime<Utc>> {
        if let Some(dt) = self.pending.take() {
            return Some(dt);
        }
        self.step()
    }
}

/// Expand a rule into concrete start times.
///
/// A horizon is mandatory for unbounded rules; the expander never
/// materializes an infinite collection. Bounded rules may run past a
/// supplied horizon only up to their own terminator, never past the
/// horizon itself.
pub fn expand_within(
    rule: &RecurrenceRule,
    anchor: DateTime<Utc>,
    horizon: Option<DateTime<Utc>>,
) -> Result<Vec<DateTime<Utc>>, ServiceError> {
    let unbounded = rule.end_times.is_none() && rule.end_date_time.is_none();
    if unbounded && horizon.is_none() {
        return Err(ServiceError::Validation(
            "unbounded recurrence requires a horizon".to_string(),
        ));
    }

    let iter = RecurrenceIter::new(rule, anchor)?;
    let mut starts = Vec::new();
    for dt in iter {
        if let Some(cutoff) = horizon {
            if dt > cutoff {
                break;
            }
        }
        starts.push(dt);
    }
    Ok(starts)
}
