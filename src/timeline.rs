//! Unified timeline: logged history reconciled with the generated plan.
//!
//! Past entries read their prescription from the frozen `planned_sets` on
//! the logged record, never from the planner; only `planned` and `next`
//! rows carry freshly computed prescriptions. The past is immutable.

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::max_estimator::estimate_from_session;
use crate::models::{
    SessionPlan, SessionResult, SessionType, TimelineEntry, TimelineStatus,
};
use crate::planner::monday_on_or_before;

/// Displayed max projection for a future entry:
/// max(round(expected_tm / tm_factor), latest_test_max)
pub fn max_projection(config: &EngineConfig, expected_tm: u32, latest_test_max: u32) -> u32 {
    let projected = (expected_tm as f64 / config.adaptation.tm_factor).round() as u32;
    projected.max(latest_test_max)
}

/// Merge plan slots with history into a date-ordered timeline.
///
/// Matching: each plan slot claims an unmatched history record on the same
/// date, preferring one of the same session type. Unclaimed records become
/// `extra` rows (or `rested` for REST markers).
pub fn build_timeline(
    plans: &[SessionPlan],
    history: &[SessionResult],
    today: NaiveDate,
) -> Vec<TimelineEntry> {
    let first_monday = history
        .iter()
        .find(|s| s.session_type.is_training())
        .map(|s| monday_on_or_before(s.date))
        .or_else(|| plans.first().map(|p| monday_on_or_before(p.date)))
        .unwrap_or_else(|| monday_on_or_before(today));

    let week_of = |date: NaiveDate| -> u32 {
        (((date - first_monday).num_days() / 7) + 1).max(1) as u32
    };

    let mut matched = vec![false; history.len()];
    let mut entries: Vec<TimelineEntry> = Vec::new();

    for plan in plans {
        let candidates: Vec<usize> = history
            .iter()
            .enumerate()
            .filter(|(i, s)| !matched[*i] && s.date == plan.date)
            .map(|(i, _)| i)
            .collect();

        let chosen = candidates
            .iter()
            .find(|&&i| history[i].session_type == plan.session_type)
            .or_else(|| candidates.first())
            .copied();

        let entry = match chosen {
            Some(i) => {
                matched[i] = true;
                let actual = &history[i];
                let status = if actual.session_type == SessionType::Rest {
                    TimelineStatus::Rested
                } else {
                    TimelineStatus::Done
                };
                TimelineEntry {
                    date: plan.date,
                    session_type: actual.session_type,
                    variant: actual.variant.clone(),
                    status,
                    prescribed: actual.planned_sets.clone(),
                    max_estimate: past_estimate(actual),
                    actual: Some(actual.clone()),
                    expected_tm: plan.expected_tm,
                    week_number: week_of(plan.date),
                    history_id: Some(i + 1),
                }
            }
            None if plan.date < today => TimelineEntry {
                date: plan.date,
                session_type: plan.session_type,
                variant: plan.variant.clone(),
                status: TimelineStatus::Missed,
                actual: None,
                // A missed slot has no frozen prescription to show
                prescribed: None,
                expected_tm: plan.expected_tm,
                week_number: week_of(plan.date),
                history_id: None,
                max_estimate: None,
            },
            None => TimelineEntry {
                date: plan.date,
                session_type: plan.session_type,
                variant: plan.variant.clone(),
                status: TimelineStatus::Planned,
                actual: None,
                prescribed: Some(plan.sets.clone()),
                expected_tm: plan.expected_tm,
                week_number: week_of(plan.date),
                history_id: None,
                max_estimate: None,
            },
        };
        entries.push(entry);
    }

    // History records no plan slot claimed
    for (i, record) in history.iter().enumerate() {
        if matched[i] {
            continue;
        }
        let status = if record.session_type == SessionType::Rest {
            TimelineStatus::Rested
        } else {
            TimelineStatus::Extra
        };
        entries.push(TimelineEntry {
            date: record.date,
            session_type: record.session_type,
            variant: record.variant.clone(),
            status,
            prescribed: record.planned_sets.clone(),
            max_estimate: past_estimate(record),
            actual: Some(record.clone()),
            expected_tm: 0,
            week_number: week_of(record.date),
            history_id: Some(i + 1),
        });
    }

    entries.sort_by_key(|e| e.date);

    // The first upcoming planned row becomes "next"
    if let Some(first_planned) = entries
        .iter_mut()
        .find(|e| e.status == TimelineStatus::Planned && e.date >= today)
    {
        first_planned.status = TimelineStatus::Next;
    }

    entries
}

fn past_estimate(record: &SessionResult) -> Option<crate::models::MaxEstimate> {
    if record.session_type == SessionType::Test || !record.session_type.is_training() {
        return None;
    }
    if record.sets.iter().filter(|s| s.reps > 0).count() < 2 {
        return None;
    }
    estimate_from_session(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompletedSet, PlannedSet};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn plan(date_str: &str, session_type: SessionType, reps: u32) -> SessionPlan {
        SessionPlan {
            date: date(date_str),
            exercise_id: "pull_up".to_string(),
            session_type,
            variant: "pronated".to_string(),
            sets: vec![PlannedSet { reps, weight_kg: 0.0, rest_s: 240 }; 4],
            expected_tm: 10,
            week_number: 1,
        }
    }

    fn record(date_str: &str, session_type: SessionType, reps: &[u32]) -> SessionResult {
        SessionResult {
            date: date(date_str),
            exercise_id: "pull_up".to_string(),
            session_type,
            variant: "pronated".to_string(),
            bodyweight_kg: 82.0,
            sets: reps
                .iter()
                .map(|&r| CompletedSet { reps: r, weight_kg: 0.0, rest_s: 180, rir: None })
                .collect(),
            planned_sets: None,
            equipment: None,
            rir: None,
            notes: None,
        }
    }

    #[test]
    fn test_done_entry_uses_frozen_prescription() {
        let mut logged = record("2026-02-02", SessionType::S, &[5, 5, 4]);
        let frozen = vec![PlannedSet { reps: 3, weight_kg: 0.0, rest_s: 200 }];
        logged.planned_sets = Some(frozen.clone());

        let plans = vec![plan("2026-02-02", SessionType::S, 6)];
        let timeline = build_timeline(&plans, &[logged], date("2026-02-10"));

        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].status, TimelineStatus::Done);
        // The frozen prescription wins over the freshly computed one
        assert_eq!(timeline[0].prescribed, Some(frozen));
        assert_eq!(timeline[0].history_id, Some(1));
    }

    #[test]
    fn test_match_prefers_same_type() {
        let history = vec![
            record("2026-02-02", SessionType::H, &[7, 7]),
            record("2026-02-02", SessionType::S, &[5, 5]),
        ];
        let plans = vec![plan("2026-02-02", SessionType::S, 5)];
        let timeline = build_timeline(&plans, &history, date("2026-02-10"));

        let done: Vec<_> = timeline
            .iter()
            .filter(|e| e.status == TimelineStatus::Done)
            .collect();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].session_type, SessionType::S);

        // The H session on the same date surfaces as extra
        assert!(timeline.iter().any(|e| e.status == TimelineStatus::Extra
            && e.session_type == SessionType::H));
    }

    #[test]
    fn test_missed_and_next_tagging() {
        let plans = vec![
            plan("2026-02-02", SessionType::S, 5),
            plan("2026-02-04", SessionType::H, 7),
            plan("2026-02-06", SessionType::E, 5),
        ];
        let timeline = build_timeline(&plans, &[], date("2026-02-04"));

        assert_eq!(timeline[0].status, TimelineStatus::Missed);
        assert!(timeline[0].prescribed.is_none());
        assert_eq!(timeline[1].status, TimelineStatus::Next);
        assert_eq!(timeline[2].status, TimelineStatus::Planned);
    }

    #[test]
    fn test_rest_records_show_as_rested() {
        let mut rest = record("2026-02-03", SessionType::Rest, &[]);
        rest.sets.clear();
        let plans = vec![plan("2026-02-02", SessionType::S, 5)];
        let history = vec![record("2026-02-02", SessionType::S, &[5, 5]), rest];
        let timeline = build_timeline(&plans, &history, date("2026-02-10"));

        assert!(timeline
            .iter()
            .any(|e| e.status == TimelineStatus::Rested && e.date == date("2026-02-03")));
    }

    #[test]
    fn test_week_numbers_from_first_training_monday() {
        // History starts Wed 2026-01-07; anchor Monday is 2026-01-05
        let history = vec![record("2026-01-07", SessionType::Test, &[10])];
        let plans = vec![plan("2026-01-19", SessionType::S, 5)];
        let timeline = build_timeline(&plans, &history, date("2026-01-19"));

        let past = timeline.iter().find(|e| e.date == date("2026-01-07")).unwrap();
        let future = timeline.iter().find(|e| e.date == date("2026-01-19")).unwrap();
        assert_eq!(past.week_number, 1);
        assert_eq!(future.week_number, 3);
    }

    #[test]
    fn test_past_sessions_get_max_estimates() {
        let history = vec![
            record("2026-02-02", SessionType::H, &[8, 7, 6]),
            record("2026-02-04", SessionType::Test, &[10]),
        ];
        let plans = vec![
            plan("2026-02-02", SessionType::H, 7),
            plan("2026-02-04", SessionType::Test, 10),
        ];
        let timeline = build_timeline(&plans, &history, date("2026-02-10"));

        let h = timeline.iter().find(|e| e.date == date("2026-02-02")).unwrap();
        assert!(h.max_estimate.is_some());
        // TEST sessions carry no between-test estimate
        let t = timeline.iter().find(|e| e.date == date("2026-02-04")).unwrap();
        assert!(t.max_estimate.is_none());
    }

    #[test]
    fn test_max_projection() {
        let config = EngineConfig::default();
        // round(11 / 0.9) = 12
        assert_eq!(max_projection(&config, 11, 10), 12);
        // Never projects below the proven max
        assert_eq!(max_projection(&config, 8, 14), 14);
    }

    #[test]
    fn test_sorted_by_date() {
        let plans = vec![
            plan("2026-02-06", SessionType::E, 5),
            plan("2026-02-02", SessionType::S, 5),
        ];
        let history = vec![record("2026-02-04", SessionType::H, &[7])];
        let timeline = build_timeline(&plans, &history, date("2026-02-01"));
        let dates: Vec<_> = timeline.iter().map(|e| e.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }
}
