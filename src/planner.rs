//! Deterministic multi-week plan generation.
//!
//! One pass produces both the plan and a per-session trace of every
//! intermediate value, so the `explain` view can show exactly how a
//! prescription came about without re-deriving anything.

use chrono::{Datelike, NaiveDate};

use crate::adaptation::{
    apply_autoregulation, autoregulation_gate, overtraining_severity, training_status,
    OvertrainingSeverity,
};
use crate::config::EngineConfig;
use crate::error::{BarplanError, Result};
use crate::exercises::{ExerciseDefinition, LoadType, SessionTypeParams};
use crate::metrics::{drop_off, latest_test_max, test_sessions};
use crate::models::{
    CompletedSet, PlannedSet, RestPreference, SessionPlan, SessionResult, SessionType,
    TrainingStatus, UserProfile,
};

/// Everything a plan invocation depends on. Generation is a pure function
/// of this snapshot (§ determinism).
pub struct PlanRequest<'a> {
    pub config: &'a EngineConfig,
    pub exercise: &'a ExerciseDefinition,
    pub profile: &'a UserProfile,
    /// This exercise's full record list, REST markers included
    pub history: &'a [SessionResult],
    pub plan_start: NaiveDate,
    /// Horizon in weeks; None estimates one from distance to target
    pub weeks: Option<u32>,
    /// Anchor when no TEST exists in history
    pub baseline_max: Option<u32>,
    /// Clock date, used only by the overtraining window
    pub today: NaiveDate,
}

/// Intermediate values for one planned session, consumed by `explain`
#[derive(Debug, Clone)]
pub struct PlanTrace {
    pub date: NaiveDate,
    pub session_type: SessionType,
    pub week_number: u32,

    pub variant: String,
    pub cycle: Vec<String>,
    pub variant_count_before: u32,

    pub tm: u32,
    pub tm_float: f64,
    /// (week_number, increment, tm_before, tm_after) per boundary crossed
    pub weekly_log: Vec<(u32, f64, f64, f64)>,

    pub reps_low: u32,
    pub reps_high: u32,
    pub base_reps: u32,
    pub base_sets: u32,
    pub adj_reps: u32,
    pub adj_sets: u32,
    pub autoreg_active: bool,
    pub z_score: f64,

    pub rest_s: u32,
    pub rest_notes: Vec<String>,

    pub added_weight_kg: f64,
    pub last_test_weight_kg: f64,

    pub schedule: Vec<SessionType>,
    pub days_per_week: u8,
    pub target_reps_goal: u32,
    pub history_len: usize,

    pub overtraining_level: u8,
    pub overtraining_shift_days: i64,
}

/// Result of one plan invocation
pub struct PlanOutcome {
    pub plans: Vec<SessionPlan>,
    pub traces: Vec<PlanTrace>,
    pub status: TrainingStatus,
    pub severity: OvertrainingSeverity,
    /// Plan start after the overtraining shift, if any
    pub effective_start: NaiveDate,
}

/// Weekly session-type template for a given training density
pub fn schedule_template(days_per_week: u8) -> Vec<SessionType> {
    use SessionType::*;
    match days_per_week {
        1 => vec![S],
        2 => vec![S, H],
        4 => vec![S, H, T, E],
        5 => vec![S, H, T, E, S],
        _ => vec![S, H, E],
    }
}

/// Day offsets within each week (plan start = offset 0)
pub fn day_offsets(days_per_week: u8) -> Vec<i64> {
    match days_per_week {
        1 => vec![0],
        2 => vec![0, 3],
        4 => vec![0, 1, 3, 5],
        5 => vec![0, 1, 2, 4, 5],
        _ => vec![0, 2, 4],
    }
}

/// Monday on or before the given date
pub fn monday_on_or_before(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Synthetic TEST record used to bootstrap a fresh user from a baseline
pub fn synthetic_baseline_test(
    date: NaiveDate,
    bodyweight_kg: f64,
    baseline_max: u32,
    exercise: &ExerciseDefinition,
) -> SessionResult {
    SessionResult {
        date,
        exercise_id: exercise.exercise_id.clone(),
        session_type: SessionType::Test,
        variant: exercise.primary_variant.clone(),
        bodyweight_kg,
        sets: vec![CompletedSet {
            reps: baseline_max,
            weight_kg: 0.0,
            rest_s: 180,
            rir: Some(0),
        }],
        planned_sets: None,
        equipment: None,
        rir: Some(0),
        notes: Some("Baseline max (entered at setup)".to_string()),
    }
}

/// Adaptive rest for a session type, with the reasons for each adjustment.
///
/// Starts from the midpoint of the type's rest range and reacts to the most
/// recent same-type session (RIR, drop-off), current readiness, the user's
/// logged rest habits and their stated rest preference. Clamped to the
/// type's bounds.
fn adaptive_rest(
    config: &EngineConfig,
    params: &SessionTypeParams,
    recent_same_type: &[&SessionResult],
    z_score: f64,
    rest_preference: RestPreference,
) -> (u32, Vec<String>) {
    let midpoint = (params.rest_min + params.rest_max) / 2;

    // Adjustments only make sense against a prior same-type session
    let Some(&last) = recent_same_type.last() else {
        return (midpoint, Vec::new());
    };
    if last.sets.is_empty() {
        return (midpoint, Vec::new());
    }

    let mut rest = midpoint as i64;
    let mut notes = Vec::new();

    let rirs: Vec<u8> = last.sets.iter().filter_map(|s| s.rir).collect();
    if !rirs.is_empty() {
        if rirs.iter().any(|&r| r <= 1) {
            rest += 30;
            notes.push("a set hit RIR <= 1: +30 s".to_string());
        } else if rirs.iter().all(|&r| r >= 3) {
            rest -= 15;
            notes.push("all sets RIR >= 3: -15 s".to_string());
        }
    }

    let d = drop_off(last);
    if d > config.adaptation.drop_off_threshold {
        rest += 15;
        notes.push(format!("drop-off {:.0}%: +15 s", d * 100.0));
    }

    if z_score < config.adaptation.readiness_z_low {
        rest += 30;
        notes.push(format!("readiness z = {z_score:+.2}: +30 s"));
    }

    // Habit signal: shift toward the rests the user actually takes
    let logged_rests: Vec<u32> = recent_same_type
        .iter()
        .flat_map(|s| s.sets.iter())
        .filter(|s| s.rest_s > 0)
        .map(|s| s.rest_s)
        .collect();
    if logged_rests.len() >= 3 {
        let avg = logged_rests.iter().sum::<u32>() as f64 / logged_rests.len() as f64;
        if avg < params.rest_min as f64 * 0.85 {
            rest -= 20;
            notes.push(format!("you rest short (avg {avg:.0} s): -20 s"));
        } else if avg > params.rest_max as f64 * 1.10 {
            rest += 20;
            notes.push(format!("you rest long (avg {avg:.0} s): +20 s"));
        }
    }

    match rest_preference {
        RestPreference::Short => {
            rest -= 15;
            notes.push("rest preference short: -15 s".to_string());
        }
        RestPreference::Long => {
            rest += 15;
            notes.push("rest preference long: +15 s".to_string());
        }
        RestPreference::Normal => {}
    }

    let clamped = rest.clamp(params.rest_min as i64, params.rest_max as i64) as u32;
    (clamped, notes)
}

/// Added weight for a strength session.
///
/// Bodyweight-loaded exercises earn weight past the TM threshold:
/// raw = bw * increment_fraction * (TM - threshold), rounded to the nearest
/// 0.5 kg, capped. External-only exercises carry the dumbbell weight of the
/// most recent TEST instead.
fn added_weight(
    exercise: &ExerciseDefinition,
    training_max: u32,
    bodyweight_kg: f64,
    last_test_weight_kg: f64,
) -> f64 {
    if exercise.load_type == LoadType::ExternalOnly {
        return last_test_weight_kg;
    }
    if training_max <= exercise.weight_tm_threshold {
        return 0.0;
    }
    let points = (training_max - exercise.weight_tm_threshold) as f64;
    let raw = bodyweight_kg * exercise.weight_increment_fraction * points;
    let rounded = (raw * 2.0).round() / 2.0;
    rounded.min(exercise.max_added_weight_kg)
}

/// Generate the plan and its traces.
///
/// Fails with `MissingState` when there is neither history nor a baseline.
pub fn generate_plan(req: &PlanRequest<'_>) -> Result<PlanOutcome> {
    let config = req.config;
    let exercise = req.exercise;

    // Step 1: filter to training records for this exercise
    let mut training: Vec<SessionResult> = req
        .history
        .iter()
        .filter(|s| s.exercise_id == exercise.exercise_id && s.session_type.is_training())
        .cloned()
        .collect();

    if training.is_empty() {
        let Some(baseline) = req.baseline_max else {
            return Err(BarplanError::MissingState(
                "No history available; provide a baseline max or log a TEST session".to_string(),
            ));
        };
        training.push(synthetic_baseline_test(
            req.plan_start - chrono::Duration::days(1),
            req.profile.current_bodyweight_kg,
            baseline,
            exercise,
        ));
    }

    let status = training_status(
        config,
        exercise,
        &training,
        req.profile.current_bodyweight_kg,
        req.baseline_max,
    );
    let z_score = status.state.readiness_z_score();
    let gate = autoregulation_gate(config, &training);

    // The plan ramps from the proven test ceiling, not the 0.9-factored TM
    // shown in status. The asymmetry is intentional.
    let mut tm_float = latest_test_max(&training)
        .filter(|&m| m > 0)
        .or(req.baseline_max)
        .map(f64::from)
        .unwrap_or_else(|| status.state.m_hat.max(1.0));

    let target_goal = req.profile.target_for_exercise(&exercise.exercise_id).reps;
    let days_per_week = req.profile.days_for_exercise(&exercise.exercise_id);

    // Step 2: overtraining shift
    let severity = overtraining_severity(config, req.history, days_per_week, req.today);
    let mut start = req.plan_start;
    if severity.extra_rest_days > 0 {
        start += chrono::Duration::days(severity.extra_rest_days);
        tracing::info!(
            days = severity.extra_rest_days,
            level = severity.level,
            "plan start shifted forward for recovery"
        );
    }

    let weeks = match req.weeks {
        Some(w) => w.clamp(config.plan.min_weeks, config.plan.max_weeks),
        None => {
            let estimated = config.estimate_weeks_to_target(tm_float.round() as u32, target_goal);
            estimated.clamp(config.plan.min_weeks, config.plan.default_weeks)
        }
    };

    // Step 3–4: template, offsets and resumed rotation
    let template = schedule_template(days_per_week);
    let offsets = day_offsets(days_per_week);
    let rotation_count = training
        .iter()
        .filter(|s| s.session_type.in_rotation())
        .count();
    let mut rotation_idx = rotation_count % template.len();

    // Step 5: variant rotation counters seeded from history
    let mut variant_counts: std::collections::BTreeMap<SessionType, u32> =
        std::collections::BTreeMap::new();
    if exercise.has_variant_rotation {
        for s in &training {
            *variant_counts.entry(s.session_type).or_insert(0) += 1;
        }
    }

    // External-only: dumbbell weight carried from the most recent TEST
    let last_test_weight_kg = if exercise.load_type == LoadType::ExternalOnly {
        test_sessions(&training)
            .last()
            .and_then(|t| {
                t.sets
                    .iter()
                    .filter(|s| s.weight_kg > 0.0)
                    .map(|s| s.weight_kg)
                    .last()
            })
            .unwrap_or(0.0)
    } else {
        0.0
    };

    // Step 7 bookkeeping: TEST cadence measured from the last TEST
    let mut last_test_date = test_sessions(&training)
        .last()
        .map(|t| t.date)
        .unwrap_or(start);
    let test_interval = chrono::Duration::days(exercise.test_frequency_weeks as i64 * 7);

    // Week-number anchor: Monday on/before the first training record
    let first_monday = training
        .first()
        .map(|s| monday_on_or_before(s.date))
        .unwrap_or_else(|| monday_on_or_before(start));

    // Recent same-type history for adaptive rest
    let mut by_type: std::collections::BTreeMap<SessionType, Vec<&SessionResult>> =
        std::collections::BTreeMap::new();
    for s in &training {
        by_type.entry(s.session_type).or_default().push(s);
    }

    let mut plans = Vec::new();
    let mut traces = Vec::new();
    let mut weekly_log: Vec<(u32, f64, f64, f64)> = Vec::new();
    let mut prev_date: Option<NaiveDate> = None;
    let mut ot_sessions_left = severity.level as u32;

    for week in 0..weeks {
        for offset in &offsets {
            let date = start + chrono::Duration::days(week as i64 * 7 + offset);
            let week_number = ((date - first_monday).num_days() / 7 + 1).max(1) as u32;

            // Step 6a: TM progression once per calendar-week boundary
            if let Some(prev) = prev_date {
                if monday_on_or_before(date) > monday_on_or_before(prev) {
                    let increment = config.progression_rate(tm_float.round() as u32, target_goal);
                    let before = tm_float;
                    tm_float += increment;
                    weekly_log.push((week_number, increment, before, tm_float));
                }
            }
            let tm = tm_float.round() as u32;

            // TEST insertion replaces the slot without advancing the
            // session-type rotation
            let session_type = if date - last_test_date >= test_interval {
                last_test_date = date;
                SessionType::Test
            } else {
                let t = template[rotation_idx % template.len()];
                rotation_idx += 1;
                t
            };

            // Step 6c: variant selection
            let cycle = exercise.cycle(session_type);
            let variant_count_before = variant_counts.get(&session_type).copied().unwrap_or(0);
            let variant = if session_type == SessionType::Test {
                exercise.primary_variant.clone()
            } else if exercise.has_variant_rotation {
                let v = cycle[variant_count_before as usize % cycle.len()].clone();
                *variant_counts.entry(session_type).or_insert(0) += 1;
                v
            } else {
                exercise.primary_variant.clone()
            };

            let params = *exercise.params(session_type)?;

            // Step 6e: rep bounds from TM fractions
            let reps_low = ((tm as f64 * params.reps_fraction_low).floor() as u32).max(params.reps_min);
            let reps_high = ((tm as f64 * params.reps_fraction_high).floor() as u32).min(params.reps_max);
            let base_reps =
                ((reps_low + reps_high) / 2).clamp(params.reps_min, params.reps_max);
            let base_sets = (params.sets_min + params.sets_max) / 2;

            // Step 6g: autoregulation (a TEST is always one all-out set)
            let (mut adj_sets, mut adj_reps) = if session_type == SessionType::Test {
                (base_sets, base_reps)
            } else {
                apply_autoregulation(config, base_sets, base_reps, z_score, gate)
            };

            // Step 6h: overtraining modifiers on the first `level` sessions
            let mut ot_applied = false;
            if ot_sessions_left > 0 && session_type != SessionType::Test {
                ot_applied = true;
                if severity.level >= 2 {
                    adj_sets = adj_sets.saturating_sub(1).max(2);
                }
                if severity.level >= 3 {
                    adj_reps = adj_reps.saturating_sub(1).max(params.reps_min);
                }
                ot_sessions_left -= 1;
            }

            // Step 6i: adaptive rest
            let recent_same_type: Vec<&SessionResult> = by_type
                .get(&session_type)
                .map(|v| v.iter().rev().take(5).rev().copied().collect())
                .unwrap_or_default();
            let (mut rest_s, mut rest_notes) = adaptive_rest(
                config,
                &params,
                &recent_same_type,
                z_score,
                req.profile.rest_preference,
            );
            if ot_applied {
                rest_s = (rest_s + 30).min(params.rest_max);
                rest_notes.push("overtraining guard: +30 s".to_string());
            }

            // Step 6j: added weight (strength only)
            let weight = if session_type == SessionType::S {
                added_weight(exercise, tm, req.profile.current_bodyweight_kg, last_test_weight_kg)
            } else {
                0.0
            };

            // Step 6k: materialize sets
            let sets: Vec<PlannedSet> = if session_type == SessionType::E {
                let total_target = (config.endurance_volume_multiplier(tm) * tm as f64) as u32;
                let mut ladder = Vec::new();
                let mut current = base_reps.max(params.reps_min);
                let mut accumulated = 0;
                while accumulated < total_target && (ladder.len() as u32) < params.sets_max {
                    let reps = current.max(params.reps_min);
                    ladder.push(PlannedSet { reps, weight_kg: 0.0, rest_s });
                    accumulated += reps;
                    current = current.saturating_sub(1).max(params.reps_min);
                }
                ladder
            } else {
                (0..adj_sets)
                    .map(|_| PlannedSet { reps: adj_reps, weight_kg: weight, rest_s })
                    .collect()
            };

            plans.push(SessionPlan {
                date,
                exercise_id: exercise.exercise_id.clone(),
                session_type,
                variant: variant.clone(),
                sets,
                expected_tm: tm,
                week_number,
            });

            traces.push(PlanTrace {
                date,
                session_type,
                week_number,
                variant,
                cycle,
                variant_count_before,
                tm,
                tm_float,
                weekly_log: weekly_log.clone(),
                reps_low,
                reps_high,
                base_reps,
                base_sets,
                adj_reps,
                adj_sets,
                autoreg_active: gate,
                z_score,
                rest_s,
                rest_notes,
                added_weight_kg: weight,
                last_test_weight_kg,
                schedule: template.clone(),
                days_per_week,
                target_reps_goal: target_goal,
                history_len: training.len(),
                overtraining_level: severity.level,
                overtraining_shift_days: severity.extra_rest_days,
            });

            prev_date = Some(date);
        }
    }

    Ok(PlanOutcome {
        plans,
        traces,
        status,
        severity,
        effective_start: start,
    })
}
