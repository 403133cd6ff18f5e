//! Adaptation rules: plateau, underperformance, deload, autoregulation,
//! overtraining severity and the weekly volume policy.
//!
//! These sit between the physiological state (what the body has absorbed)
//! and the planner (what gets prescribed next).

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::exercises::ExerciseDefinition;
use crate::metrics::{
    latest_test_max, overall_max_reps, session_max_bw_only, test_sessions, training_max_from,
    trend_slope_per_week, weekly_compliance,
};
use crate::models::{FitnessFatigueState, SessionResult, SessionType, TrainingStatus};
use crate::physiology::PhysiologyModel;

/// Plateau: TEST slope below threshold AND no in-window TEST reaching the
/// all-time best.
pub fn detect_plateau(config: &EngineConfig, history: &[SessionResult]) -> bool {
    let tests = test_sessions(history);
    if tests.len() < 2 {
        return false;
    }

    let slope = trend_slope_per_week(history, config.adaptation.trend_window_days);
    if slope >= config.adaptation.plateau_slope {
        return false;
    }

    let latest = tests[tests.len() - 1].date;
    let cutoff = latest - chrono::Duration::days(config.adaptation.trend_window_days);
    let best_ever = overall_max_reps(history);

    !tests
        .into_iter()
        .filter(|s| s.date >= cutoff)
        .any(|s| session_max_bw_only(s) >= best_ever)
}

/// Underperformance: the last two strength sessions both fell short of
/// 90% of the readiness-adjusted prediction, each evaluated against the
/// state as it was on that session's date.
pub fn check_underperformance(
    config: &EngineConfig,
    model: &PhysiologyModel<'_>,
    history: &[SessionResult],
    baseline_max: Option<u32>,
) -> bool {
    let mut strength_evals: Vec<(u32, f64)> = Vec::new();
    model.replay_state(history, baseline_max, |session, state| {
        if session.session_type == SessionType::S {
            strength_evals.push((session_max_bw_only(session), model.predicted_max(state)));
        }
    });

    if strength_evals.len() < 2 {
        return false;
    }

    let threshold_factor = 1.0 - config.adaptation.underperformance;
    strength_evals[strength_evals.len() - 2..]
        .iter()
        .all(|(actual, predicted)| (*actual as f64) < predicted * threshold_factor)
}

/// Deload is recommended on any of:
/// plateau with low readiness, consecutive strength underperformance, or
/// weekly compliance under the floor.
pub fn should_deload(
    config: &EngineConfig,
    model: &PhysiologyModel<'_>,
    history: &[SessionResult],
    state: &FitnessFatigueState,
    baseline_max: Option<u32>,
) -> bool {
    if history.is_empty() {
        return false;
    }

    let z = state.readiness_z_score();
    if detect_plateau(config, history) && z < config.adaptation.fatigue_z {
        return true;
    }
    if check_underperformance(config, model, history, baseline_max) {
        return true;
    }
    weekly_compliance(history, 1) < config.adaptation.compliance_floor
}

/// Autoregulation of a base prescription from the readiness z-score.
///
/// Only active once the gate (enough completed non-TEST sessions) has
/// passed; before that the base prescription is returned untouched.
pub fn apply_autoregulation(
    config: &EngineConfig,
    base_sets: u32,
    base_reps: u32,
    z_score: f64,
    gate_passed: bool,
) -> (u32, u32) {
    if !gate_passed {
        return (base_sets, base_reps);
    }

    if z_score < config.adaptation.readiness_z_low {
        let reduced =
            (base_sets as f64 * (1.0 - config.volume.readiness_reduction)).floor() as u32;
        (reduced.max(3), base_reps)
    } else if z_score > config.adaptation.readiness_z_high {
        (base_sets, base_reps + 1)
    } else {
        (base_sets, base_reps)
    }
}

/// Whether the autoregulation gate has passed for this history:
/// at least `min_sessions_for_autoreg` completed non-TEST sessions.
pub fn autoregulation_gate(config: &EngineConfig, history: &[SessionResult]) -> bool {
    let completed = history
        .iter()
        .filter(|s| s.session_type.in_rotation() && !s.sets.is_empty())
        .count();
    completed >= config.adaptation.min_sessions_for_autoreg
}

/// Graduated overtraining severity over the trailing detection window
#[derive(Debug, Clone, PartialEq)]
pub struct OvertrainingSeverity {
    /// 0 = none, 1..3 graduated
    pub level: u8,

    /// Days the next plan start shifts forward; nonzero only at level 3
    pub extra_rest_days: i64,

    /// Non-REST sessions found in the window
    pub sessions: usize,

    /// Inclusive day count the sessions occupied
    pub span_days_inclusive: i64,

    pub description: String,
}

impl OvertrainingSeverity {
    pub fn none() -> Self {
        OvertrainingSeverity {
            level: 0,
            extra_rest_days: 0,
            sessions: 0,
            span_days_inclusive: 0,
            description: "No overtraining detected".to_string(),
        }
    }
}

/// Detect schedule compression in the trailing window ending at `today`.
///
/// n sessions at the configured cadence should occupy n * (7/days_per_week)
/// days; the shortfall against the actual span (REST records credited as
/// recovery days) grades into levels 1..3. The window conflates REST
/// records and training sessions by design: users who never log REST will
/// see the shortfall over-estimated.
pub fn overtraining_severity(
    config: &EngineConfig,
    exercise_history: &[SessionResult],
    days_per_week: u8,
    today: NaiveDate,
) -> OvertrainingSeverity {
    let window_start = today - chrono::Duration::days(config.adaptation.overtraining_window_days);

    let in_window: Vec<&SessionResult> = exercise_history
        .iter()
        .filter(|s| s.date > window_start && s.date <= today)
        .collect();

    let training: Vec<&SessionResult> = in_window
        .iter()
        .filter(|s| s.session_type.is_training())
        .copied()
        .collect();
    if training.is_empty() {
        return OvertrainingSeverity::none();
    }

    let first = training.iter().map(|s| s.date).min().unwrap();
    let last = training.iter().map(|s| s.date).max().unwrap();
    let span_days = (last - first).num_days();
    let rest_days = in_window
        .iter()
        .filter(|s| s.session_type == SessionType::Rest)
        .count() as i64;

    let n = training.len();
    let expected_days = n as f64 * (7.0 / days_per_week.max(1) as f64);
    let extra = (expected_days - (span_days + rest_days) as f64).round().max(0.0) as i64;

    let level: u8 = match extra {
        0 => 0,
        1 => 1,
        2..=3 => 2,
        _ => 3,
    };

    let severity = OvertrainingSeverity {
        level,
        extra_rest_days: if level >= 3 { extra } else { 0 },
        sessions: n,
        span_days_inclusive: span_days + 1,
        description: format!(
            "{} sessions in {} days (cadence allows {:.1} days)",
            n,
            span_days + 1,
            expected_days
        ),
    };

    if severity.level > 0 {
        tracing::debug!(
            level = severity.level,
            extra,
            sessions = n,
            "overtraining window compressed"
        );
    }

    severity
}

/// Weekly hard-set volume policy: deload and low readiness shrink the
/// budget, high readiness with good compliance grows it, both bounded.
pub fn volume_policy(
    config: &EngineConfig,
    base_weekly_sets: u32,
    deload: bool,
    z_score: f64,
    weekly_compliance_ratio: f64,
) -> u32 {
    let v = &config.volume;
    if deload {
        let reduced = (base_weekly_sets as f64 * (1.0 - v.deload_reduction)) as u32;
        return reduced.max(v.weekly_hard_sets_min);
    }
    if z_score < config.adaptation.readiness_z_low {
        let reduced = (base_weekly_sets as f64 * (1.0 - v.readiness_reduction)) as u32;
        return reduced.max(v.weekly_hard_sets_min);
    }
    if z_score > config.adaptation.readiness_z_high && weekly_compliance_ratio > 0.9 {
        let increased = (base_weekly_sets as f64 * (1.0 + v.increase_rate)) as u32;
        return increased.min(v.weekly_hard_sets_max);
    }
    base_weekly_sets
}

/// Build the full training status for one exercise's history.
///
/// `history` is this exercise's records including REST markers; the state
/// machine skips them during replay.
pub fn training_status(
    config: &EngineConfig,
    exercise: &ExerciseDefinition,
    history: &[SessionResult],
    current_bodyweight_kg: f64,
    baseline_max: Option<u32>,
) -> TrainingStatus {
    let model = PhysiologyModel::new(config, exercise, current_bodyweight_kg, history);
    let state = model.build_state(history, baseline_max);

    let test_max = latest_test_max(history).filter(|&m| m > 0).or(baseline_max);
    let training_max = match test_max {
        Some(m) => training_max_from(config, m),
        None => 1,
    };

    let trend_slope = trend_slope_per_week(history, config.adaptation.trend_window_days);
    let is_plateau = detect_plateau(config, history);
    let deload_recommended = should_deload(config, &model, history, &state, baseline_max);
    let compliance_ratio = if history.is_empty() {
        1.0
    } else {
        weekly_compliance(history, 1)
    };

    TrainingStatus {
        training_max,
        latest_test_max: test_max,
        trend_slope,
        is_plateau,
        deload_recommended,
        compliance_ratio,
        readiness_z_score: state.readiness_z_score(),
        fitness: state.fitness,
        fatigue: state.fatigue,
        state,
    }
}
