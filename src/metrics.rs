//! Pure normalization and aggregation functions over sets and sessions.
//!
//! Everything here is a total function of its inputs: no I/O, no failure
//! paths. Out-of-range inputs saturate or clamp.

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::models::{SessionResult, SessionType};

/// Rest normalization factor F_rest(r) = clamp((max(r, 30)/180)^0.20, 0.80, 1.05).
///
/// Below-reference rest yields a factor < 1, so short-rest reps are credited
/// as harder work by [`effective_reps`].
pub fn rest_factor(config: &EngineConfig, rest_seconds: u32) -> f64 {
    let r = rest_seconds.max(config.rest.min_clamp) as f64;
    let raw = (r / config.rest.ref_seconds as f64).powf(config.rest.gamma);
    raw.clamp(config.rest.factor_min, config.rest.factor_max)
}

/// Rest-normalized reps: reps* = reps / F_rest(rest)
pub fn effective_reps(config: &EngineConfig, reps: u32, rest_seconds: u32) -> f64 {
    reps as f64 / rest_factor(config, rest_seconds)
}

/// Relative load of a set against reference conditions.
///
/// For bodyweight-loaded exercises:
///   L_rel = (bw * bw_fraction + added) / (bw_ref * bw_fraction)
/// For external-only loading (bw_fraction = 0):
///   L_rel = (added + eps) / (added_ref + eps)
pub fn relative_load(
    config: &EngineConfig,
    bodyweight_kg: f64,
    added_kg: f64,
    reference_bodyweight_kg: f64,
    reference_added_kg: f64,
    bw_fraction: f64,
) -> f64 {
    if bw_fraction > 0.0 && reference_bodyweight_kg > 0.0 {
        (bodyweight_kg * bw_fraction + added_kg) / (reference_bodyweight_kg * bw_fraction)
    } else {
        let eps = config.training_load.epsilon_load;
        (added_kg + eps) / (reference_added_kg + eps)
    }
}

/// Bodyweight-normalized reps: reps** = reps* * L_rel^gamma_bw
#[allow(clippy::too_many_arguments)]
pub fn bodyweight_normalized_reps(
    config: &EngineConfig,
    reps_star: f64,
    bodyweight_kg: f64,
    added_kg: f64,
    reference_bodyweight_kg: f64,
    reference_added_kg: f64,
    bw_fraction: f64,
) -> f64 {
    let l_rel = relative_load(
        config,
        bodyweight_kg,
        added_kg,
        reference_bodyweight_kg,
        reference_added_kg,
        bw_fraction,
    );
    reps_star * l_rel.powf(config.training_load.gamma_bw)
}

/// Variant-normalized reps: reps** * factor
pub fn variant_normalized(reps_double_star: f64, factor: f64) -> f64 {
    reps_double_star * factor
}

/// Fully standardized reps: rest, bodyweight and variant normalization composed
#[allow(clippy::too_many_arguments)]
pub fn standardized_reps(
    config: &EngineConfig,
    reps: u32,
    rest_seconds: u32,
    bodyweight_kg: f64,
    added_kg: f64,
    reference_bodyweight_kg: f64,
    reference_added_kg: f64,
    bw_fraction: f64,
    variant_factor: f64,
) -> f64 {
    let rest_norm = effective_reps(config, reps, rest_seconds);
    let bw_norm = bodyweight_normalized_reps(
        config,
        rest_norm,
        bodyweight_kg,
        added_kg,
        reference_bodyweight_kg,
        reference_added_kg,
        bw_fraction,
    );
    variant_normalized(bw_norm, variant_factor)
}

/// Best reps across bodyweight-only completed sets, 0 when there are none
pub fn session_max_bw_only(session: &SessionResult) -> u32 {
    session
        .sets
        .iter()
        .filter(|s| s.bodyweight_only())
        .map(|s| s.reps)
        .max()
        .unwrap_or(0)
}

/// Sum of reps across all completed sets
pub fn session_total_reps(session: &SessionResult) -> u32 {
    session.sets.iter().map(|s| s.reps).sum()
}

/// Mean rest across completed sets, in seconds
pub fn session_avg_rest(session: &SessionResult) -> f64 {
    if session.sets.is_empty() {
        return 0.0;
    }
    session.sets.iter().map(|s| s.rest_s as f64).sum::<f64>() / session.sets.len() as f64
}

/// Within-session drop-off: 1 - mean(last two sets' reps) / first set reps.
///
/// Sessions with fewer than 3 sets have no meaningful tail; treated as 0.
pub fn drop_off(session: &SessionResult) -> f64 {
    if session.sets.len() < 3 {
        return 0.0;
    }
    let first = session.sets[0].reps;
    if first == 0 {
        return 0.0;
    }
    let tail = &session.sets[session.sets.len() - 2..];
    let mean_last = tail.iter().map(|s| s.reps as f64).sum::<f64>() / 2.0;
    1.0 - mean_last / first as f64
}

/// TEST sessions in chronological history order
pub fn test_sessions<'a>(history: &'a [SessionResult]) -> Vec<&'a SessionResult> {
    history
        .iter()
        .filter(|s| s.session_type == SessionType::Test)
        .collect()
}

/// Max reps of the most recent TEST session, if any
pub fn latest_test_max(history: &[SessionResult]) -> Option<u32> {
    test_sessions(history).last().map(|&s| session_max_bw_only(s))
}

/// Best TEST max ever recorded
pub fn overall_max_reps(history: &[SessionResult]) -> u32 {
    test_sessions(history)
        .iter()
        .map(|&s| session_max_bw_only(s))
        .max()
        .unwrap_or(0)
}

/// Training max: max(1, floor(tm_factor * latest_test_max))
pub fn training_max_from(config: &EngineConfig, latest_test_max: u32) -> u32 {
    let tm = (latest_test_max as f64 * config.adaptation.tm_factor).floor() as u32;
    tm.max(1)
}

/// Estimated RIR from the rep fraction of the estimated max:
/// clamp(m_hat - reps, 0, 5)
pub fn estimate_rir(reps: u32, m_hat: f64) -> u8 {
    (m_hat.round() as i64 - reps as i64).clamp(0, 5) as u8
}

/// Ordinary least-squares fit over (day_index, reps) points.
///
/// Returns (intercept, slope_per_day); a single point has slope 0.
pub fn linear_trend(points: &[(i64, u32)]) -> (f64, f64) {
    match points.len() {
        0 => return (0.0, 0.0),
        1 => return (points[0].1 as f64, 0.0),
        _ => {}
    }

    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|p| p.0 as f64).sum();
    let sum_y: f64 = points.iter().map(|p| p.1 as f64).sum();
    let sum_xy: f64 = points.iter().map(|p| p.0 as f64 * p.1 as f64).sum();
    let sum_x2: f64 = points.iter().map(|p| (p.0 as f64).powi(2)).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() < 1e-10 {
        return (sum_y / n, 0.0);
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    (intercept, slope)
}

/// OLS slope in reps per week over the TEST sessions inside the window
/// ending at the latest TEST date. Fewer than 2 in-window points yield 0.
pub fn trend_slope_per_week(history: &[SessionResult], window_days: i64) -> f64 {
    let tests = test_sessions(history);
    if tests.len() < 2 {
        return 0.0;
    }

    let latest = tests[tests.len() - 1].date;
    let cutoff = latest - chrono::Duration::days(window_days);
    let in_window: Vec<&SessionResult> = tests.into_iter().filter(|s| s.date >= cutoff).collect();
    if in_window.len() < 2 {
        return 0.0;
    }

    let base = in_window[0].date;
    let points: Vec<(i64, u32)> = in_window
        .iter()
        .map(|&s| ((s.date - base).num_days(), session_max_bw_only(s)))
        .collect();

    let (_, slope_per_day) = linear_trend(&points);
    slope_per_day * 7.0
}

/// Session compliance: actual total reps / frozen prescription total reps.
///
/// A session without a frozen prescription is trivially compliant (1.0).
pub fn compliance(session: &SessionResult) -> f64 {
    let planned_total: u32 = session
        .planned_sets
        .as_ref()
        .map(|sets| sets.iter().map(|s| s.reps).sum())
        .unwrap_or(0);
    if planned_total == 0 {
        return 1.0;
    }
    session_total_reps(session) as f64 / planned_total as f64
}

/// Mean session compliance over the last `weeks_back * 7` days of history
pub fn weekly_compliance(history: &[SessionResult], weeks_back: i64) -> f64 {
    let Some(latest) = history.last().map(|s| s.date) else {
        return 1.0;
    };
    let cutoff: NaiveDate = latest - chrono::Duration::days(weeks_back * 7);

    let ratios: Vec<f64> = history
        .iter()
        .filter(|s| s.date >= cutoff && s.session_type.is_training())
        .map(compliance)
        .collect();

    if ratios.is_empty() {
        return 1.0;
    }
    ratios.iter().sum::<f64>() / ratios.len() as f64
}
