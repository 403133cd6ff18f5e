//! Between-test max inference ("Track B").
//!
//! Two independent estimates from any completed multi-set session:
//!
//! - **FI method**: the within-session fatigue index FI = 1 − mean(R₂…Rₙ)/R₁
//!   characterises how close to failure the first set was. The first set is
//!   corrected for incomplete phosphocreatine recovery and scaled up when FI
//!   shows a large reserve.
//! - **Nuzzo method**: a repetitions~%1RM meta-regression table, inverted.
//!   With a fixed bodyweight load, %1RM capacity maps onto the fresh
//!   single-set max: est = r̂ / pct_1rm(r̂).
//!
//! Both are returned for display next to past timeline entries; neither
//! feeds back into the state machine.

use crate::models::{EstimateConfidence, MaxEstimate, SessionResult};

/// Repetitions~%1RM reference points: (%1RM, reps to failure)
const REPS_PCT_1RM_TABLE: [(f64, f64); 11] = [
    (100.0, 1.0),
    (95.0, 3.0),
    (90.0, 5.3),
    (85.0, 7.7),
    (80.0, 11.0),
    (75.0, 13.4),
    (70.0, 17.0),
    (65.0, 21.0),
    (60.0, 25.0),
    (55.0, 29.7),
    (50.0, 35.0),
];

/// PCr resynthesis fraction by rest duration: (rest seconds, fraction)
const PCR_RECOVERY_TABLE: [(f64, f64); 9] = [
    (0.0, 0.00),
    (10.0, 0.25),
    (30.0, 0.50),
    (60.0, 0.75),
    (90.0, 0.87),
    (120.0, 0.93),
    (180.0, 0.97),
    (240.0, 0.99),
    (300.0, 1.00),
];

/// FI at or above which the lifter is assumed to have trained to failure
const FI_FULL_EFFORT: f64 = 0.35;

/// Assumed recovery before a session's first set when no rest was logged
const DEFAULT_FIRST_REST_S: f64 = 180.0;

/// Linear interpolation of the PCr recovery fraction for a rest duration
fn pcr_recovery_factor(rest_seconds: f64) -> f64 {
    if rest_seconds <= 0.0 {
        return 0.0;
    }
    let last = PCR_RECOVERY_TABLE[PCR_RECOVERY_TABLE.len() - 1];
    if rest_seconds >= last.0 {
        return 1.0;
    }
    for window in PCR_RECOVERY_TABLE.windows(2) {
        let (t0, f0) = window[0];
        let (t1, f1) = window[1];
        if rest_seconds >= t0 && rest_seconds <= t1 {
            let alpha = (rest_seconds - t0) / (t1 - t0);
            return f0 + alpha * (f1 - f0);
        }
    }
    1.0
}

/// Inverse table lookup: reps-to-failure → %1RM as a fraction (0..1].
///
/// Linear interpolation between adjacent rows; beyond the table the last
/// segment's slope extrapolates, floored at 0.1%.
fn reps_to_pct_1rm(reps_to_failure: f64) -> f64 {
    if reps_to_failure <= REPS_PCT_1RM_TABLE[0].1 {
        return 1.0;
    }
    for window in REPS_PCT_1RM_TABLE.windows(2) {
        let (pct0, r0) = window[0];
        let (pct1, r1) = window[1];
        if reps_to_failure >= r0 && reps_to_failure <= r1 {
            let alpha = (reps_to_failure - r0) / (r1 - r0);
            return (pct0 + alpha * (pct1 - pct0)) / 100.0;
        }
    }
    let (pct_last, r_last) = REPS_PCT_1RM_TABLE[REPS_PCT_1RM_TABLE.len() - 1];
    let (pct_prev, r_prev) = REPS_PCT_1RM_TABLE[REPS_PCT_1RM_TABLE.len() - 2];
    let slope = (pct_last - pct_prev) / (r_last - r_prev);
    ((pct_last + slope * (reps_to_failure - r_last)) / 100.0).max(0.001)
}

/// Estimate the fresh max from a completed non-TEST session.
///
/// Requires at least 2 sets with reps > 0; returns `None` otherwise.
pub fn estimate_from_session(session: &SessionResult) -> Option<MaxEstimate> {
    let valid: Vec<(u32, u32, Option<u8>)> = session
        .sets
        .iter()
        .filter(|s| s.reps > 0)
        .map(|s| (s.reps, s.rest_s, s.rir))
        .collect();

    if valid.len() < 2 {
        return None;
    }

    let r1 = valid[0].0;
    let rest_before_r1 = valid[0].1;

    // FI over the subsequent sets
    let subsequent: Vec<u32> = valid[1..].iter().map(|v| v.0).collect();
    let mean_subsequent = subsequent.iter().sum::<u32>() as f64 / subsequent.len() as f64;
    let fi = if r1 > 0 {
        (1.0 - mean_subsequent / r1 as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };

    // Correct set 1 for incomplete recovery. rest 0 means "first set of the
    // session", assumed adequately warmed up. The factor is floored at 0.5
    // so the correction never more than doubles the observed reps.
    let effective_rest = if rest_before_r1 > 0 {
        rest_before_r1 as f64
    } else {
        DEFAULT_FIRST_REST_S
    };
    let pcr = pcr_recovery_factor(effective_rest).max(0.5);
    let adjusted_r1 = r1 as f64 / pcr;

    let fi_adjustment = (FI_FULL_EFFORT - fi).max(0.0) * 0.6;
    let fi_est = (adjusted_r1 * (1.0 + fi_adjustment)).round() as u32;

    // Nuzzo method on the session's best set
    let max_reps = valid.iter().map(|v| v.0).max().unwrap_or(r1);
    let rir = valid[0]
        .2
        .map(|r| r as f64)
        .unwrap_or_else(|| ((FI_FULL_EFFORT - fi) * 8.0).round().max(0.0));
    let reps_to_failure = max_reps as f64 + rir;
    let pct = reps_to_pct_1rm(reps_to_failure);
    let nuzzo_est = if pct > 0.0 {
        (reps_to_failure / pct).round() as u32
    } else {
        reps_to_failure.round() as u32
    };

    let rir_known = valid.iter().any(|v| v.2.is_some());
    let confidence = if valid.len() >= 4 && rir_known {
        EstimateConfidence::High
    } else if valid.len() >= 2 {
        EstimateConfidence::Medium
    } else {
        EstimateConfidence::Low
    };

    Some(MaxEstimate {
        fi_est,
        nuzzo_est,
        fi: (fi * 1000.0).round() / 1000.0,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompletedSet, SessionResult, SessionType};

    fn session_with(sets: &[(u32, u32, Option<u8>)]) -> SessionResult {
        SessionResult {
            date: "2026-02-10".parse().unwrap(),
            exercise_id: "pull_up".to_string(),
            session_type: SessionType::H,
            variant: "pronated".to_string(),
            bodyweight_kg: 82.0,
            sets: sets
                .iter()
                .map(|&(reps, rest_s, rir)| CompletedSet { reps, weight_kg: 0.0, rest_s, rir })
                .collect(),
            planned_sets: None,
            equipment: None,
            rir: None,
            notes: None,
        }
    }

    #[test]
    fn test_pcr_table_anchors() {
        assert_eq!(pcr_recovery_factor(0.0), 0.0);
        assert!((pcr_recovery_factor(60.0) - 0.75).abs() < 1e-9);
        assert!((pcr_recovery_factor(180.0) - 0.97).abs() < 1e-9);
        assert_eq!(pcr_recovery_factor(300.0), 1.0);
        assert_eq!(pcr_recovery_factor(900.0), 1.0);
    }

    #[test]
    fn test_pcr_interpolates_between_anchors() {
        // Midway between 30 s (0.50) and 60 s (0.75)
        assert!((pcr_recovery_factor(45.0) - 0.625).abs() < 1e-9);
    }

    #[test]
    fn test_pct_1rm_anchors() {
        assert!((reps_to_pct_1rm(1.0) - 1.0).abs() < 1e-9);
        assert!((reps_to_pct_1rm(5.3) - 0.90).abs() < 1e-9);
        assert!((reps_to_pct_1rm(35.0) - 0.50).abs() < 1e-9);
    }

    #[test]
    fn test_pct_1rm_interpolates() {
        // Midway between 3 reps (95%) and 5.3 reps (90%)
        let pct = reps_to_pct_1rm(4.15);
        assert!((pct - 0.925).abs() < 1e-3);
    }

    #[test]
    fn test_pct_1rm_extrapolates_below_table() {
        let pct = reps_to_pct_1rm(40.0);
        assert!(pct < 0.50);
        assert!(pct >= 0.001);
    }

    #[test]
    fn test_estimate_requires_two_sets() {
        let single = session_with(&[(8, 0, None)]);
        assert!(estimate_from_session(&single).is_none());

        let with_zero = session_with(&[(8, 0, None), (0, 120, None)]);
        assert!(estimate_from_session(&with_zero).is_none());
    }

    #[test]
    fn test_estimate_near_failure_session() {
        // 8, 5, 4 with full rest: FI = 1 - 4.5/8 = 0.4375 → no reserve scaling
        let s = session_with(&[(8, 0, Some(1)), (5, 180, Some(1)), (4, 180, Some(0))]);
        let est = estimate_from_session(&s).unwrap();
        // R1 corrected only by the default-first-rest PCr factor (0.97)
        assert_eq!(est.fi_est, (8.0_f64 / 0.97).round() as u32);
        assert!(est.fi > FI_FULL_EFFORT);
        // r̂ = 8 + 1 = 9 → between 85% and 80% → ≈ 11
        assert_eq!(est.nuzzo_est, 11);
    }

    #[test]
    fn test_estimate_large_reserve_scales_up() {
        // Flat 6,6,6: FI = 0 → maximum reserve adjustment (×1.21)
        let s = session_with(&[(6, 0, None), (6, 180, None), (6, 180, None)]);
        let est = estimate_from_session(&s).unwrap();
        assert!(est.fi_est > 6);
        assert_eq!(est.fi, 0.0);
        // Estimated RIR = round(0.35*8) = 3 → r̂ = 9
        assert!(est.nuzzo_est >= 10);
    }

    #[test]
    fn test_confidence_grading() {
        let four_sets_rir =
            session_with(&[(8, 0, Some(2)), (7, 120, Some(2)), (6, 120, Some(1)), (6, 120, Some(1))]);
        assert_eq!(
            estimate_from_session(&four_sets_rir).unwrap().confidence,
            EstimateConfidence::High
        );

        let two_sets = session_with(&[(8, 0, None), (6, 120, None)]);
        assert_eq!(
            estimate_from_session(&two_sets).unwrap().confidence,
            EstimateConfidence::Medium
        );
    }

    #[test]
    fn test_short_first_rest_inflates_estimate() {
        let fresh = session_with(&[(8, 0, Some(2)), (6, 120, Some(2))]);
        let rushed = session_with(&[(8, 45, Some(2)), (6, 120, Some(2))]);
        let est_fresh = estimate_from_session(&fresh).unwrap();
        let est_rushed = estimate_from_session(&rushed).unwrap();
        assert!(est_rushed.fi_est > est_fresh.fi_est);
    }
}
