//! One-rep-max estimation over logged sessions.
//!
//! The best loaded set in recent history is evaluated with several
//! established formulas; a rep-range-aware recommendation picks the one
//! most representative for the observed rep count. Loads are handled as
//! decimals so reported kilograms stay exact.

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::exercises::{ExerciseDefinition, LoadType};
use crate::models::SessionResult;

/// Sessions scanned backwards from the end of history
const SCAN_WINDOW_SESSIONS: usize = 10;

/// Reps beyond which the blended estimate is not defined
const BLENDED_MAX_REPS: u32 = 20;

/// All formula outputs for one best set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneRmFormulas {
    pub epley: Decimal,
    /// Undefined at 37+ reps
    pub brzycki: Option<Decimal>,
    pub lander: Option<Decimal>,
    pub lombardi: Decimal,
    /// Rep-range weighted combination; undefined above 20 reps
    pub blended: Option<Decimal>,
}

/// Result of a 1RM estimation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneRmEstimate {
    pub best_date: NaiveDate,
    pub best_reps: u32,
    pub best_added_weight_kg: Decimal,
    /// Total load the formulas were applied to
    pub effective_load_kg: Decimal,
    pub bw_fraction: f64,
    pub includes_bodyweight: bool,
    pub formulas: OneRmFormulas,
    pub recommended_formula: String,
}

fn dec(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

/// Epley: load * (1 + r/30), computed as load * (30 + r) / 30 so that
/// whole-kg inputs stay exact
pub fn epley(load_kg: Decimal, reps: u32) -> Decimal {
    if reps == 0 {
        return Decimal::ZERO;
    }
    load_kg * Decimal::from(30 + reps) / Decimal::from(30)
}

/// Brzycki: load * 36 / (37 - r), undefined at 37+ reps
pub fn brzycki(load_kg: Decimal, reps: u32) -> Option<Decimal> {
    if reps == 0 || reps >= 37 {
        return None;
    }
    Some(load_kg * Decimal::from(36) / Decimal::from(37 - reps))
}

/// Lander: 100 * load / (101.3 - 2.67123 * r)
pub fn lander(load_kg: Decimal, reps: u32) -> Option<Decimal> {
    if reps == 0 {
        return None;
    }
    let denominator = dec(101.3) - dec(2.67123) * Decimal::from(reps);
    if denominator <= Decimal::ZERO {
        return None;
    }
    Some(Decimal::from(100) * load_kg / denominator)
}

/// Lombardi: load * r^0.10
pub fn lombardi(load_kg: Decimal, reps: u32) -> Decimal {
    if reps == 0 {
        return Decimal::ZERO;
    }
    let factor = (reps as f64).powf(0.10);
    load_kg * dec(factor)
}

/// Rep-range weighted combination: the low-rep pair (Brzycki/Lander) below
/// 11 reps, the high-rep pair (Epley/Lombardi) from 11 to 20, undefined
/// beyond.
pub fn blended(load_kg: Decimal, reps: u32) -> Option<Decimal> {
    if reps == 0 || reps > BLENDED_MAX_REPS {
        return None;
    }
    let two = Decimal::from(2);
    if reps <= 10 {
        let b = brzycki(load_kg, reps)?;
        let l = lander(load_kg, reps)?;
        Some((b + l) / two)
    } else {
        Some((epley(load_kg, reps) + lombardi(load_kg, reps)) / two)
    }
}

/// The formula most representative for a given rep count
pub fn recommended_formula(reps: u32) -> &'static str {
    if reps <= 10 {
        "brzycki"
    } else if reps <= BLENDED_MAX_REPS {
        "blended"
    } else {
        "epley"
    }
}

/// Scan recent history for the best loaded set and evaluate all formulas.
///
/// The "best" set maximises the Epley estimate of its effective load. For
/// external-only exercises bodyweight is excluded and only weighted sets
/// qualify; otherwise every completed set qualifies with
/// load = bw * bw_fraction + added.
pub fn estimate_1rm(
    exercise: &ExerciseDefinition,
    current_bodyweight_kg: f64,
    history: &[SessionResult],
) -> Option<OneRmEstimate> {
    let recent = history
        .iter()
        .rev()
        .take(SCAN_WINDOW_SESSIONS)
        .collect::<Vec<_>>();

    let mut best: Option<(NaiveDate, u32, f64, Decimal)> = None;

    for session in recent {
        for set in &session.sets {
            if set.reps == 0 {
                continue;
            }
            let effective = match exercise.load_type {
                LoadType::ExternalOnly => {
                    if set.weight_kg <= 0.0 {
                        continue;
                    }
                    set.weight_kg
                }
                LoadType::BwPlusExternal => {
                    session.bodyweight_kg * exercise.bw_fraction + set.weight_kg
                }
            };
            let candidate = epley(dec(effective), set.reps);
            let better = match &best {
                Some((_, _, _, current)) => candidate > *current,
                None => true,
            };
            if better {
                best = Some((session.date, set.reps, set.weight_kg, dec(effective)));
            }
        }
    }

    let (best_date, best_reps, best_added, effective_load) = best?;

    let formulas = OneRmFormulas {
        epley: round_kg(epley(effective_load, best_reps)),
        brzycki: brzycki(effective_load, best_reps).map(round_kg),
        lander: lander(effective_load, best_reps).map(round_kg),
        lombardi: round_kg(lombardi(effective_load, best_reps)),
        blended: blended(effective_load, best_reps).map(round_kg),
    };

    Some(OneRmEstimate {
        best_date,
        best_reps,
        best_added_weight_kg: round_kg(dec(best_added)),
        effective_load_kg: round_kg(effective_load),
        bw_fraction: exercise.bw_fraction,
        includes_bodyweight: exercise.onerm_includes_bodyweight,
        formulas,
        recommended_formula: recommended_formula(best_reps).to_string(),
    })
}

fn round_kg(value: Decimal) -> Decimal {
    value.round_dp(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::get_exercise;
    use crate::models::{CompletedSet, SessionType};
    use rust_decimal_macros::dec as d;

    fn session(date_str: &str, sets: &[(u32, f64)]) -> SessionResult {
        SessionResult {
            date: date_str.parse().unwrap(),
            exercise_id: "pull_up".to_string(),
            session_type: SessionType::S,
            variant: "pronated".to_string(),
            bodyweight_kg: 82.0,
            sets: sets
                .iter()
                .map(|&(reps, weight_kg)| CompletedSet { reps, weight_kg, rest_s: 180, rir: None })
                .collect(),
            planned_sets: None,
            equipment: None,
            rir: None,
            notes: None,
        }
    }

    #[test]
    fn test_epley_single_rep_is_identity_plus_fraction() {
        // 1 rep: load * 31/30
        let result = epley(d!(90), 1);
        assert_eq!(result, d!(93));
    }

    #[test]
    fn test_epley_zero_reps() {
        assert_eq!(epley(d!(90), 0), Decimal::ZERO);
    }

    #[test]
    fn test_brzycki_low_reps_close_to_epley() {
        let load = d!(90);
        let e = epley(load, 5);
        let b = brzycki(load, 5).unwrap();
        let diff = (e - b).abs();
        assert!(diff < d!(5), "epley {e} vs brzycki {b}");
    }

    #[test]
    fn test_brzycki_undefined_at_37() {
        assert!(brzycki(d!(90), 37).is_none());
    }

    #[test]
    fn test_blended_rep_ranges() {
        let load = d!(90);
        assert!(blended(load, 8).is_some());
        assert!(blended(load, 15).is_some());
        assert!(blended(load, 21).is_none());
    }

    #[test]
    fn test_recommended_formula_bands() {
        assert_eq!(recommended_formula(5), "brzycki");
        assert_eq!(recommended_formula(15), "blended");
        assert_eq!(recommended_formula(25), "epley");
    }

    #[test]
    fn test_estimate_picks_heaviest_set() {
        let exercise = get_exercise("pull_up").unwrap();
        let history = vec![
            session("2026-02-02", &[(8, 0.0)]),
            session("2026-02-04", &[(5, 10.0), (5, 0.0)]),
        ];
        let est = estimate_1rm(&exercise, 82.0, &history).unwrap();
        assert_eq!(est.best_reps, 5);
        assert_eq!(est.best_added_weight_kg, d!(10.0));
        // 82*1.0 + 10 = 92 kg effective
        assert_eq!(est.effective_load_kg, d!(92.0));
        assert!(est.includes_bodyweight);
    }

    #[test]
    fn test_estimate_external_only_requires_weight() {
        let exercise = get_exercise("bss").unwrap();
        let bw_only = vec![session("2026-02-02", &[(12, 0.0)])];
        assert!(estimate_1rm(&exercise, 82.0, &bw_only).is_none());

        let weighted = vec![session("2026-02-02", &[(12, 40.0)])];
        let est = estimate_1rm(&exercise, 82.0, &weighted).unwrap();
        // Bodyweight excluded for external-only loading
        assert_eq!(est.effective_load_kg, d!(40.0));
        assert!(!est.includes_bodyweight);
    }

    #[test]
    fn test_estimate_empty_history() {
        let exercise = get_exercise("pull_up").unwrap();
        assert!(estimate_1rm(&exercise, 82.0, &[]).is_none());
    }

    #[test]
    fn test_dip_effective_load_uses_bw_fraction() {
        let exercise = get_exercise("dip").unwrap();
        let mut s = session("2026-02-02", &[(1, 30.0)]);
        s.exercise_id = "dip".to_string();
        let est = estimate_1rm(&exercise, 82.0, &[s]).unwrap();
        // 0.92*82 + 30 = 105.44 → 105.4
        assert_eq!(est.effective_load_kg, d!(105.4));
    }
}
