//! Exercise definitions and the built-in registry.
//!
//! An [`ExerciseDefinition`] parameterises the shared planning engine: load
//! model, variant rotation, per-session-type prescription bounds, test
//! cadence and the added-weight rule. The same planner code serves pull-ups,
//! dips and Bulgarian split squats through these tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{BarplanError, Result};
use crate::models::SessionType;

/// How the working load is composed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    /// Bodyweight is the base load; external weight can be added (pull-up, dip)
    BwPlusExternal,
    /// External load only; bodyweight excluded from the 1RM (BSS with dumbbells)
    ExternalOnly,
}

/// What the user's target is denominated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMetric {
    MaxReps,
    OneRmKg,
}

/// Prescription bounds for one session type within an exercise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionTypeParams {
    /// Lower rep bound as a fraction of TM
    pub reps_fraction_low: f64,
    /// Upper rep bound as a fraction of TM
    pub reps_fraction_high: f64,
    /// Absolute minimum reps per set
    pub reps_min: u32,
    /// Absolute maximum reps per set
    pub reps_max: u32,
    pub sets_min: u32,
    pub sets_max: u32,
    /// Rest bounds in seconds
    pub rest_min: u32,
    pub rest_max: u32,
    /// Reps-in-reserve target
    pub rir_target: u8,
}

/// Full configuration for one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDefinition {
    pub exercise_id: String,
    pub display_name: String,

    /// e.g. "upper_pull", "upper_push", "lower"
    pub muscle_group: String,

    /// Portion of bodyweight displaced by the movement (0..=1)
    pub bw_fraction: f64,
    pub load_type: LoadType,

    /// All recognised variant names; the first is conventionally primary
    pub variants: Vec<String>,

    /// Variant used for standardised testing
    pub primary_variant: String,

    /// Performance normalization factor per variant (≈1.0)
    pub variant_factors: BTreeMap<String, f64>,

    /// Stress multiplier per variant used in the training-load impulse
    pub variant_stress: BTreeMap<String, f64>,

    /// Whether sessions rotate through variants
    pub has_variant_rotation: bool,

    /// Rotation cycle per session type; types absent here use the primary
    pub variant_cycles: BTreeMap<SessionType, Vec<String>>,

    pub session_params: BTreeMap<SessionType, SessionTypeParams>,

    pub target_metric: TargetMetric,
    pub target_value: f64,

    /// Recommended interval between TEST sessions
    pub test_frequency_weeks: u32,

    pub onerm_includes_bodyweight: bool,

    /// Fraction of effective bodyweight added per TM point above threshold
    pub weight_increment_fraction: f64,
    /// TM must exceed this before weight is added; 999 disables
    pub weight_tm_threshold: u32,
    /// Absolute cap on prescribed added weight
    pub max_added_weight_kg: f64,
}

impl ExerciseDefinition {
    /// Params for a session type. Every built-in definition covers all
    /// training types; REST has no prescription.
    pub fn params(&self, session_type: SessionType) -> Result<&SessionTypeParams> {
        self.session_params.get(&session_type).ok_or_else(|| {
            BarplanError::Inconsistent(format!(
                "exercise {} has no parameters for session type {}",
                self.exercise_id, session_type
            ))
        })
    }

    /// Rotation cycle for a session type, defaulting to the primary variant
    pub fn cycle(&self, session_type: SessionType) -> Vec<String> {
        self.variant_cycles
            .get(&session_type)
            .cloned()
            .unwrap_or_else(|| vec![self.primary_variant.clone()])
    }

    pub fn variant_factor(&self, variant: &str) -> f64 {
        self.variant_factors.get(variant).copied().unwrap_or(1.0)
    }

    pub fn variant_stress_factor(&self, variant: &str) -> f64 {
        self.variant_stress.get(variant).copied().unwrap_or(1.0)
    }

    pub fn is_valid_variant(&self, variant: &str) -> bool {
        self.variants.iter().any(|v| v == variant)
    }
}

fn cycles(
    entries: &[(SessionType, &[&str])],
) -> BTreeMap<SessionType, Vec<String>> {
    entries
        .iter()
        .map(|(t, vs)| (*t, vs.iter().map(|v| v.to_string()).collect()))
        .collect()
}

fn factor_map(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries.iter().map(|(v, f)| (v.to_string(), *f)).collect()
}

fn pull_up() -> ExerciseDefinition {
    ExerciseDefinition {
        exercise_id: "pull_up".to_string(),
        display_name: "Pull-Up".to_string(),
        muscle_group: "upper_pull".to_string(),

        // Near-100% of bodyweight is displaced during a strict pull-up.
        bw_fraction: 1.0,
        load_type: LoadType::BwPlusExternal,

        variants: vec![
            "pronated".to_string(),
            "neutral".to_string(),
            "supinated".to_string(),
        ],
        primary_variant: "pronated".to_string(),
        variant_factors: factor_map(&[
            ("pronated", 1.00),
            ("neutral", 1.00),
            ("supinated", 1.00),
        ]),
        variant_stress: factor_map(&[
            ("pronated", 1.00),
            ("neutral", 0.95),
            ("supinated", 1.05),
        ]),

        has_variant_rotation: true,
        variant_cycles: cycles(&[
            (SessionType::S, &["pronated", "neutral", "supinated"]),
            (SessionType::H, &["pronated", "neutral", "supinated"]),
            (SessionType::T, &["pronated", "neutral"]),
            (SessionType::E, &["pronated"]),
            (SessionType::Test, &["pronated"]),
        ]),

        session_params: BTreeMap::from([
            (
                SessionType::S,
                SessionTypeParams {
                    reps_fraction_low: 0.35,
                    reps_fraction_high: 0.55,
                    reps_min: 4,
                    reps_max: 6,
                    sets_min: 4,
                    sets_max: 5,
                    rest_min: 180,
                    rest_max: 300,
                    rir_target: 2,
                },
            ),
            (
                SessionType::H,
                SessionTypeParams {
                    reps_fraction_low: 0.60,
                    reps_fraction_high: 0.85,
                    reps_min: 6,
                    reps_max: 12,
                    sets_min: 4,
                    sets_max: 6,
                    rest_min: 120,
                    rest_max: 180,
                    rir_target: 2,
                },
            ),
            (
                SessionType::E,
                SessionTypeParams {
                    reps_fraction_low: 0.40,
                    reps_fraction_high: 0.60,
                    reps_min: 3,
                    reps_max: 8,
                    sets_min: 6,
                    sets_max: 10,
                    rest_min: 45,
                    rest_max: 75,
                    rir_target: 3,
                },
            ),
            (
                SessionType::T,
                SessionTypeParams {
                    reps_fraction_low: 0.20,
                    reps_fraction_high: 0.40,
                    reps_min: 2,
                    reps_max: 4,
                    sets_min: 4,
                    sets_max: 8,
                    rest_min: 60,
                    rest_max: 120,
                    rir_target: 5,
                },
            ),
            (
                SessionType::Test,
                SessionTypeParams {
                    reps_fraction_low: 1.0,
                    reps_fraction_high: 1.0,
                    reps_min: 1,
                    reps_max: 50,
                    sets_min: 1,
                    sets_max: 1,
                    rest_min: 180,
                    rest_max: 300,
                    rir_target: 0,
                },
            ),
        ]),

        target_metric: TargetMetric::MaxReps,
        target_value: 30.0,
        test_frequency_weeks: 3,
        onerm_includes_bodyweight: true,

        weight_increment_fraction: 0.01,
        weight_tm_threshold: 9,
        max_added_weight_kg: 20.0,
    }
}

fn dip() -> ExerciseDefinition {
    ExerciseDefinition {
        exercise_id: "dip".to_string(),
        display_name: "Parallel Bar Dip".to_string(),
        muscle_group: "upper_push".to_string(),

        // ~92% of bodyweight is lifted; hands and forearms stay on the bars.
        bw_fraction: 0.92,
        load_type: LoadType::BwPlusExternal,

        variants: vec![
            "standard".to_string(),
            "chest_lean".to_string(),
            "tricep_upright".to_string(),
        ],
        primary_variant: "standard".to_string(),
        variant_factors: factor_map(&[
            ("standard", 1.00),
            ("chest_lean", 0.97),
            ("tricep_upright", 1.03),
        ]),
        variant_stress: factor_map(&[
            ("standard", 1.00),
            ("chest_lean", 0.95),
            ("tricep_upright", 1.05),
        ]),

        has_variant_rotation: true,
        variant_cycles: cycles(&[
            (SessionType::S, &["standard", "chest_lean", "tricep_upright"]),
            (SessionType::H, &["standard", "chest_lean", "tricep_upright"]),
            (SessionType::T, &["standard", "tricep_upright"]),
            (SessionType::E, &["standard"]),
            (SessionType::Test, &["standard"]),
        ]),

        session_params: BTreeMap::from([
            (
                SessionType::S,
                SessionTypeParams {
                    reps_fraction_low: 0.35,
                    reps_fraction_high: 0.55,
                    reps_min: 3,
                    reps_max: 8,
                    sets_min: 3,
                    sets_max: 5,
                    rest_min: 180,
                    rest_max: 300,
                    rir_target: 2,
                },
            ),
            (
                SessionType::H,
                SessionTypeParams {
                    reps_fraction_low: 0.55,
                    reps_fraction_high: 0.75,
                    reps_min: 6,
                    reps_max: 15,
                    sets_min: 4,
                    sets_max: 6,
                    rest_min: 120,
                    rest_max: 180,
                    rir_target: 2,
                },
            ),
            (
                SessionType::E,
                SessionTypeParams {
                    reps_fraction_low: 0.35,
                    reps_fraction_high: 0.55,
                    reps_min: 3,
                    reps_max: 10,
                    sets_min: 5,
                    sets_max: 8,
                    rest_min: 45,
                    rest_max: 90,
                    rir_target: 3,
                },
            ),
            (
                SessionType::T,
                SessionTypeParams {
                    reps_fraction_low: 0.20,
                    reps_fraction_high: 0.40,
                    reps_min: 2,
                    reps_max: 5,
                    sets_min: 4,
                    sets_max: 8,
                    rest_min: 60,
                    rest_max: 120,
                    rir_target: 5,
                },
            ),
            (
                SessionType::Test,
                SessionTypeParams {
                    reps_fraction_low: 1.0,
                    reps_fraction_high: 1.0,
                    reps_min: 1,
                    reps_max: 80,
                    sets_min: 1,
                    sets_max: 1,
                    rest_min: 180,
                    rest_max: 300,
                    rir_target: 0,
                },
            ),
        ]),

        target_metric: TargetMetric::MaxReps,
        target_value: 40.0,
        test_frequency_weeks: 3,
        onerm_includes_bodyweight: true,

        weight_increment_fraction: 0.012,
        weight_tm_threshold: 12,
        max_added_weight_kg: 30.0,
    }
}

fn bss() -> ExerciseDefinition {
    ExerciseDefinition {
        exercise_id: "bss".to_string(),
        display_name: "Bulgarian Split Squat (DB)".to_string(),
        muscle_group: "lower".to_string(),

        // ~71% of bodyweight rides on the front leg; the 1RM nonetheless
        // counts dumbbell weight only (onerm_includes_bodyweight = false).
        bw_fraction: 0.71,
        load_type: LoadType::ExternalOnly,

        variants: vec![
            "standard".to_string(),
            "deficit".to_string(),
            "front_foot_elevated".to_string(),
        ],
        primary_variant: "standard".to_string(),
        variant_factors: factor_map(&[
            ("standard", 1.00),
            ("deficit", 1.05),
            ("front_foot_elevated", 0.95),
        ]),
        variant_stress: factor_map(&[
            ("standard", 1.00),
            ("deficit", 1.05),
            ("front_foot_elevated", 0.95),
        ]),

        has_variant_rotation: true,
        variant_cycles: cycles(&[
            (SessionType::S, &["standard", "deficit", "front_foot_elevated"]),
            (SessionType::H, &["standard", "deficit", "front_foot_elevated"]),
            (SessionType::T, &["standard", "deficit"]),
            (SessionType::E, &["standard"]),
            (SessionType::Test, &["standard"]),
        ]),

        session_params: BTreeMap::from([
            (
                SessionType::S,
                SessionTypeParams {
                    reps_fraction_low: 0.50,
                    reps_fraction_high: 0.70,
                    reps_min: 4,
                    reps_max: 8,
                    sets_min: 3,
                    sets_max: 4,
                    rest_min: 150,
                    rest_max: 240,
                    rir_target: 2,
                },
            ),
            (
                SessionType::H,
                SessionTypeParams {
                    reps_fraction_low: 0.60,
                    reps_fraction_high: 0.80,
                    reps_min: 8,
                    reps_max: 15,
                    sets_min: 3,
                    sets_max: 5,
                    rest_min: 90,
                    rest_max: 150,
                    rir_target: 2,
                },
            ),
            (
                SessionType::E,
                SessionTypeParams {
                    reps_fraction_low: 0.40,
                    reps_fraction_high: 0.60,
                    reps_min: 10,
                    reps_max: 20,
                    sets_min: 3,
                    sets_max: 5,
                    rest_min: 60,
                    rest_max: 90,
                    rir_target: 3,
                },
            ),
            (
                SessionType::T,
                SessionTypeParams {
                    reps_fraction_low: 0.30,
                    reps_fraction_high: 0.50,
                    reps_min: 5,
                    reps_max: 10,
                    sets_min: 2,
                    sets_max: 4,
                    rest_min: 60,
                    rest_max: 120,
                    rir_target: 4,
                },
            ),
            (
                SessionType::Test,
                SessionTypeParams {
                    reps_fraction_low: 1.0,
                    reps_fraction_high: 1.0,
                    reps_min: 1,
                    reps_max: 30,
                    sets_min: 1,
                    sets_max: 1,
                    rest_min: 180,
                    rest_max: 300,
                    rir_target: 0,
                },
            ),
        ]),

        target_metric: TargetMetric::MaxReps,
        target_value: 20.0,
        test_frequency_weeks: 4,
        onerm_includes_bodyweight: false,

        // Progression is carried by the dumbbell weight logged on TEST
        // sessions; the TM-driven increment never triggers.
        weight_increment_fraction: 0.0,
        weight_tm_threshold: 999,
        max_added_weight_kg: 72.0,
    }
}

/// Identifiers of the built-in exercises, in CLI display order
pub fn exercise_ids() -> &'static [&'static str] {
    &["pull_up", "dip", "bss"]
}

/// Look up a built-in exercise definition
pub fn get_exercise(exercise_id: &str) -> Result<ExerciseDefinition> {
    match exercise_id {
        "pull_up" => Ok(pull_up()),
        "dip" => Ok(dip()),
        "bss" => Ok(bss()),
        other => Err(BarplanError::InvalidInput(format!(
            "Unknown exercise: {other} (expected one of: pull_up, dip, bss)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        assert!(get_exercise("pull_up").is_ok());
        assert!(get_exercise("dip").is_ok());
        assert!(get_exercise("bss").is_ok());
        assert!(get_exercise("bench").is_err());
    }

    #[test]
    fn test_all_definitions_cover_training_types() {
        for id in exercise_ids() {
            let ex = get_exercise(id).unwrap();
            for t in [
                SessionType::S,
                SessionType::H,
                SessionType::E,
                SessionType::T,
                SessionType::Test,
            ] {
                assert!(ex.params(t).is_ok(), "{id} missing params for {t}");
            }
            assert!(ex.is_valid_variant(&ex.primary_variant));
        }
    }

    #[test]
    fn test_bw_fractions() {
        assert_eq!(get_exercise("pull_up").unwrap().bw_fraction, 1.0);
        assert_eq!(get_exercise("dip").unwrap().bw_fraction, 0.92);
        assert_eq!(get_exercise("bss").unwrap().bw_fraction, 0.71);
    }

    #[test]
    fn test_pull_up_stress_factors() {
        let ex = get_exercise("pull_up").unwrap();
        assert_eq!(ex.variant_stress_factor("pronated"), 1.00);
        assert_eq!(ex.variant_stress_factor("neutral"), 0.95);
        assert_eq!(ex.variant_stress_factor("supinated"), 1.05);
        // Unknown variants fall back to neutral stress
        assert_eq!(ex.variant_stress_factor("one_arm"), 1.0);
    }

    #[test]
    fn test_bss_weight_rule_disabled() {
        let ex = get_exercise("bss").unwrap();
        assert_eq!(ex.weight_tm_threshold, 999);
        assert_eq!(ex.load_type, LoadType::ExternalOnly);
        assert!(!ex.onerm_includes_bodyweight);
    }

    #[test]
    fn test_cycle_defaults_to_primary() {
        let ex = get_exercise("pull_up").unwrap();
        assert_eq!(ex.cycle(SessionType::E), vec!["pronated".to_string()]);
        assert_eq!(
            ex.cycle(SessionType::S),
            vec!["pronated", "neutral", "supinated"]
        );
        // REST has no configured cycle
        assert_eq!(ex.cycle(SessionType::Rest), vec!["pronated".to_string()]);
    }
}
