//! Core data model for barplan.
//!
//! Sessions, sets, plans, profile and physiological state. Variant names
//! ("grips") are exercise-specific strings; validation against the variant
//! list is delegated to the exercise definition rather than enforced here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{BarplanError, Result};

/// Session types in the weekly rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionType {
    /// Strength: low reps, long rest, added weight when TM allows
    S,
    /// Hypertrophy: moderate reps and rest
    H,
    /// Endurance/density: descending ladder, short rest
    E,
    /// Technique: low fraction of TM, high RIR
    T,
    /// All-out max assessment; the only record type that moves the test max
    Test,
    /// Rest marker created exclusively by the shift-plan operator
    Rest,
}

impl SessionType {
    /// True for records that represent actual training work
    pub fn is_training(&self) -> bool {
        !matches!(self, SessionType::Rest)
    }

    /// True for the S/H/E/T rotation members (TEST and REST excluded)
    pub fn in_rotation(&self) -> bool {
        !matches!(self, SessionType::Test | SessionType::Rest)
    }

    pub fn code(&self) -> &'static str {
        match self {
            SessionType::S => "S",
            SessionType::H => "H",
            SessionType::E => "E",
            SessionType::T => "T",
            SessionType::Test => "TEST",
            SessionType::Rest => "REST",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SessionType::S => "Strength",
            SessionType::H => "Hypertrophy",
            SessionType::E => "Endurance",
            SessionType::T => "Technique",
            SessionType::Test => "Max Test",
            SessionType::Rest => "Rest",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for SessionType {
    type Err = BarplanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "S" => Ok(SessionType::S),
            "H" => Ok(SessionType::H),
            "E" => Ok(SessionType::E),
            "T" => Ok(SessionType::T),
            "M" | "TEST" => Ok(SessionType::Test),
            "REST" => Ok(SessionType::Rest),
            other => Err(BarplanError::InvalidInput(format!(
                "Unknown session type: {other} (expected S, H, E, T, TEST or REST)"
            ))),
        }
    }
}

/// Status of one row in the unified plan/history timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineStatus {
    /// A logged training session matched this slot
    Done,
    /// A REST record occupies this date
    Rested,
    /// Planned slot in the past with no matching record
    Missed,
    /// The first upcoming planned session
    Next,
    /// Upcoming planned session
    Planned,
    /// Logged session that matched no plan slot
    Extra,
}

impl TimelineStatus {
    pub fn marker(&self) -> &'static str {
        match self {
            TimelineStatus::Done => "✓",
            TimelineStatus::Rested => "~",
            TimelineStatus::Missed => "—",
            TimelineStatus::Next => ">",
            TimelineStatus::Planned => " ",
            TimelineStatus::Extra => "·",
        }
    }
}

/// A set that was actually performed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSet {
    /// Reps performed (0 for a failed set)
    pub reps: u32,

    /// Added external weight in kg (0 for bodyweight-only)
    #[serde(default)]
    pub weight_kg: f64,

    /// Rest before this set in seconds (0 = first set of the session)
    #[serde(default)]
    pub rest_s: u32,

    /// Reported reps-in-reserve at set end, when the user logged one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rir: Option<u8>,
}

impl CompletedSet {
    pub fn bodyweight_only(&self) -> bool {
        self.weight_kg == 0.0
    }
}

/// A prescribed set within a future session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSet {
    /// Prescribed reps
    pub reps: u32,

    /// Prescribed added weight in kg
    #[serde(default)]
    pub weight_kg: f64,

    /// Prescribed rest before the set in seconds
    #[serde(default)]
    pub rest_s: u32,
}

/// Equipment context captured at log time, opaque to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSnapshot {
    /// Item in use, e.g. "BAR_ONLY", "BAND_MEDIUM", "DB_PAIR"
    pub active_item: String,

    /// Assistance in kg subtracted from the effective load (0 for additive items)
    #[serde(default)]
    pub assistance_kg: f64,

    /// Rear-foot elevation height for split-squat setups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_height_cm: Option<u32>,
}

impl Default for EquipmentSnapshot {
    fn default() -> Self {
        EquipmentSnapshot {
            active_item: "BAR_ONLY".to_string(),
            assistance_kg: 0.0,
            elevation_height_cm: None,
        }
    }
}

/// One logged record in the history file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    /// Calendar day of the session
    pub date: NaiveDate,

    /// Exercise this record belongs to
    #[serde(default = "default_exercise_id")]
    pub exercise_id: String,

    pub session_type: SessionType,

    /// Variant/grip used, e.g. "pronated", "standard", "deficit"
    #[serde(default)]
    pub variant: String,

    /// Bodyweight at session time in kg
    pub bodyweight_kg: f64,

    /// Completed sets in performed order
    #[serde(default)]
    pub sets: Vec<CompletedSet>,

    /// Prescription frozen at log time; never recomputed afterwards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_sets: Option<Vec<PlannedSet>>,

    /// Equipment context at log time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<EquipmentSnapshot>,

    /// Session-level reported RIR (applies to the final set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rir: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_exercise_id() -> String {
    "pull_up".to_string()
}

impl SessionResult {
    /// Validate the parts the model itself owns (variant membership is
    /// checked against the exercise definition by the caller).
    pub fn validate(&self) -> Result<()> {
        if self.bodyweight_kg <= 0.0 {
            return Err(BarplanError::InvalidInput(
                "bodyweight_kg must be positive".to_string(),
            ));
        }
        for s in &self.sets {
            if s.weight_kg < 0.0 {
                return Err(BarplanError::InvalidInput(
                    "set weight_kg must be non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A planned future session produced by the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub date: NaiveDate,
    pub exercise_id: String,
    pub session_type: SessionType,
    pub variant: String,

    /// Prescribed sets; for endurance sessions a descending ladder
    pub sets: Vec<PlannedSet>,

    /// Training max in effect for this session's week
    pub expected_tm: u32,

    /// Cumulative week number anchored at the first training Monday
    pub week_number: u32,
}

impl SessionPlan {
    pub fn total_reps(&self) -> u32 {
        self.sets.iter().map(|s| s.reps).sum()
    }
}

/// Between-test max inference (Track B), shown alongside past sessions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaxEstimate {
    /// Fatigue-index method estimate
    pub fi_est: u32,

    /// Repetitions~%1RM table method estimate
    pub nuzzo_est: u32,

    /// Computed fatigue index (0..1)
    pub fi: f64,

    pub confidence: EstimateConfidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateConfidence {
    High,
    Medium,
    Low,
}

/// One row of the unified timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub date: NaiveDate,
    pub session_type: SessionType,
    pub variant: String,
    pub status: TimelineStatus,

    /// Logged record, present for done/rested/extra rows
    pub actual: Option<SessionResult>,

    /// Prescription: frozen from history for past rows, freshly computed
    /// for planned/next rows
    pub prescribed: Option<Vec<PlannedSet>>,

    pub expected_tm: u32,
    pub week_number: u32,

    /// 1-based position in sorted history, for delete-record
    pub history_id: Option<usize>,

    /// Track B estimate for past multi-set non-TEST sessions
    pub max_estimate: Option<MaxEstimate>,
}

/// Two-timescale fitness–fatigue state plus the EWMA max estimator.
///
/// Rebuilt from scratch on every invocation by replaying history; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessFatigueState {
    /// Slow-decay fitness component G
    pub fitness: f64,

    /// Fast-decay fatigue component H
    pub fatigue: f64,

    /// EWMA estimate of the current max
    pub m_hat: f64,

    /// Variance of the max estimate
    pub sigma_m_sq: f64,

    /// Running mean of readiness R = G - H
    pub readiness_mean: f64,

    /// Running variance of readiness
    pub readiness_var: f64,

    /// Number of training updates applied
    pub updates: u32,

    /// Date of the last applied update
    pub last_update: Option<NaiveDate>,
}

impl Default for FitnessFatigueState {
    fn default() -> Self {
        FitnessFatigueState {
            fitness: 0.0,
            fatigue: 0.0,
            m_hat: 10.0,
            sigma_m_sq: 1.5 * 1.5,
            readiness_mean: 0.0,
            readiness_var: 10.0,
            updates: 0,
            last_update: None,
        }
    }
}

impl FitnessFatigueState {
    /// Readiness R(t) = G(t) - H(t)
    pub fn readiness(&self) -> f64 {
        self.fitness - self.fatigue
    }

    /// Readiness z-score against its running statistics
    pub fn readiness_z_score(&self) -> f64 {
        if self.readiness_var <= 0.0 {
            return 0.0;
        }
        let std = self.readiness_var.sqrt();
        if std == 0.0 {
            return 0.0;
        }
        (self.readiness() - self.readiness_mean) / std
    }
}

/// Current training status derived from history analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStatus {
    /// floor(0.9 · latest test max), the conservative prescription anchor
    pub training_max: u32,

    pub latest_test_max: Option<u32>,

    /// TEST trend in reps per week over the trend window
    pub trend_slope: f64,

    pub is_plateau: bool,
    pub deload_recommended: bool,

    /// Mean prescription compliance over the last week
    pub compliance_ratio: f64,

    pub readiness_z_score: f64,
    pub fitness: f64,
    pub fatigue: f64,

    pub state: FitnessFatigueState,
}

/// User's goal for one exercise: reps, optionally at an added weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseTarget {
    pub reps: u32,

    #[serde(default)]
    pub weight_kg: f64,
}

impl std::fmt::Display for ExerciseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.weight_kg > 0.0 {
            write!(f, "{} reps @ +{:.1} kg", self.reps, self.weight_kg)
        } else {
            write!(f, "{} reps", self.reps)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

/// Bias applied to adaptive rest prescriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestPreference {
    Short,
    Normal,
    Long,
}

impl Default for RestPreference {
    fn default() -> Self {
        RestPreference::Normal
    }
}

/// Per-exercise equipment state stored on the profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSetting {
    #[serde(default)]
    pub available_items: Vec<String>,

    pub active_item: String,

    #[serde(default)]
    pub assistance_kg: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_height_cm: Option<u32>,
}

impl EquipmentSetting {
    pub fn snapshot(&self) -> EquipmentSnapshot {
        EquipmentSnapshot {
            active_item: self.active_item.clone(),
            assistance_kg: self.assistance_kg,
            elevation_height_cm: self.elevation_height_cm,
        }
    }
}

/// User profile: physical characteristics, preferences and plan anchors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub height_cm: u32,
    pub sex: Sex,

    /// Current bodyweight, kept fresh by log-session and update-weight
    pub current_bodyweight_kg: f64,

    /// Default training days per week (1..=5)
    pub days_per_week: u8,

    /// Per-exercise overrides for days per week
    #[serde(default)]
    pub exercise_days: BTreeMap<String, u8>,

    /// Per-exercise goals; exercises absent here use built-in defaults
    #[serde(default)]
    pub exercise_targets: BTreeMap<String, ExerciseTarget>,

    #[serde(default = "default_enabled_exercises")]
    pub exercises_enabled: Vec<String>,

    /// Per-exercise plan anchor dates
    #[serde(default)]
    pub plan_start_dates: BTreeMap<String, NaiveDate>,

    /// Last user-chosen plan horizon per exercise, reused by plain `plan`
    #[serde(default)]
    pub plan_weeks: BTreeMap<String, u32>,

    #[serde(default)]
    pub rest_preference: RestPreference,

    /// Per-exercise equipment state
    #[serde(default)]
    pub equipment: BTreeMap<String, EquipmentSetting>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injury_notes: Option<String>,
}

fn default_enabled_exercises() -> Vec<String> {
    vec!["pull_up".to_string(), "dip".to_string(), "bss".to_string()]
}

impl UserProfile {
    /// Training days per week for the given exercise
    pub fn days_for_exercise(&self, exercise_id: &str) -> u8 {
        self.exercise_days
            .get(exercise_id)
            .copied()
            .unwrap_or(self.days_per_week)
    }

    /// The user's goal for the given exercise, falling back to the
    /// built-in defaults (pull_up → 30, dip → 40, bss → 20 reps)
    pub fn target_for_exercise(&self, exercise_id: &str) -> ExerciseTarget {
        if let Some(t) = self.exercise_targets.get(exercise_id) {
            return t.clone();
        }
        let reps = match exercise_id {
            "dip" => 40,
            "bss" => 20,
            _ => 30,
        };
        ExerciseTarget { reps, weight_kg: 0.0 }
    }

    pub fn is_exercise_enabled(&self, exercise_id: &str) -> bool {
        self.exercises_enabled.iter().any(|e| e == exercise_id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.height_cm == 0 {
            return Err(BarplanError::InvalidInput(
                "height_cm must be positive".to_string(),
            ));
        }
        if self.current_bodyweight_kg <= 0.0 {
            return Err(BarplanError::InvalidInput(
                "current_bodyweight_kg must be positive".to_string(),
            ));
        }
        if !(1..=5).contains(&self.days_per_week) {
            return Err(BarplanError::InvalidInput(format!(
                "days_per_week must be 1..5, got {}",
                self.days_per_week
            )));
        }
        for (ex, days) in &self.exercise_days {
            if !(1..=5).contains(days) {
                return Err(BarplanError::InvalidInput(format!(
                    "exercise_days[{ex}] must be 1..5, got {days}"
                )));
            }
        }
        Ok(())
    }
}
