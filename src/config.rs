//! Resolved numeric constants for the planning engine.
//!
//! Bundled defaults live in the `Default` impls below. An optional user
//! overlay at `~/.barplan/config.toml` is deep-merged over them at startup:
//! every field is optional in the overlay, so a two-line file tweaking one
//! time constant is valid. A broken overlay never aborts the program: the
//! loader falls back to the bundled defaults and reports a warning for the
//! CLI to display.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved engine configuration, passed by value into the core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub rest: RestNormalization,
    pub ewma: MaxEwma,
    pub fitness_fatigue: FitnessFatigueParams,
    pub training_load: TrainingLoadParams,
    pub volume: VolumePolicy,
    pub progression: ProgressionParams,
    pub adaptation: AdaptationThresholds,
    pub plan: PlanHorizon,
}

/// Rest normalization (§ rest factor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestNormalization {
    /// Reference rest interval in seconds
    pub ref_seconds: u32,
    /// Exponent of the power law
    pub gamma: f64,
    /// Factor floor
    pub factor_min: f64,
    /// Factor ceiling
    pub factor_max: f64,
    /// Rests below this are treated as this value
    pub min_clamp: u32,
}

impl Default for RestNormalization {
    fn default() -> Self {
        RestNormalization {
            ref_seconds: 180,
            gamma: 0.20,
            factor_min: 0.80,
            factor_max: 1.05,
            min_clamp: 30,
        }
    }
}

/// EWMA max estimator smoothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxEwma {
    /// Smoothing factor for the max estimate
    pub alpha_m_hat: f64,
    /// Smoothing factor for the variance track
    pub beta_sigma: f64,
    /// Initial uncertainty in reps
    pub initial_sigma_m: f64,
}

impl Default for MaxEwma {
    fn default() -> Self {
        MaxEwma {
            alpha_m_hat: 0.25,
            beta_sigma: 0.15,
            initial_sigma_m: 1.5,
        }
    }
}

/// Two-timescale impulse-response model constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessFatigueParams {
    /// Fitness time constant in days
    pub tau_fitness: f64,
    /// Fatigue time constant in days
    pub tau_fatigue: f64,
    /// Fitness gain per unit training load
    pub k_fitness: f64,
    /// Fatigue gain per unit training load
    pub k_fatigue: f64,
    /// Readiness scaling of the max prediction
    pub c_readiness: f64,
    /// EWMA smoothing for the readiness running statistics
    pub readiness_alpha: f64,
}

impl Default for FitnessFatigueParams {
    fn default() -> Self {
        FitnessFatigueParams {
            tau_fitness: 42.0,
            tau_fatigue: 7.0,
            k_fitness: 0.5,
            k_fatigue: 1.0,
            c_readiness: 0.02,
            readiness_alpha: 0.1,
        }
    }
}

/// Training-load impulse parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLoadParams {
    /// Effort multiplier per RIR point below 3
    pub a_rir: f64,
    /// Exponent of the relative-load stress term
    pub gamma_load: f64,
    /// Exponent of the bodyweight normalization
    pub gamma_bw: f64,
    /// Softening constant for external-only load ratios
    pub epsilon_load: f64,
}

impl Default for TrainingLoadParams {
    fn default() -> Self {
        TrainingLoadParams {
            a_rir: 0.15,
            gamma_load: 1.5,
            gamma_bw: 1.0,
            epsilon_load: 1e-6,
        }
    }
}

/// Weekly hard-set volume policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePolicy {
    pub weekly_hard_sets_min: u32,
    pub weekly_hard_sets_max: u32,
    /// Allowed weekly increase when readiness and compliance are high
    pub increase_rate: f64,
    /// Volume cut during a deload
    pub deload_reduction: f64,
    /// Volume cut under low readiness
    pub readiness_reduction: f64,
}

impl Default for VolumePolicy {
    fn default() -> Self {
        VolumePolicy {
            weekly_hard_sets_min: 8,
            weekly_hard_sets_max: 20,
            increase_rate: 0.10,
            deload_reduction: 0.40,
            readiness_reduction: 0.30,
        }
    }
}

/// Weekly TM progression curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionParams {
    /// Reps per week near the target
    pub delta_min: f64,
    /// Reps per week far from the target
    pub delta_max: f64,
    /// Curvature exponent
    pub eta: f64,
}

impl Default for ProgressionParams {
    fn default() -> Self {
        ProgressionParams {
            delta_min: 0.3,
            delta_max: 1.0,
            eta: 1.5,
        }
    }
}

/// Plateau, deload, autoregulation and overtraining thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationThresholds {
    /// Minimum TEST slope (reps/week) below which a plateau is suspected
    pub plateau_slope: f64,
    /// Window for both trend and new-best checks, in days
    pub trend_window_days: i64,
    /// Readiness z below which plateau escalates to deload
    pub fatigue_z: f64,
    /// Relative shortfall against the readiness-adjusted prediction
    pub underperformance: f64,
    /// Weekly compliance floor
    pub compliance_floor: f64,
    /// Completed non-TEST sessions required before autoregulation engages
    pub min_sessions_for_autoreg: usize,
    /// Readiness z bounds for autoregulation
    pub readiness_z_low: f64,
    pub readiness_z_high: f64,
    /// Within-session drop-off considered high
    pub drop_off_threshold: f64,
    /// Training max as a fraction of the test max
    pub tm_factor: f64,
    /// Rolling window for overtraining detection, in days
    pub overtraining_window_days: i64,
}

impl Default for AdaptationThresholds {
    fn default() -> Self {
        AdaptationThresholds {
            plateau_slope: 0.05,
            trend_window_days: 21,
            fatigue_z: -0.5,
            underperformance: 0.10,
            compliance_floor: 0.70,
            min_sessions_for_autoreg: 10,
            readiness_z_low: -1.0,
            readiness_z_high: 1.0,
            drop_off_threshold: 0.35,
            tm_factor: 0.90,
            overtraining_window_days: 7,
        }
    }
}

/// Plan horizon bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanHorizon {
    pub min_weeks: u32,
    pub max_weeks: u32,
    pub default_weeks: u32,
}

impl Default for PlanHorizon {
    fn default() -> Self {
        PlanHorizon {
            min_weeks: 2,
            max_weeks: 52,
            default_weeks: 4,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rest: RestNormalization::default(),
            ewma: MaxEwma::default(),
            fitness_fatigue: FitnessFatigueParams::default(),
            training_load: TrainingLoadParams::default(),
            volume: VolumePolicy::default(),
            progression: ProgressionParams::default(),
            adaptation: AdaptationThresholds::default(),
            plan: PlanHorizon::default(),
        }
    }
}

impl EngineConfig {
    /// Expected weekly TM progression toward `target` reps.
    ///
    /// delta = delta_min + (delta_max - delta_min) * f^eta
    /// with f = max(0, 1 - tm/target). At or beyond the target f is 0 and
    /// the floor rate remains: the TM keeps climbing, the target never caps
    /// it.
    pub fn progression_rate(&self, training_max: u32, target: u32) -> f64 {
        let f = if target == 0 {
            0.0
        } else {
            (1.0 - training_max as f64 / target as f64).max(0.0)
        };
        self.progression.delta_min
            + (self.progression.delta_max - self.progression.delta_min) * f.powf(self.progression.eta)
    }

    /// Endurance total-rep multiplier kE(TM) = 3.0 + 2.0 * clamp((TM-5)/25, 0, 1)
    pub fn endurance_volume_multiplier(&self, training_max: u32) -> f64 {
        let fraction = ((training_max as f64 - 5.0) / 25.0).clamp(0.0, 1.0);
        3.0 + 2.0 * fraction
    }

    /// Rough number of weeks to reach `target` from `current` by iterating
    /// the progression curve. Bounded to avoid pathological loops.
    pub fn estimate_weeks_to_target(&self, current: u32, target: u32) -> u32 {
        if current >= target {
            return 0;
        }
        let limit = self.plan.max_weeks * 4;
        let mut weeks = 0u32;
        let mut tm = current as f64;
        while (tm as u32) < target && weeks < limit {
            let rate = self.progression_rate(tm as u32, target);
            if rate <= 0.0 {
                break;
            }
            tm += rate;
            weeks += 1;
        }
        weeks.min(limit)
    }

    /// Default overlay location: `~/.barplan/config.toml`
    pub fn default_overlay_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".barplan")
            .join("config.toml")
    }

    /// Load the resolved config: bundled defaults merged with the user
    /// overlay when present. Any failure to read or parse the overlay
    /// degrades to defaults and is reported as a warning string.
    pub fn load_with_overlay(path: &Path) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let mut config = EngineConfig::default();

        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<ConfigOverlay>(&content) {
                    Ok(overlay) => overlay.apply(&mut config),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "config overlay ignored");
                        warnings.push(format!(
                            "Config overlay {} failed to parse ({e}); using bundled defaults.",
                            path.display()
                        ));
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "config overlay unreadable");
                    warnings.push(format!(
                        "Config overlay {} unreadable ({e}); using bundled defaults.",
                        path.display()
                    ));
                }
            }
        }

        (config, warnings)
    }

    /// Load from the default overlay location
    pub fn load_or_default() -> (Self, Vec<String>) {
        Self::load_with_overlay(&Self::default_overlay_path())
    }
}

// ---------------------------------------------------------------------------
// Overlay: every field optional so partial files deep-merge cleanly
// ---------------------------------------------------------------------------

macro_rules! apply_fields {
    ($overlay:expr, $target:expr, [$($field:ident),+ $(,)?]) => {
        $(
            if let Some(v) = $overlay.$field {
                $target.$field = v;
            }
        )+
    };
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    rest: Option<RestOverlay>,
    ewma: Option<EwmaOverlay>,
    fitness_fatigue: Option<FitnessFatigueOverlay>,
    training_load: Option<TrainingLoadOverlay>,
    volume: Option<VolumeOverlay>,
    progression: Option<ProgressionOverlay>,
    adaptation: Option<AdaptationOverlay>,
    plan: Option<PlanOverlay>,
}

#[derive(Debug, Default, Deserialize)]
struct RestOverlay {
    ref_seconds: Option<u32>,
    gamma: Option<f64>,
    factor_min: Option<f64>,
    factor_max: Option<f64>,
    min_clamp: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct EwmaOverlay {
    alpha_m_hat: Option<f64>,
    beta_sigma: Option<f64>,
    initial_sigma_m: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct FitnessFatigueOverlay {
    tau_fitness: Option<f64>,
    tau_fatigue: Option<f64>,
    k_fitness: Option<f64>,
    k_fatigue: Option<f64>,
    c_readiness: Option<f64>,
    readiness_alpha: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct TrainingLoadOverlay {
    a_rir: Option<f64>,
    gamma_load: Option<f64>,
    gamma_bw: Option<f64>,
    epsilon_load: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct VolumeOverlay {
    weekly_hard_sets_min: Option<u32>,
    weekly_hard_sets_max: Option<u32>,
    increase_rate: Option<f64>,
    deload_reduction: Option<f64>,
    readiness_reduction: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProgressionOverlay {
    delta_min: Option<f64>,
    delta_max: Option<f64>,
    eta: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct AdaptationOverlay {
    plateau_slope: Option<f64>,
    trend_window_days: Option<i64>,
    fatigue_z: Option<f64>,
    underperformance: Option<f64>,
    compliance_floor: Option<f64>,
    min_sessions_for_autoreg: Option<usize>,
    readiness_z_low: Option<f64>,
    readiness_z_high: Option<f64>,
    drop_off_threshold: Option<f64>,
    tm_factor: Option<f64>,
    overtraining_window_days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct PlanOverlay {
    min_weeks: Option<u32>,
    max_weeks: Option<u32>,
    default_weeks: Option<u32>,
}

impl ConfigOverlay {
    fn apply(self, config: &mut EngineConfig) {
        if let Some(o) = self.rest {
            apply_fields!(o, config.rest, [ref_seconds, gamma, factor_min, factor_max, min_clamp]);
        }
        if let Some(o) = self.ewma {
            apply_fields!(o, config.ewma, [alpha_m_hat, beta_sigma, initial_sigma_m]);
        }
        if let Some(o) = self.fitness_fatigue {
            apply_fields!(
                o,
                config.fitness_fatigue,
                [tau_fitness, tau_fatigue, k_fitness, k_fatigue, c_readiness, readiness_alpha]
            );
        }
        if let Some(o) = self.training_load {
            apply_fields!(o, config.training_load, [a_rir, gamma_load, gamma_bw, epsilon_load]);
        }
        if let Some(o) = self.volume {
            apply_fields!(
                o,
                config.volume,
                [weekly_hard_sets_min, weekly_hard_sets_max, increase_rate, deload_reduction, readiness_reduction]
            );
        }
        if let Some(o) = self.progression {
            apply_fields!(o, config.progression, [delta_min, delta_max, eta]);
        }
        if let Some(o) = self.adaptation {
            apply_fields!(
                o,
                config.adaptation,
                [
                    plateau_slope,
                    trend_window_days,
                    fatigue_z,
                    underperformance,
                    compliance_floor,
                    min_sessions_for_autoreg,
                    readiness_z_low,
                    readiness_z_high,
                    drop_off_threshold,
                    tm_factor,
                    overtraining_window_days,
                ]
            );
        }
        if let Some(o) = self.plan {
            apply_fields!(o, config.plan, [min_weeks, max_weeks, default_weeks]);
        }
    }
}
