//! Two-timescale fitness–fatigue model and the EWMA max estimator.
//!
//! Fitness G decays with a 42-day time constant, fatigue H with a 7-day one;
//! readiness is their difference. The state is never persisted; it is
//! rebuilt deterministically on every invocation by replaying history.

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::exercises::ExerciseDefinition;
use crate::metrics::{estimate_rir, relative_load, session_max_bw_only, test_sessions};
use crate::models::{FitnessFatigueState, SessionResult, SessionType};

/// Physiology calculations parameterised by config, exercise and the
/// reference conditions all loads are normalized against.
pub struct PhysiologyModel<'a> {
    config: &'a EngineConfig,
    exercise: &'a ExerciseDefinition,
    reference_bodyweight_kg: f64,
    reference_added_kg: f64,
}

impl<'a> PhysiologyModel<'a> {
    /// Build a model against reference conditions taken from the user's
    /// current bodyweight and, for external-only exercises, the added
    /// weight of the most recent TEST in `history` (0 when none).
    pub fn new(
        config: &'a EngineConfig,
        exercise: &'a ExerciseDefinition,
        reference_bodyweight_kg: f64,
        history: &[SessionResult],
    ) -> Self {
        let reference_added_kg = test_sessions(history)
            .last()
            .and_then(|t| {
                t.sets
                    .iter()
                    .filter(|s| s.weight_kg > 0.0)
                    .map(|s| s.weight_kg)
                    .last()
            })
            .unwrap_or(0.0);

        PhysiologyModel {
            config,
            exercise,
            reference_bodyweight_kg,
            reference_added_kg,
        }
    }

    /// Effort multiplier E_rir = 1 + a * max(0, 3 - rir).
    /// Sets closer to failure count as harder work.
    pub fn rir_effort_multiplier(&self, rir: u8) -> f64 {
        1.0 + self.config.training_load.a_rir * (3.0 - rir as f64).max(0.0)
    }

    /// Hard reps for one set: HR = reps * E_rir(rir), with RIR estimated
    /// from the current max when unreported.
    pub fn set_hard_reps(&self, reps: u32, rir: Option<u8>, m_hat: f64) -> f64 {
        let rir = rir.unwrap_or_else(|| estimate_rir(reps, m_hat));
        reps as f64 * self.rir_effort_multiplier(rir)
    }

    /// Training-load impulse w for a session:
    /// w = sum_j HR_j * S_load_j * S_variant.
    ///
    /// Rest stress is deliberately absent: short rest is already credited
    /// on the performance side via effective reps.
    pub fn session_training_load(&self, session: &SessionResult, m_hat: f64) -> f64 {
        let s_variant = self.exercise.variant_stress_factor(&session.variant);
        let mut total = 0.0;

        for set in &session.sets {
            let hr = self.set_hard_reps(set.reps, set.rir.or(session.rir), m_hat);
            let l_rel = relative_load(
                self.config,
                session.bodyweight_kg,
                set.weight_kg,
                self.reference_bodyweight_kg,
                self.reference_added_kg,
                self.exercise.bw_fraction,
            );
            let s_load = l_rel.powf(self.config.training_load.gamma_load);
            total += hr * s_load * s_variant;
        }

        total
    }

    /// Apply a training impulse after `days_since_last` days:
    ///   G = G * e^(-d/tau_G) + k_G * w
    ///   H = H * e^(-d/tau_H) + k_H * w
    /// and fold the resulting readiness into its running statistics.
    pub fn apply_session(
        &self,
        state: &FitnessFatigueState,
        training_load: f64,
        days_since_last: i64,
        date: NaiveDate,
    ) -> FitnessFatigueState {
        let ff = &self.config.fitness_fatigue;
        let d = days_since_last as f64;

        let fitness = state.fitness * (-d / ff.tau_fitness).exp() + ff.k_fitness * training_load;
        let fatigue = state.fatigue * (-d / ff.tau_fatigue).exp() + ff.k_fatigue * training_load;

        let readiness = fitness - fatigue;
        let alpha = ff.readiness_alpha;
        let readiness_mean = (1.0 - alpha) * state.readiness_mean + alpha * readiness;
        let readiness_var =
            (1.0 - alpha) * state.readiness_var + alpha * (readiness - readiness_mean).powi(2);

        FitnessFatigueState {
            fitness,
            fatigue,
            readiness_mean,
            readiness_var,
            updates: state.updates + 1,
            last_update: Some(date),
            ..*state
        }
    }

    /// Pure rest-day decay: both components shrink, readiness statistics
    /// are not updated.
    pub fn decay(&self, state: &FitnessFatigueState, days: i64) -> FitnessFatigueState {
        let ff = &self.config.fitness_fatigue;
        let d = days as f64;
        FitnessFatigueState {
            fitness: state.fitness * (-d / ff.tau_fitness).exp(),
            fatigue: state.fatigue * (-d / ff.tau_fatigue).exp(),
            ..state.clone()
        }
    }

    /// Fold an observed TEST max into the EWMA estimate:
    ///   m_hat' = (1-alpha) m_hat + alpha M_obs
    ///   sigma²' = (1-beta) sigma² + beta (M_obs - m_hat)²
    pub fn update_max_estimate(
        &self,
        state: &FitnessFatigueState,
        observed_max: u32,
    ) -> FitnessFatigueState {
        let ewma = &self.config.ewma;
        let obs = observed_max as f64;

        let m_hat = (1.0 - ewma.alpha_m_hat) * state.m_hat + ewma.alpha_m_hat * obs;
        let residual_sq = (obs - state.m_hat).powi(2);
        let sigma_m_sq =
            ((1.0 - ewma.beta_sigma) * state.sigma_m_sq + ewma.beta_sigma * residual_sq).max(0.01);

        FitnessFatigueState {
            m_hat,
            sigma_m_sq,
            ..state.clone()
        }
    }

    /// Readiness-adjusted max prediction:
    /// M_pred = m_hat * (1 + c_R * (R - R_mean))
    pub fn predicted_max(&self, state: &FitnessFatigueState) -> f64 {
        let adjustment =
            self.config.fitness_fatigue.c_readiness * (state.readiness() - state.readiness_mean);
        state.m_hat * (1.0 + adjustment)
    }

    /// Replay history in ascending date order and return the terminal state.
    ///
    /// REST records and gap days between consecutive training records decay
    /// the state without touching the readiness statistics. Deterministic:
    /// the same history always reconstructs the same state.
    pub fn build_state(
        &self,
        history: &[SessionResult],
        baseline_max: Option<u32>,
    ) -> FitnessFatigueState {
        self.replay_state(history, baseline_max, |_, _| {})
    }

    /// [`build_state`] with an observer invoked per training session,
    /// receiving the pre-session state (after gap decay, before the
    /// session's own impulse). Used to evaluate predictions "at their own
    /// date" during adaptation analysis.
    pub fn replay_state<F>(
        &self,
        history: &[SessionResult],
        baseline_max: Option<u32>,
        mut observer: F,
    ) -> FitnessFatigueState
    where
        F: FnMut(&SessionResult, &FitnessFatigueState),
    {
        let training: Vec<&SessionResult> = history
            .iter()
            .filter(|s| s.session_type.is_training())
            .collect();

        let initial_max = test_sessions(history)
            .first()
            .map(|&t| session_max_bw_only(t))
            .filter(|&m| m > 0)
            .or(baseline_max)
            .unwrap_or(10);

        let mut state = FitnessFatigueState {
            m_hat: initial_max as f64,
            sigma_m_sq: self.config.ewma.initial_sigma_m.powi(2),
            readiness_mean: 0.0,
            // Wide initial variance keeps early z-scores tame
            readiness_var: 10.0,
            ..FitnessFatigueState::default()
        };

        let mut prev_date: Option<NaiveDate> = None;

        for session in training {
            let days_since = match prev_date {
                Some(prev) => (session.date - prev).num_days().max(0),
                None => 1,
            };

            if days_since > 1 {
                state = self.decay(&state, days_since - 1);
            }

            observer(session, &state);

            let load = self.session_training_load(session, state.m_hat);
            state = self.apply_session(&state, load, 1, session.date);

            if session.session_type == SessionType::Test {
                let observed = session_max_bw_only(session);
                if observed > 0 {
                    state = self.update_max_estimate(&state, observed);
                }
            }

            prev_date = Some(session.date);
        }

        state
    }
}
