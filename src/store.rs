//! Persistent state: JSONL history per exercise, the profile blob and the
//! plan snapshot cache.
//!
//! The history file holds one JSON record per line in chronological order.
//! Appends rewrite the whole file (records stay small); deletion by 1-based
//! id does the same. The profile is a single JSON document rewritten whole.
//! Concurrent invocations are unsupported by design.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::error::{BarplanError, Result};
use crate::exercises::{self, ExerciseDefinition};
use crate::metrics::{latest_test_max, training_max_from};
use crate::models::{CompletedSet, PlannedSet, SessionResult, SessionType, UserProfile};

/// Store for one exercise's history plus the shared profile
pub struct HistoryStore {
    history_path: PathBuf,
    profile_path: PathBuf,
    cache_path: PathBuf,
    exercise_id: String,
}

/// Compact snapshot of one upcoming prescription, persisted for
/// change-detection between plan invocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanCacheEntry {
    pub date: NaiveDate,
    pub session_type: SessionType,
    pub sets: u32,
    pub reps: u32,
    pub weight_kg: f64,
    pub rest_s: u32,
    pub expected_tm: u32,
}

/// Result of logging one session
#[derive(Debug, Clone, PartialEq)]
pub struct LogOutcome {
    /// Bodyweight-equivalent best reps of the logged session
    pub max_reps_equivalent: u32,

    /// Whether a TEST record was synthesized for a new personal best
    pub new_personal_best: bool,

    /// Training max implied by the promoted best
    pub new_tm: Option<u32>,
}

/// Result of a shift-plan operation
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftOutcome {
    pub new_plan_start: NaiveDate,
    pub rest_records_added: usize,
    pub rest_records_removed: usize,
}

/// Default data directory: `~/.barplan`
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".barplan")
}

/// Default history path for an exercise
pub fn default_history_path(exercise_id: &str) -> PathBuf {
    default_data_dir().join(format!("{exercise_id}_history.jsonl"))
}

impl HistoryStore {
    pub fn new(history_path: impl Into<PathBuf>, exercise_id: &str) -> Self {
        let history_path = history_path.into();
        let parent = history_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        HistoryStore {
            profile_path: parent.join("profile.json"),
            cache_path: parent.join(format!("{exercise_id}_plan_cache.json")),
            history_path,
            exercise_id: exercise_id.to_string(),
        }
    }

    pub fn at_default_location(exercise_id: &str) -> Self {
        Self::new(default_history_path(exercise_id), exercise_id)
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn exists(&self) -> bool {
        self.history_path.exists()
    }

    /// Create the data directory and an empty history file if absent
    pub fn init(&self) -> Result<()> {
        if let Some(parent) = self.history_path.parent() {
            fs::create_dir_all(parent)?;
        }
        if !self.history_path.exists() {
            fs::File::create(&self.history_path)?;
            tracing::info!(path = %self.history_path.display(), "history file created");
        }
        Ok(())
    }

    // -- profile ------------------------------------------------------------

    pub fn load_profile(&self) -> Result<UserProfile> {
        if !self.profile_path.exists() {
            return Err(BarplanError::ProfileNotFound {
                path: self.profile_path.clone(),
            });
        }
        let content = fs::read_to_string(&self.profile_path)?;
        let profile: UserProfile = serde_json::from_str(&content)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        profile.validate()?;
        if let Some(parent) = self.profile_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(profile)?;
        fs::write(&self.profile_path, json)?;
        Ok(())
    }

    pub fn update_bodyweight(&self, bodyweight_kg: f64) -> Result<()> {
        let mut profile = self.load_profile()?;
        profile.current_bodyweight_kg = bodyweight_kg;
        self.save_profile(&profile)
    }

    pub fn plan_start_date(&self) -> Option<NaiveDate> {
        self.load_profile()
            .ok()
            .and_then(|p| p.plan_start_dates.get(&self.exercise_id).copied())
    }

    pub fn set_plan_start_date(&self, date: NaiveDate) -> Result<()> {
        let mut profile = self.load_profile()?;
        profile
            .plan_start_dates
            .insert(self.exercise_id.clone(), date);
        self.save_profile(&profile)
    }

    pub fn plan_weeks(&self) -> Option<u32> {
        self.load_profile()
            .ok()
            .and_then(|p| p.plan_weeks.get(&self.exercise_id).copied())
    }

    pub fn set_plan_weeks(&self, weeks: u32) -> Result<()> {
        let mut profile = self.load_profile()?;
        profile.plan_weeks.insert(self.exercise_id.clone(), weeks);
        self.save_profile(&profile)
    }

    // -- history ------------------------------------------------------------

    /// Load all records, sorted by date (insertion order breaks ties).
    ///
    /// A record naming an exercise the registry does not know makes the
    /// history inconsistent; the operation is refused rather than guessed at.
    pub fn load_history(&self) -> Result<Vec<SessionResult>> {
        if !self.history_path.exists() {
            return Err(BarplanError::HistoryNotFound {
                path: self.history_path.clone(),
            });
        }

        let content = fs::read_to_string(&self.history_path)?;
        let mut sessions = Vec::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let session: SessionResult = serde_json::from_str(line).map_err(|e| {
                BarplanError::Inconsistent(format!(
                    "bad record at {}:{}: {e}",
                    self.history_path.display(),
                    line_num + 1
                ))
            })?;
            if exercises::get_exercise(&session.exercise_id).is_err() {
                return Err(BarplanError::Inconsistent(format!(
                    "record at {}:{} names unknown exercise {:?}",
                    self.history_path.display(),
                    line_num + 1,
                    session.exercise_id
                )));
            }
            sessions.push(session);
        }

        sessions.sort_by_key(|s| s.date);
        Ok(sessions)
    }

    /// Append a session, keeping chronological order. A record on the same
    /// date with the same session type is replaced rather than duplicated.
    pub fn append_session(&self, session: &SessionResult) -> Result<()> {
        session.validate()?;
        let mut sessions = self.load_history()?;

        let replace_idx = sessions
            .iter()
            .position(|s| s.date == session.date && s.session_type == session.session_type);

        match replace_idx {
            Some(i) => sessions[i] = session.clone(),
            None => {
                let insert_idx = sessions
                    .iter()
                    .position(|s| s.date > session.date)
                    .unwrap_or(sessions.len());
                sessions.insert(insert_idx, session.clone());
            }
        }

        self.write_all(&sessions)
    }

    /// Delete the record with the given 1-based id in sorted order
    pub fn delete_record(&self, record_id: usize) -> Result<SessionResult> {
        let mut sessions = self.load_history()?;
        if record_id == 0 || record_id > sessions.len() {
            return Err(BarplanError::InvalidInput(format!(
                "record id must be between 1 and {}",
                sessions.len()
            )));
        }
        let removed = sessions.remove(record_id - 1);
        self.write_all(&sessions)?;
        Ok(removed)
    }

    fn write_all(&self, sessions: &[SessionResult]) -> Result<()> {
        let mut file = fs::File::create(&self.history_path)?;
        for session in sessions {
            let line = serde_json::to_string(session)?;
            writeln!(file, "{line}")?;
        }
        Ok(())
    }

    /// Append a training session and promote an overperformance.
    ///
    /// A non-TEST session whose bodyweight-equivalent best strictly beats
    /// the latest test max synthesizes a TEST record at the same date, so
    /// the next plan ramps from the proven ceiling. Weighted sets convert
    /// via reps * (1 + added/bw), rounded.
    pub fn log_session(
        &self,
        config: &EngineConfig,
        exercise: &ExerciseDefinition,
        session: &SessionResult,
    ) -> Result<LogOutcome> {
        self.append_session(session)?;

        let max_bw = session
            .sets
            .iter()
            .filter(|s| s.weight_kg == 0.0)
            .map(|s| s.reps)
            .max()
            .unwrap_or(0);
        let max_weighted = session
            .sets
            .iter()
            .filter(|s| s.weight_kg > 0.0 && s.reps > 0)
            .map(|s| (s.reps as f64 * (1.0 + s.weight_kg / session.bodyweight_kg)).round() as u32)
            .max()
            .unwrap_or(0);
        let max_equiv = max_bw.max(max_weighted);

        if session.session_type == SessionType::Test || max_equiv == 0 {
            return Ok(LogOutcome {
                max_reps_equivalent: max_equiv,
                new_personal_best: false,
                new_tm: None,
            });
        }

        let history: Vec<SessionResult> = self
            .load_history()?
            .into_iter()
            .filter(|s| s.exercise_id == session.exercise_id)
            .collect();
        let test_max = latest_test_max(&history).unwrap_or(0);
        if max_equiv <= test_max {
            return Ok(LogOutcome {
                max_reps_equivalent: max_equiv,
                new_personal_best: false,
                new_tm: None,
            });
        }

        let test_session = SessionResult {
            date: session.date,
            exercise_id: session.exercise_id.clone(),
            session_type: SessionType::Test,
            variant: exercise.primary_variant.clone(),
            bodyweight_kg: session.bodyweight_kg,
            sets: vec![CompletedSet {
                reps: max_equiv,
                weight_kg: 0.0,
                rest_s: 180,
                rir: Some(0),
            }],
            planned_sets: Some(vec![PlannedSet {
                reps: max_equiv,
                weight_kg: 0.0,
                rest_s: 180,
            }]),
            equipment: None,
            rir: Some(0),
            notes: Some("Auto-logged from session personal best".to_string()),
        };
        self.append_session(&test_session)?;
        tracing::info!(max_equiv, "personal best promoted to TEST record");

        Ok(LogOutcome {
            max_reps_equivalent: max_equiv,
            new_personal_best: true,
            new_tm: Some(training_max_from(config, max_equiv)),
        })
    }

    // -- shift operator -----------------------------------------------------

    /// Shift the plan window.
    ///
    /// Forward (`shift_days > 0`): appends one REST record per skipped day,
    /// `from_date ..= from_date + shift_days - 1`, and anchors the plan at
    /// the day after the last one. Backward (`shift_days < 0`): removes only
    /// REST records inside `[from_date + shift_days, from_date)` and anchors
    /// at `max(from_date + shift_days, first training date)`. No other
    /// record type is ever created or removed here.
    pub fn shift_plan(&self, from_date: NaiveDate, shift_days: i64) -> Result<ShiftOutcome> {
        if shift_days == 0 {
            return Err(BarplanError::InvalidInput(
                "shift of 0 days is a no-op".to_string(),
            ));
        }

        let profile = self.load_profile()?;
        let mut sessions = self.load_history()?;

        if shift_days > 0 {
            let mut added = 0;
            for offset in 0..shift_days {
                let date = from_date + chrono::Duration::days(offset);
                let already = sessions
                    .iter()
                    .any(|s| s.date == date && s.session_type == SessionType::Rest);
                if already {
                    continue;
                }
                let insert_idx = sessions
                    .iter()
                    .position(|s| s.date > date)
                    .unwrap_or(sessions.len());
                sessions.insert(
                    insert_idx,
                    SessionResult {
                        date,
                        exercise_id: self.exercise_id.clone(),
                        session_type: SessionType::Rest,
                        variant: String::new(),
                        bodyweight_kg: profile.current_bodyweight_kg,
                        sets: Vec::new(),
                        planned_sets: None,
                        equipment: None,
                        rir: None,
                        notes: None,
                    },
                );
                added += 1;
            }
            self.write_all(&sessions)?;

            let new_start = from_date + chrono::Duration::days(shift_days);
            self.set_plan_start_date(new_start)?;
            tracing::info!(%new_start, added, "plan shifted forward");
            Ok(ShiftOutcome {
                new_plan_start: new_start,
                rest_records_added: added,
                rest_records_removed: 0,
            })
        } else {
            let range_start = from_date + chrono::Duration::days(shift_days);
            let before = sessions.len();
            sessions.retain(|s| {
                !(s.session_type == SessionType::Rest
                    && s.date >= range_start
                    && s.date < from_date)
            });
            let removed = before - sessions.len();
            self.write_all(&sessions)?;

            let first_training = sessions
                .iter()
                .filter(|s| s.session_type.is_training())
                .map(|s| s.date)
                .min();
            let new_start = match first_training {
                Some(first) => range_start.max(first),
                None => range_start,
            };
            self.set_plan_start_date(new_start)?;
            tracing::info!(%new_start, removed, "plan shifted backward");
            Ok(ShiftOutcome {
                new_plan_start: new_start,
                rest_records_added: 0,
                rest_records_removed: removed,
            })
        }
    }

    // -- plan cache ---------------------------------------------------------

    pub fn load_plan_cache(&self) -> Option<Vec<PlanCacheEntry>> {
        let content = fs::read_to_string(&self.cache_path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn save_plan_cache(&self, entries: &[PlanCacheEntry]) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.cache_path, json)?;
        Ok(())
    }

    /// Cached prescription for a (date, session type) pair, if any
    pub fn lookup_plan_cache(
        &self,
        date: NaiveDate,
        session_type: SessionType,
    ) -> Option<PlanCacheEntry> {
        self.load_plan_cache()?
            .into_iter()
            .find(|e| e.date == date && e.session_type == session_type)
    }
}

/// Human-readable differences between two plan snapshots
pub fn diff_plan_cache(old: &[PlanCacheEntry], new: &[PlanCacheEntry]) -> Vec<String> {
    let key = |e: &PlanCacheEntry| (e.date, e.session_type);
    let mut changes = Vec::new();

    for entry in new {
        if !old.iter().any(|o| key(o) == key(entry)) {
            changes.push(format!("New: {} {}", entry.date, entry.session_type));
        }
    }
    for entry in old {
        if !new.iter().any(|n| key(n) == key(entry)) {
            changes.push(format!("Removed: {} {}", entry.date, entry.session_type));
        }
    }
    for entry in new {
        let Some(prev) = old.iter().find(|o| key(o) == key(entry)) else {
            continue;
        };
        let mut parts = Vec::new();
        if prev.sets != entry.sets {
            parts.push(format!("{}→{} sets", prev.sets, entry.sets));
        }
        if prev.reps != entry.reps {
            parts.push(format!("{}→{} reps", prev.reps, entry.reps));
        }
        if (prev.weight_kg - entry.weight_kg).abs() > 0.01 {
            parts.push(format!("+{:.1}→+{:.1} kg", prev.weight_kg, entry.weight_kg));
        }
        if prev.expected_tm != entry.expected_tm {
            parts.push(format!("TM {}→{}", prev.expected_tm, entry.expected_tm));
        }
        if !parts.is_empty() {
            changes.push(format!(
                "{} {}: {}",
                entry.date,
                entry.session_type,
                parts.join(", ")
            ));
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompletedSet, RestPreference, Sex};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> HistoryStore {
        let store = HistoryStore::new(dir.path().join("pull_up_history.jsonl"), "pull_up");
        store.init().unwrap();
        store
            .save_profile(&UserProfile {
                height_cm: 183,
                sex: Sex::Male,
                current_bodyweight_kg: 82.0,
                days_per_week: 3,
                exercise_days: BTreeMap::new(),
                exercise_targets: BTreeMap::new(),
                exercises_enabled: vec!["pull_up".to_string()],
                plan_start_dates: BTreeMap::new(),
                plan_weeks: BTreeMap::new(),
                rest_preference: RestPreference::Normal,
                equipment: BTreeMap::new(),
                injury_notes: None,
            })
            .unwrap();
        store
    }

    fn session(date_str: &str, session_type: SessionType, reps: &[u32]) -> SessionResult {
        SessionResult {
            date: date_str.parse().unwrap(),
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
    fn test_append_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.append_session(&session("2026-02-04", SessionType::H, &[7, 7])).unwrap();
        store.append_session(&session("2026-02-02", SessionType::S, &[5, 5])).unwrap();

        let history = store.load_history().unwrap();
        assert_eq!(history.len(), 2);
        // Chronological regardless of append order
        assert_eq!(history[0].session_type, SessionType::S);
        assert_eq!(history[1].session_type, SessionType::H);
    }

    #[test]
    fn test_append_same_date_same_type_replaces() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.append_session(&session("2026-02-02", SessionType::S, &[5])).unwrap();
        store.append_session(&session("2026-02-02", SessionType::S, &[8, 8])).unwrap();

        let history = store.load_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sets.len(), 2);
    }

    #[test]
    fn test_delete_record_by_id() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.append_session(&session("2026-02-02", SessionType::S, &[5])).unwrap();
        store.append_session(&session("2026-02-04", SessionType::H, &[7])).unwrap();

        let removed = store.delete_record(1).unwrap();
        assert_eq!(removed.session_type, SessionType::S);
        assert_eq!(store.load_history().unwrap().len(), 1);

        assert!(store.delete_record(5).is_err());
    }

    #[test]
    fn test_unknown_exercise_is_inconsistent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut bad = session("2026-02-02", SessionType::S, &[5]);
        bad.exercise_id = "bench_press".to_string();
        let line = serde_json::to_string(&bad).unwrap();
        fs::write(store.history_path(), format!("{line}\n")).unwrap();

        match store.load_history() {
            Err(BarplanError::Inconsistent(msg)) => assert!(msg.contains("bench_press")),
            other => panic!("expected Inconsistent, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_history_file() {
        let store = HistoryStore::new("/nonexistent/nowhere.jsonl", "pull_up");
        assert!(matches!(
            store.load_history(),
            Err(BarplanError::HistoryNotFound { .. })
        ));
    }

    #[test]
    fn test_shift_forward_appends_rest_and_moves_anchor() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.append_session(&session("2026-02-04", SessionType::S, &[5])).unwrap();

        let outcome = store.shift_plan("2026-02-06".parse().unwrap(), 3).unwrap();
        assert_eq!(outcome.rest_records_added, 3);
        assert_eq!(outcome.new_plan_start, "2026-02-09".parse().unwrap());
        assert_eq!(store.plan_start_date(), Some("2026-02-09".parse().unwrap()));

        let history = store.load_history().unwrap();
        let rests: Vec<NaiveDate> = history
            .iter()
            .filter(|s| s.session_type == SessionType::Rest)
            .map(|s| s.date)
            .collect();
        assert_eq!(
            rests,
            vec![
                "2026-02-06".parse().unwrap(),
                "2026-02-07".parse().unwrap(),
                "2026-02-08".parse().unwrap(),
            ]
        );
    }

    #[test]
    fn test_shift_backward_removes_only_in_range_rest() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.append_session(&session("2026-02-04", SessionType::S, &[5])).unwrap();
        store.shift_plan("2026-02-06".parse().unwrap(), 3).unwrap();

        let outcome = store.shift_plan("2026-02-09".parse().unwrap(), -2).unwrap();
        assert_eq!(outcome.rest_records_removed, 2);
        assert_eq!(outcome.new_plan_start, "2026-02-07".parse().unwrap());

        let history = store.load_history().unwrap();
        let rests: Vec<NaiveDate> = history
            .iter()
            .filter(|s| s.session_type == SessionType::Rest)
            .map(|s| s.date)
            .collect();
        // The 02-06 REST is outside [02-07, 02-09) and survives
        assert_eq!(rests, vec!["2026-02-06".parse::<NaiveDate>().unwrap()]);
        // The S record was never a candidate for removal
        assert!(history.iter().any(|s| s.session_type == SessionType::S));
    }

    #[test]
    fn test_shift_backward_clamps_to_first_training_date() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.append_session(&session("2026-02-04", SessionType::S, &[5])).unwrap();
        store.shift_plan("2026-02-05".parse().unwrap(), 1).unwrap();

        // Asking to move the anchor a week before any training clamps it
        let outcome = store.shift_plan("2026-02-06".parse().unwrap(), -7).unwrap();
        assert_eq!(outcome.new_plan_start, "2026-02-04".parse().unwrap());
    }

    #[test]
    fn test_plan_cache_roundtrip_and_lookup() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let entries = vec![PlanCacheEntry {
            date: "2026-02-09".parse().unwrap(),
            session_type: SessionType::S,
            sets: 4,
            reps: 5,
            weight_kg: 1.0,
            rest_s: 240,
            expected_tm: 10,
        }];
        store.save_plan_cache(&entries).unwrap();

        assert_eq!(store.load_plan_cache(), Some(entries.clone()));
        let hit = store
            .lookup_plan_cache("2026-02-09".parse().unwrap(), SessionType::S)
            .unwrap();
        assert_eq!(hit.reps, 5);
        assert!(store
            .lookup_plan_cache("2026-02-09".parse().unwrap(), SessionType::H)
            .is_none());
    }

    #[test]
    fn test_diff_plan_cache_reports_changes() {
        let old = vec![PlanCacheEntry {
            date: "2026-02-09".parse().unwrap(),
            session_type: SessionType::S,
            sets: 4,
            reps: 5,
            weight_kg: 0.0,
            rest_s: 240,
            expected_tm: 10,
        }];
        let mut updated = old.clone();
        updated[0].reps = 6;
        updated[0].expected_tm = 11;
        updated.push(PlanCacheEntry {
            date: "2026-02-11".parse().unwrap(),
            session_type: SessionType::H,
            sets: 5,
            reps: 7,
            weight_kg: 0.0,
            rest_s: 150,
            expected_tm: 11,
        });

        let changes = diff_plan_cache(&old, &updated);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().any(|c| c.starts_with("New: 2026-02-11")));
        assert!(changes.iter().any(|c| c.contains("5→6 reps") && c.contains("TM 10→11")));
    }

    #[test]
    fn test_log_session_promotes_personal_best() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let config = EngineConfig::default();
        let exercise = exercises::get_exercise("pull_up").unwrap();

        let mut test = session("2026-01-05", SessionType::Test, &[10]);
        test.sets[0].rir = Some(0);
        store.append_session(&test).unwrap();

        let outcome = store
            .log_session(&config, &exercise, &session("2026-02-02", SessionType::H, &[12, 9, 8]))
            .unwrap();
        assert!(outcome.new_personal_best);
        assert_eq!(outcome.max_reps_equivalent, 12);
        assert_eq!(outcome.new_tm, Some(10));

        let history = store.load_history().unwrap();
        let tests: Vec<&SessionResult> = history
            .iter()
            .filter(|s| s.session_type == SessionType::Test)
            .collect();
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[1].date, "2026-02-02".parse::<NaiveDate>().unwrap());
        assert_eq!(tests[1].sets[0].reps, 12);
        // The H record itself is also present
        assert!(history.iter().any(|s| s.session_type == SessionType::H));
    }

    #[test]
    fn test_log_session_no_promotion_at_or_below_test_max() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let config = EngineConfig::default();
        let exercise = exercises::get_exercise("pull_up").unwrap();

        store.append_session(&session("2026-01-05", SessionType::Test, &[10])).unwrap();
        let outcome = store
            .log_session(&config, &exercise, &session("2026-02-02", SessionType::H, &[10, 8]))
            .unwrap();
        assert!(!outcome.new_personal_best);
        assert_eq!(store.load_history().unwrap().len(), 2);
    }

    #[test]
    fn test_log_session_weighted_equivalent_counts() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let config = EngineConfig::default();
        let exercise = exercises::get_exercise("pull_up").unwrap();

        store.append_session(&session("2026-01-05", SessionType::Test, &[10])).unwrap();
        let mut weighted = session("2026-02-02", SessionType::S, &[]);
        // 10 reps at +8.2 kg on 82 kg: equivalent 10 * 1.1 = 11
        weighted.sets = vec![CompletedSet { reps: 10, weight_kg: 8.2, rest_s: 240, rir: None }];
        let outcome = store.log_session(&config, &exercise, &weighted).unwrap();
        assert_eq!(outcome.max_reps_equivalent, 11);
        assert!(outcome.new_personal_best);
    }

    #[test]
    fn test_bodyweight_update() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.update_bodyweight(80.5).unwrap();
        assert_eq!(store.load_profile().unwrap().current_bodyweight_kg, 80.5);
    }
}
