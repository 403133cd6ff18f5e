//! barplan CLI: adaptive planning for pull-ups, dips and split squats.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use barplan::adaptation::training_status;
use barplan::config::EngineConfig;
use barplan::error::BarplanError;
use barplan::exercises::{self, ExerciseDefinition};
use barplan::models::{
    CompletedSet, EquipmentSetting, ExerciseTarget, PlannedSet, SessionResult, SessionType, Sex,
    TimelineStatus, UserProfile,
};
use barplan::metrics::{session_avg_rest, session_max_bw_only, session_total_reps};
use barplan::planner::{generate_plan, PlanOutcome, PlanRequest};
use barplan::store::{diff_plan_cache, HistoryStore, PlanCacheEntry};
use barplan::timeline::{build_timeline, max_projection};
use barplan::{logging, parse, views};

/// Adaptive multi-week planner for bodyweight bar training
#[derive(Parser)]
#[command(name = "barplan")]
#[command(version)]
#[command(about = "Adaptive training planner for pull-ups, dips and Bulgarian split squats")]
struct Cli {
    /// Exercise to operate on
    #[arg(short, long, global = true, default_value = "pull_up")]
    exercise: String,

    /// Override the history file location
    #[arg(long, global = true, value_name = "FILE")]
    history_path: Option<PathBuf>,

    /// Emit machine-readable JSON on stdout
    #[arg(short, long, global = true)]
    json: bool,

    /// Increase diagnostic verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the profile and an empty history file
    Init {
        /// Height in cm
        #[arg(long, default_value = "175")]
        height_cm: u32,

        /// Biological sex (male | female)
        #[arg(long, default_value = "male")]
        sex: String,

        /// Current bodyweight in kg
        #[arg(short = 'w', long)]
        bodyweight_kg: f64,

        /// Training days per week (1-5)
        #[arg(short, long, default_value = "3")]
        days: u8,

        /// Current max reps; logged as a baseline TEST
        #[arg(short, long)]
        baseline: Option<u32>,

        /// Goal in reps for this exercise
        #[arg(long)]
        target_reps: Option<u32>,
    },

    /// Show the unified training log: past results and the upcoming plan
    Plan {
        /// Weeks to plan ahead (persisted for later runs)
        #[arg(short, long)]
        weeks: Option<u32>,

        /// Baseline max reps when no history exists
        #[arg(short, long)]
        baseline_max: Option<u32>,
    },

    /// Log a completed training session
    LogSession {
        /// Session date (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<String>,

        /// Bodyweight in kg (default: profile value)
        #[arg(short = 'w', long)]
        bodyweight_kg: Option<f64>,

        /// Variant/grip (default: the exercise's primary variant)
        #[arg(short = 'g', long)]
        variant: Option<String>,

        /// Session type: S | H | E | T | M (max test)
        #[arg(short = 't', long)]
        session_type: String,

        /// Sets, e.g. "8@0/180,6@0" or "4x5 +2.5kg / 240s"
        #[arg(short, long)]
        sets: String,

        /// Reps in reserve on the last set (0 = failure)
        #[arg(long)]
        rir: Option<u8>,

        /// Free-text note
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Display logged sessions
    ShowHistory {
        /// Only the most recent N sessions
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// ASCII plot of TEST maxes over time
    PlotMax {
        /// Overlay the projected progression toward the goal
        #[arg(short, long)]
        trajectory: bool,
    },

    /// Current training status
    Status,

    /// Weekly rep volume
    Volume {
        #[arg(short, long, default_value = "4")]
        weeks: u32,
    },

    /// Show how a planned session's numbers were derived
    Explain {
        /// Date (YYYY-MM-DD) or "next"
        date: String,

        #[arg(short, long)]
        weeks: Option<u32>,
    },

    /// Shift the plan forward (logs REST days) or backward (removes them)
    Skip {
        /// Days to shift; negative undoes a previous shift
        #[arg(short, long, default_value = "1", allow_hyphen_values = true)]
        days: i64,

        /// First day of the shift window (default today)
        #[arg(short, long)]
        from: Option<String>,
    },

    /// Remove a session by its id (see show-history)
    DeleteRecord {
        record_id: usize,
    },

    /// Update the stored bodyweight
    UpdateWeight {
        bodyweight_kg: f64,
    },

    /// Estimate the one-rep max from recent loaded sets
    #[command(name = "1rm")]
    OneRm,

    /// Update the equipment on record for this exercise
    UpdateEquipment {
        /// Active item, e.g. BAR_ONLY, BAND_MEDIUM, DB_PAIR
        #[arg(short, long)]
        item: String,

        /// Assistance in kg for assistive items
        #[arg(short, long, default_value = "0")]
        assistance_kg: f64,

        /// Rear-foot elevation height in cm
        #[arg(long)]
        elevation_cm: Option<u32>,

        /// Comma-separated list of owned items
        #[arg(long)]
        available: Option<String>,
    },

    /// Explain how the planner adapts as history accumulates
    HelpAdaptation,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        match err.downcast_ref::<BarplanError>() {
            Some(core) => views::print_error(&core.user_message()),
            None => views::print_error(&format!("{err:#}")),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let exercise = exercises::get_exercise(&cli.exercise)?;
    let store = match &cli.history_path {
        Some(path) => HistoryStore::new(path.clone(), &cli.exercise),
        None => HistoryStore::at_default_location(&cli.exercise),
    };
    let (config, warnings) = EngineConfig::load_or_default();
    for w in &warnings {
        views::print_warning(w);
    }
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Init { height_cm, sex, bodyweight_kg, days, baseline, target_reps } => {
            cmd_init(
                &store, &exercise, height_cm, &sex, bodyweight_kg, days, baseline, target_reps,
                today, cli.json,
            )
        }
        Commands::Plan { weeks, baseline_max } => {
            cmd_plan(&config, &store, &exercise, weeks, baseline_max, today, cli.json)
        }
        Commands::LogSession { date, bodyweight_kg, variant, session_type, sets, rir, notes } => {
            cmd_log_session(
                &config, &store, &exercise, date, bodyweight_kg, variant, &session_type, &sets,
                rir, notes, today, cli.json,
            )
        }
        Commands::ShowHistory { limit } => cmd_show_history(&store, &exercise, limit, cli.json),
        Commands::PlotMax { trajectory } => {
            cmd_plot_max(&config, &store, &exercise, trajectory, cli.json)
        }
        Commands::Status => cmd_status(&config, &store, &exercise, cli.json),
        Commands::Volume { weeks } => cmd_volume(&store, &exercise, weeks, cli.json),
        Commands::Explain { date, weeks } => {
            cmd_explain(&config, &store, &exercise, &date, weeks, today)
        }
        Commands::Skip { days, from } => cmd_skip(&store, days, from, today),
        Commands::DeleteRecord { record_id } => cmd_delete_record(&store, record_id),
        Commands::UpdateWeight { bodyweight_kg } => {
            store.update_bodyweight(bodyweight_kg)?;
            views::print_success(&format!("Bodyweight updated to {bodyweight_kg:.1} kg"));
            Ok(())
        }
        Commands::OneRm => cmd_one_rm(&store, &exercise, cli.json),
        Commands::UpdateEquipment { item, assistance_kg, elevation_cm, available } => {
            cmd_update_equipment(&store, &exercise, item, assistance_kg, elevation_cm, available)
        }
        Commands::HelpAdaptation => {
            println!("{ADAPTATION_GUIDE}");
            Ok(())
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    value
        .parse::<NaiveDate>()
        .map_err(|_| BarplanError::InvalidInput(format!("bad date {value:?}, expected YYYY-MM-DD")))
        .map_err(Into::into)
}

/// Records for this store's exercise only
fn exercise_history(store: &HistoryStore, exercise: &ExerciseDefinition) -> Result<Vec<SessionResult>> {
    let history = store.load_history()?;
    Ok(history
        .into_iter()
        .filter(|s| s.exercise_id == exercise.exercise_id)
        .collect())
}

/// Where the next plan starts: the stored anchor, advanced past the last
/// logged record. This is what makes trailing REST records (from `skip`)
/// push the plan to `last_rest_date + 1`.
fn effective_plan_start(
    store: &HistoryStore,
    history: &[SessionResult],
    today: NaiveDate,
) -> NaiveDate {
    let base = store
        .plan_start_date()
        .or_else(|| history.first().map(|s| s.date + chrono::Duration::days(1)))
        .unwrap_or(today + chrono::Duration::days(1));

    match history.last().map(|s| s.date) {
        Some(last) if last >= base => last + chrono::Duration::days(1),
        _ => base,
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_init(
    store: &HistoryStore,
    exercise: &ExerciseDefinition,
    height_cm: u32,
    sex: &str,
    bodyweight_kg: f64,
    days: u8,
    baseline: Option<u32>,
    target_reps: Option<u32>,
    today: NaiveDate,
    json: bool,
) -> Result<()> {
    let sex = match sex.to_lowercase().as_str() {
        "male" | "m" => Sex::Male,
        "female" | "f" => Sex::Female,
        other => {
            return Err(
                BarplanError::InvalidInput(format!("sex must be male or female, got {other:?}"))
                    .into(),
            )
        }
    };
    if !(1..=5).contains(&days) {
        return Err(BarplanError::InvalidInput(format!("days must be 1..5, got {days}")).into());
    }

    store.init()?;

    let mut profile = store.load_profile().unwrap_or(UserProfile {
        height_cm,
        sex,
        current_bodyweight_kg: bodyweight_kg,
        days_per_week: days,
        exercise_days: Default::default(),
        exercise_targets: Default::default(),
        exercises_enabled: vec!["pull_up".into(), "dip".into(), "bss".into()],
        plan_start_dates: Default::default(),
        plan_weeks: Default::default(),
        rest_preference: Default::default(),
        equipment: Default::default(),
        injury_notes: None,
    });
    profile.height_cm = height_cm;
    profile.sex = sex;
    profile.current_bodyweight_kg = bodyweight_kg;
    profile.days_per_week = days;
    if let Some(reps) = target_reps {
        profile
            .exercise_targets
            .insert(exercise.exercise_id.clone(), ExerciseTarget { reps, weight_kg: 0.0 });
    }

    // Anchor the plan on the next Monday
    let days_to_monday = 7 - chrono::Datelike::weekday(&today).num_days_from_monday() as i64;
    let plan_start = today + chrono::Duration::days(days_to_monday);
    profile
        .plan_start_dates
        .insert(exercise.exercise_id.clone(), plan_start);
    store.save_profile(&profile)?;

    if let Some(max_reps) = baseline {
        let test = barplan::planner::synthetic_baseline_test(today, bodyweight_kg, max_reps, exercise);
        store.append_session(&test)?;
    }

    if json {
        println!(
            "{}",
            serde_json::json!({
                "exercise": exercise.exercise_id,
                "plan_start": plan_start,
                "baseline": baseline,
            })
        );
    } else {
        views::print_success(&format!(
            "Profile saved. {} plan starts {plan_start}.",
            exercise.display_name
        ));
        if let Some(max_reps) = baseline {
            views::print_info(&format!("Baseline TEST logged: {max_reps} reps."));
        }
    }
    Ok(())
}

fn cmd_plan(
    config: &EngineConfig,
    store: &HistoryStore,
    exercise: &ExerciseDefinition,
    weeks: Option<u32>,
    baseline_max: Option<u32>,
    today: NaiveDate,
    json: bool,
) -> Result<()> {
    let profile = store.load_profile()?;
    let history = exercise_history(store, exercise)?;
    let plan_start = effective_plan_start(store, &history, today);

    let weeks_ahead = match weeks {
        Some(w) => {
            store.set_plan_weeks(w)?;
            Some(w)
        }
        None => store.plan_weeks().or(Some(config.plan.default_weeks)),
    };

    let request = PlanRequest {
        config,
        exercise,
        profile: &profile,
        history: &history,
        plan_start,
        weeks: weeks_ahead,
        baseline_max,
        today,
    };
    let outcome = generate_plan(&request)?;
    let entries = build_timeline(&outcome.plans, &history, today);

    // Change detection against the previous snapshot
    let new_cache: Vec<PlanCacheEntry> = entries
        .iter()
        .filter(|e| matches!(e.status, TimelineStatus::Next | TimelineStatus::Planned))
        .filter_map(|e| {
            let sets = e.prescribed.as_deref()?;
            let first = sets.first()?;
            Some(PlanCacheEntry {
                date: e.date,
                session_type: e.session_type,
                sets: sets.len() as u32,
                reps: first.reps,
                weight_kg: first.weight_kg,
                rest_s: first.rest_s,
                expected_tm: e.expected_tm,
            })
        })
        .collect();
    let plan_changes = match store.load_plan_cache() {
        Some(old) => diff_plan_cache(&old, &new_cache),
        None => Vec::new(),
    };
    store.save_plan_cache(&new_cache)?;

    let target = profile.target_for_exercise(&exercise.exercise_id).reps;

    if json {
        print_plan_json(config, &outcome, &entries, &plan_changes);
        return Ok(());
    }

    if !plan_changes.is_empty() {
        println!("{}", "Plan updated:".yellow());
        for change in plan_changes.iter().take(5) {
            println!("  {change}");
        }
        println!();
    }
    if let Some(test_max) = outcome.status.latest_test_max {
        if test_max >= target {
            println!(
                "{} Your test max ({test_max}) meets your goal ({target} reps).",
                "Goal reached!".green().bold()
            );
        }
    }
    if outcome.severity.extra_rest_days > 0 {
        views::print_warning(&format!(
            "Plan shifted +{} days for recovery ({}).",
            outcome.severity.extra_rest_days, outcome.severity.description
        ));
    }
    views::print_timeline(config, &entries, &outcome.status, target);
    Ok(())
}

fn print_plan_json(
    config: &EngineConfig,
    outcome: &PlanOutcome,
    entries: &[barplan::TimelineEntry],
    plan_changes: &[String],
) {
    let status = &outcome.status;
    let sessions: Vec<serde_json::Value> = entries
        .iter()
        .map(|e| {
            let prescribed = e.prescribed.as_ref().map(|sets| {
                sets.iter()
                    .map(|s| {
                        serde_json::json!({
                            "reps": s.reps, "weight_kg": s.weight_kg, "rest_s": s.rest_s
                        })
                    })
                    .collect::<Vec<_>>()
            });
            let actual = e.actual.as_ref().map(|a| {
                a.sets
                    .iter()
                    .map(|s| {
                        serde_json::json!({
                            "reps": s.reps, "weight_kg": s.weight_kg, "rest_s": s.rest_s
                        })
                    })
                    .collect::<Vec<_>>()
            });
            let projection = match e.status {
                TimelineStatus::Next | TimelineStatus::Planned => Some(max_projection(
                    config,
                    e.expected_tm,
                    status.latest_test_max.unwrap_or(0),
                )),
                _ => None,
            };
            serde_json::json!({
                "date": e.date,
                "week": e.week_number,
                "type": e.session_type.code(),
                "variant": e.variant,
                "status": e.status,
                "id": e.history_id,
                "expected_tm": e.expected_tm,
                "prescribed_sets": prescribed,
                "actual_sets": actual,
                "max_estimate": e.max_estimate,
                "max_projection": projection,
            })
        })
        .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "status": {
                "training_max": status.training_max,
                "latest_test_max": status.latest_test_max,
                "trend_slope_per_week": (status.trend_slope * 10_000.0).round() / 10_000.0,
                "is_plateau": status.is_plateau,
                "deload_recommended": status.deload_recommended,
                "readiness_z_score": (status.readiness_z_score * 10_000.0).round() / 10_000.0,
            },
            "sessions": sessions,
            "plan_changes": plan_changes,
        }))
        .expect("plan JSON serializes")
    );
}

#[allow(clippy::too_many_arguments)]
fn cmd_log_session(
    config: &EngineConfig,
    store: &HistoryStore,
    exercise: &ExerciseDefinition,
    date: Option<String>,
    bodyweight_kg: Option<f64>,
    variant: Option<String>,
    session_type: &str,
    sets: &str,
    rir: Option<u8>,
    notes: Option<String>,
    today: NaiveDate,
    json: bool,
) -> Result<()> {
    let date = match date {
        Some(d) => parse_date(&d)?,
        None => today,
    };
    let session_type: SessionType = session_type.parse()?;
    if session_type == SessionType::Rest {
        return Err(BarplanError::InvalidInput(
            "REST days are recorded via 'skip', not log-session".to_string(),
        )
        .into());
    }

    let profile = store.load_profile()?;
    let bodyweight_kg = bodyweight_kg.unwrap_or(profile.current_bodyweight_kg);
    if bodyweight_kg <= 0.0 {
        return Err(BarplanError::InvalidInput("bodyweight must be positive".to_string()).into());
    }

    let variant = variant.unwrap_or_else(|| exercise.primary_variant.clone());
    if !exercise.is_valid_variant(&variant) {
        return Err(BarplanError::InvalidInput(format!(
            "variant must be one of: {}",
            exercise.variants.join(", ")
        ))
        .into());
    }

    let parsed = parse::parse_sets(sets)?;
    let completed: Vec<CompletedSet> = parsed
        .iter()
        .map(|&(reps, weight_kg, rest_s)| CompletedSet { reps, weight_kg, rest_s, rir })
        .collect();

    // Freeze the prescription this session was answering, if one is cached
    let planned_sets: Option<Vec<PlannedSet>> = store
        .lookup_plan_cache(date, session_type)
        .filter(|entry| entry.sets > 0)
        .map(|entry| {
            (0..entry.sets)
                .map(|_| PlannedSet {
                    reps: entry.reps,
                    weight_kg: entry.weight_kg,
                    rest_s: entry.rest_s,
                })
                .collect()
        });

    let session = SessionResult {
        date,
        exercise_id: exercise.exercise_id.clone(),
        session_type,
        variant: variant.clone(),
        bodyweight_kg,
        sets: completed.clone(),
        planned_sets,
        equipment: profile
            .equipment
            .get(&exercise.exercise_id)
            .map(EquipmentSetting::snapshot),
        rir,
        notes,
    };
    let outcome = store.log_session(config, exercise, &session)?;

    // Keep the profile bodyweight fresh
    if (bodyweight_kg - profile.current_bodyweight_kg).abs() > 0.05 {
        store.update_bodyweight(bodyweight_kg)?;
    }

    let total_reps: u32 = completed.iter().map(|s| s.reps).sum();
    let max_bw = completed
        .iter()
        .filter(|s| s.weight_kg == 0.0)
        .map(|s| s.reps)
        .max()
        .unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "date": date,
                "session_type": session_type.code(),
                "variant": variant,
                "bodyweight_kg": bodyweight_kg,
                "total_reps": total_reps,
                "max_reps_bodyweight": max_bw,
                "max_reps_equivalent": outcome.max_reps_equivalent,
                "new_personal_best": outcome.new_personal_best,
                "new_tm": outcome.new_tm,
                "sets": completed.iter().map(|s| serde_json::json!({
                    "reps": s.reps, "weight_kg": s.weight_kg, "rest_s": s.rest_s
                })).collect::<Vec<_>>(),
            }))?
        );
        return Ok(());
    }

    views::print_success(&format!("Logged {} session for {date}", session_type.code()));
    views::print_info(&format!("Total reps: {total_reps}"));
    if outcome.new_personal_best {
        views::print_success(&format!(
            "New personal best! Auto-logged TEST ({} reps) — TM now {}.",
            outcome.max_reps_equivalent,
            outcome.new_tm.unwrap_or(0)
        ));
    }
    Ok(())
}

fn cmd_show_history(
    store: &HistoryStore,
    exercise: &ExerciseDefinition,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let mut sessions = exercise_history(store, exercise)?;
    if let Some(n) = limit {
        let skip = sessions.len().saturating_sub(n);
        sessions = sessions.split_off(skip);
    }

    if json {
        let out: Vec<serde_json::Value> = sessions
            .iter()
            .map(|s| {
                serde_json::json!({
                    "date": s.date,
                    "session_type": s.session_type.code(),
                    "variant": s.variant,
                    "bodyweight_kg": s.bodyweight_kg,
                    "total_reps": session_total_reps(s),
                    "max_reps": session_max_bw_only(s),
                    "avg_rest_s": session_avg_rest(s).round() as u32,
                    "sets": s.sets.iter().map(|set| serde_json::json!({
                        "reps": set.reps, "weight_kg": set.weight_kg, "rest_s": set.rest_s
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    views::print_history(&sessions);
    Ok(())
}

fn cmd_plot_max(
    config: &EngineConfig,
    store: &HistoryStore,
    exercise: &ExerciseDefinition,
    trajectory: bool,
    json: bool,
) -> Result<()> {
    let profile = store.load_profile()?;
    let history = exercise_history(store, exercise)?;
    let target = profile.target_for_exercise(&exercise.exercise_id).reps;

    let traj = if trajectory {
        views::build_trajectory(config, &history, target)
    } else {
        Vec::new()
    };

    if json {
        let points: Vec<serde_json::Value> = barplan::metrics::test_sessions(&history)
            .into_iter()
            .filter(|s| session_max_bw_only(s) > 0)
            .map(|s| serde_json::json!({"date": s.date, "max_reps": session_max_bw_only(s)}))
            .collect();
        let traj_json: Vec<serde_json::Value> = traj
            .iter()
            .map(|(d, v)| {
                serde_json::json!({"date": d, "projected_reps": (v * 100.0).round() / 100.0})
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "data_points": points,
                "trajectory": if trajectory { Some(traj_json) } else { None },
            }))?
        );
        return Ok(());
    }

    views::print_max_plot(&history, &traj, &exercise.display_name, target);
    Ok(())
}

fn cmd_status(
    config: &EngineConfig,
    store: &HistoryStore,
    exercise: &ExerciseDefinition,
    json: bool,
) -> Result<()> {
    let profile = store.load_profile()?;
    let history = exercise_history(store, exercise)?;
    let status = training_status(config, exercise, &history, profile.current_bodyweight_kg, None);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "training_max": status.training_max,
                "latest_test_max": status.latest_test_max,
                "trend_slope_per_week": (status.trend_slope * 10_000.0).round() / 10_000.0,
                "is_plateau": status.is_plateau,
                "deload_recommended": status.deload_recommended,
                "readiness_z_score": (status.readiness_z_score * 10_000.0).round() / 10_000.0,
                "fitness": (status.fitness * 10_000.0).round() / 10_000.0,
                "fatigue": (status.fatigue * 10_000.0).round() / 10_000.0,
            }))?
        );
        return Ok(());
    }

    let target = profile.target_for_exercise(&exercise.exercise_id).reps;
    println!();
    println!("{}", views::format_status(&status, target));
    println!();
    Ok(())
}

fn cmd_volume(
    store: &HistoryStore,
    exercise: &ExerciseDefinition,
    weeks: u32,
    json: bool,
) -> Result<()> {
    let sessions = exercise_history(store, exercise)?;

    if json {
        let rows: Vec<serde_json::Value> = views::weekly_volume(&sessions, weeks)
            .into_iter()
            .map(|(label, total)| serde_json::json!({"label": label, "total_reps": total}))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "weeks": rows }))?
        );
        return Ok(());
    }

    views::print_volume_chart(&sessions, weeks);
    Ok(())
}

fn cmd_explain(
    config: &EngineConfig,
    store: &HistoryStore,
    exercise: &ExerciseDefinition,
    date_arg: &str,
    weeks: Option<u32>,
    today: NaiveDate,
) -> Result<()> {
    let profile = store.load_profile()?;
    let history = exercise_history(store, exercise)?;
    let plan_start = effective_plan_start(store, &history, today);

    let request = PlanRequest {
        config,
        exercise,
        profile: &profile,
        history: &history,
        plan_start,
        weeks: weeks.or_else(|| store.plan_weeks()).or(Some(config.plan.default_weeks)),
        baseline_max: None,
        today,
    };
    let outcome = generate_plan(&request)?;

    let target_date = if date_arg.eq_ignore_ascii_case("next") {
        outcome
            .plans
            .iter()
            .map(|p| p.date)
            .find(|d| *d >= today)
            .ok_or_else(|| BarplanError::MissingState("no upcoming session in plan".to_string()))?
    } else {
        parse_date(date_arg)?
    };

    match outcome.traces.iter().find(|t| t.date == target_date) {
        Some(trace) => {
            println!();
            println!("{}", views::format_explain(trace));
            println!();
        }
        None => {
            let horizon_end =
                outcome.effective_start + chrono::Duration::weeks(outcome.plans.len() as i64);
            if target_date >= outcome.effective_start && target_date <= horizon_end {
                println!("Rest day · {target_date}: no session scheduled for this date.");
            } else if let Some(past) = history.iter().find(|s| s.date == target_date) {
                println!(
                    "Logged on {target_date}: {} · {} total reps · {:.1} kg BW",
                    past.session_type.code(),
                    session_total_reps(past),
                    past.bodyweight_kg
                );
            } else {
                views::print_warning(&format!(
                    "No planned session on {target_date} (plan starts {}).",
                    outcome.effective_start
                ));
            }
        }
    }
    Ok(())
}

fn cmd_skip(
    store: &HistoryStore,
    days: i64,
    from: Option<String>,
    today: NaiveDate,
) -> Result<()> {
    let from_date = match from {
        Some(d) => parse_date(&d)?,
        None => today,
    };
    let outcome = store.shift_plan(from_date, days)?;
    if days > 0 {
        views::print_success(&format!(
            "Plan shifted +{days} day(s): {} REST day(s) logged, next plan starts {}.",
            outcome.rest_records_added, outcome.new_plan_start
        ));
    } else {
        views::print_success(&format!(
            "Shift undone: {} REST day(s) removed, next plan starts {}.",
            outcome.rest_records_removed, outcome.new_plan_start
        ));
    }
    Ok(())
}

fn cmd_delete_record(store: &HistoryStore, record_id: usize) -> Result<()> {
    let removed = store.delete_record(record_id)?;
    views::print_success(&format!(
        "Deleted session #{record_id}: {} ({})",
        removed.date,
        removed.session_type.code()
    ));
    Ok(())
}

fn cmd_one_rm(store: &HistoryStore, exercise: &ExerciseDefinition, json: bool) -> Result<()> {
    let profile = store.load_profile()?;
    let history = exercise_history(store, exercise)?;

    let estimate = barplan::onerm::estimate_1rm(exercise, profile.current_bodyweight_kg, &history)
        .ok_or_else(|| {
            BarplanError::MissingState("not enough data to estimate a 1RM".to_string())
        })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
        return Ok(());
    }

    println!();
    println!(
        "{}",
        format!("1RM estimate — {}", exercise.display_name).bold()
    );
    println!(
        "  best set: {} reps @ +{} kg  ({})",
        estimate.best_reps, estimate.best_added_weight_kg, estimate.best_date
    );
    println!("  effective load: {} kg", estimate.effective_load_kg);
    let rows = [
        ("Epley", Some(estimate.formulas.epley)),
        ("Brzycki", estimate.formulas.brzycki),
        ("Lander", estimate.formulas.lander),
        ("Lombardi", Some(estimate.formulas.lombardi)),
        ("Blended", estimate.formulas.blended),
    ];
    for (name, value) in rows {
        let star = if name.eq_ignore_ascii_case(&estimate.recommended_formula) {
            " *"
        } else {
            ""
        };
        match value {
            Some(v) => println!("  {name:<10} {v:>7} kg{star}"),
            None => println!("  {name:<10}     n/a"),
        }
    }
    println!("  * most representative for a {}-rep set", estimate.best_reps);
    println!();
    Ok(())
}

fn cmd_update_equipment(
    store: &HistoryStore,
    exercise: &ExerciseDefinition,
    item: String,
    assistance_kg: f64,
    elevation_cm: Option<u32>,
    available: Option<String>,
) -> Result<()> {
    if assistance_kg < 0.0 {
        return Err(
            BarplanError::InvalidInput("assistance_kg must be non-negative".to_string()).into(),
        );
    }
    let mut profile = store.load_profile().context("profile required")?;
    let entry = profile
        .equipment
        .entry(exercise.exercise_id.clone())
        .or_insert(EquipmentSetting {
            available_items: Vec::new(),
            active_item: item.clone(),
            assistance_kg,
            elevation_height_cm: elevation_cm,
        });
    entry.active_item = item.clone();
    entry.assistance_kg = assistance_kg;
    entry.elevation_height_cm = elevation_cm;
    if let Some(list) = available {
        entry.available_items = list.split(',').map(|s| s.trim().to_string()).collect();
    }
    if !entry.available_items.iter().any(|i| *i == item) {
        entry.available_items.push(item.clone());
    }
    store.save_profile(&profile)?;
    views::print_success(&format!(
        "Equipment for {} set to {item} (assistance {assistance_kg:.1} kg).",
        exercise.display_name
    ));
    Ok(())
}

const ADAPTATION_GUIDE: &str = "\
HOW THE PLANNER LEARNS FROM YOUR DATA

  Day 1 (no history)    Generic safe plan from your baseline max.
                        Conservative volume; no weighted work until the
                        training max clears the threshold.

  Weeks 1-2             The max estimate starts tracking; short rest is
  (3-8 sessions)        credited in performance normalization.
                        No autoregulation yet. Log rest times accurately.

  Weeks 3-4             Autoregulation activates (>= 10 sessions).
  (10-16 sessions)      Plateau detection possible; rest adapts to your
                        RIR and drop-off. Do your first re-test.

  Weeks 6-8             Deload triggers become reliable. Trust the deload
  (24-32 sessions)      when it is recommended.

  Weeks 12+             Full training profile established; progression
  (48+ sessions)        rate calibrated to your response.

TIPS
  - Log every session, including bad ones; RIR 0 is valuable data.
  - Do a TEST every 3-4 weeks; it anchors the max estimate.
  - Update bodyweight when it changes by 1 kg or more.
  - Past prescriptions are frozen; only future sessions adapt.
  - Each exercise has its own plan and its own adaptation timeline.";
