//! Console rendering: the unified timeline table, status panel, history
//! table, weekly volume chart, ASCII max plot and the explain formatter.
//!
//! Pure formatting over data the engine already produced; nothing here
//! recomputes a prescription.

use chrono::NaiveDate;
use colored::Colorize;

use crate::config::EngineConfig;
use crate::metrics::{
    session_avg_rest, session_max_bw_only, session_total_reps, test_sessions, training_max_from,
};
use crate::models::{
    PlannedSet, SessionResult, SessionType, TimelineEntry, TimelineStatus, TrainingStatus,
};
use crate::planner::PlanTrace;
use crate::timeline::max_projection;

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{} {}", "ok:".green().bold(), msg);
}

pub fn print_info(msg: &str) {
    println!("{}", msg.dimmed());
}

/// Compact prescription string: "4x5 +1.0kg / 240s" or "8,6,5 / 60s"
pub fn fmt_planned_sets(sets: &[PlannedSet], session_type: SessionType) -> String {
    if sets.is_empty() {
        return "—".to_string();
    }
    if session_type == SessionType::Test {
        return "1 x max reps".to_string();
    }

    let reps: Vec<u32> = sets.iter().map(|s| s.reps).collect();
    let weight = sets[0].weight_kg;
    let rest = sets[0].rest_s;

    let base = if reps.iter().all(|&r| r == reps[0]) {
        format!("{}x{}", sets.len(), reps[0])
    } else {
        reps.iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(",")
    };

    let weight_str = if weight > 0.0 {
        format!(" +{weight:.1}kg")
    } else {
        String::new()
    };
    format!("{base}{weight_str} / {rest}s")
}

/// Compact rendering of what was actually performed
pub fn fmt_actual(session: &SessionResult) -> String {
    if session.sets.is_empty() {
        return "—".to_string();
    }
    if session.session_type == SessionType::Test {
        return format!("{} reps (max)", session_max_bw_only(session));
    }

    let reps: Vec<String> = session.sets.iter().map(|s| s.reps.to_string()).collect();
    let total = session_total_reps(session);
    let weight = session.sets[0].weight_kg;
    let weight_str = if weight > 0.0 {
        format!(" +{weight:.1}kg")
    } else {
        String::new()
    };
    let rirs: Vec<u8> = session.sets.iter().filter_map(|s| s.rir).collect();
    let rir_str = if rirs.is_empty() {
        String::new()
    } else {
        let avg = rirs.iter().map(|&r| r as f64).sum::<f64>() / rirs.len() as f64;
        format!(" RIR~{}", avg.round() as u32)
    };
    format!("{} = {}{}{}", reps.join("+"), total, weight_str, rir_str)
}

fn fmt_date_cell(date: NaiveDate, status: TimelineStatus) -> String {
    format!("{} {}", status.marker(), date.format("%m.%d(%a)"))
}

/// Status panel shown above the timeline
pub fn format_status(status: &TrainingStatus, target_reps: u32) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "TM {}  ·  last test {}  ·  goal {}",
        status.training_max.to_string().bold(),
        status
            .latest_test_max
            .map(|m| m.to_string())
            .unwrap_or_else(|| "—".to_string()),
        target_reps
    ));
    lines.push(format!(
        "trend {:+.2} reps/wk  ·  readiness z {:+.2}  ·  compliance {:.0}%",
        status.trend_slope,
        status.readiness_z_score,
        status.compliance_ratio * 100.0
    ));
    if status.is_plateau {
        lines.push("plateau detected".yellow().to_string());
    }
    if status.deload_recommended {
        lines.push("deload recommended".yellow().bold().to_string());
    }
    lines.join("\n")
}

/// The unified plan/history table
pub fn print_timeline(
    config: &EngineConfig,
    entries: &[TimelineEntry],
    status: &TrainingStatus,
    target_reps: u32,
) {
    println!();
    println!("{}", format_status(status, target_reps));
    println!();
    println!(
        "{:<14} {:>3}  {:<4} {:<9} {:<22} {:<26} {}",
        "date", "wk", "type", "variant", "prescribed", "actual", "max est"
    );
    println!("{}", "─".repeat(96).dimmed());

    let mut last_week = 0;
    for entry in entries {
        if entry.week_number != last_week && last_week != 0 {
            println!();
        }
        last_week = entry.week_number;

        let prescribed = entry
            .prescribed
            .as_deref()
            .map(|s| fmt_planned_sets(s, entry.session_type))
            .unwrap_or_else(|| "—".to_string());
        let actual = entry
            .actual
            .as_ref()
            .map(fmt_actual)
            .unwrap_or_else(|| "—".to_string());

        let est = match entry.status {
            TimelineStatus::Planned | TimelineStatus::Next => {
                let latest = status.latest_test_max.unwrap_or(0);
                format!("→{}", max_projection(config, entry.expected_tm, latest))
            }
            _ => entry
                .max_estimate
                .map(|e| format!("~{}/{}", e.fi_est, e.nuzzo_est))
                .unwrap_or_default(),
        };

        let line = format!(
            "{:<14} {:>3}  {:<4} {:<9} {:<22} {:<26} {}",
            fmt_date_cell(entry.date, entry.status),
            entry.week_number,
            entry.session_type.code(),
            entry.variant,
            prescribed,
            actual,
            est
        );

        match entry.status {
            TimelineStatus::Next => println!("{}", line.bold()),
            TimelineStatus::Missed => println!("{}", line.dimmed()),
            TimelineStatus::Rested => println!("{}", line.dimmed()),
            _ => println!("{line}"),
        }
    }
    println!();
}

/// History table with 1-based ids for delete-record
pub fn print_history(sessions: &[SessionResult]) {
    println!();
    println!(
        "{:>3}  {:<12} {:<4} {:<9} {:>6} {:>5} {:>6}  {}",
        "#", "date", "type", "variant", "total", "max", "rest", "sets"
    );
    println!("{}", "─".repeat(80).dimmed());
    for (i, s) in sessions.iter().enumerate() {
        let sets: Vec<String> = s
            .sets
            .iter()
            .map(|set| {
                if set.weight_kg > 0.0 {
                    format!("{}@+{:.1}", set.reps, set.weight_kg)
                } else {
                    set.reps.to_string()
                }
            })
            .collect();
        println!(
            "{:>3}  {:<12} {:<4} {:<9} {:>6} {:>5} {:>5}s  {}",
            i + 1,
            s.date,
            s.session_type.code(),
            s.variant,
            session_total_reps(s),
            session_max_bw_only(s),
            session_avg_rest(s).round(),
            sets.join(", ")
        );
    }
    println!();
}

/// Weekly total-rep aggregation, most recent week last.
///
/// Week 0 is the 7 days ending at the latest history date.
pub fn weekly_volume(sessions: &[SessionResult], weeks: u32) -> Vec<(String, u32)> {
    let mut totals = vec![0u32; weeks as usize];
    if let Some(latest) = sessions.last().map(|s| s.date) {
        for s in sessions {
            let ago = ((latest - s.date).num_days() / 7) as u32;
            if ago < weeks {
                totals[ago as usize] += session_total_reps(s);
            }
        }
    }

    (0..weeks)
        .rev()
        .map(|i| {
            let label = match i {
                0 => "This week".to_string(),
                1 => "Last week".to_string(),
                n => format!("{n} weeks ago"),
            };
            (label, totals[i as usize])
        })
        .collect()
}

/// Horizontal bar chart of weekly volume
pub fn print_volume_chart(sessions: &[SessionResult], weeks: u32) {
    let rows = weekly_volume(sessions, weeks);
    let max = rows.iter().map(|(_, v)| *v).max().unwrap_or(0).max(1);
    println!();
    for (label, total) in rows {
        let width = (total as f64 / max as f64 * 40.0).round() as usize;
        println!("{label:>13}  {} {total}", "█".repeat(width).cyan());
    }
    println!();
}

/// Projected bodyweight-reps trajectory from the latest TEST toward the
/// goal, one point per week, produced by iterating the progression curve.
pub fn build_trajectory(
    config: &EngineConfig,
    history: &[SessionResult],
    target_reps: u32,
) -> Vec<(NaiveDate, f64)> {
    let Some(latest) = test_sessions(history).last().copied() else {
        return Vec::new();
    };
    let start_max = session_max_bw_only(latest);
    if start_max == 0 {
        return Vec::new();
    }

    let tm_factor = config.adaptation.tm_factor;
    let tm_target = (target_reps as f64 * tm_factor) as u32;
    let mut points = Vec::new();
    let mut date = latest.date;
    let mut tm_f = training_max_from(config, start_max) as f64;
    let horizon_end = latest.date + chrono::Duration::weeks(104);

    while (tm_f as u32) < tm_target && date <= horizon_end {
        points.push((date, tm_f / tm_factor));
        tm_f += config.progression_rate(tm_f as u32, tm_target);
        date += chrono::Duration::weeks(1);
    }
    points.push((date, target_reps as f64));
    points
}

/// ASCII scatter of TEST maxes with an optional projected trajectory
pub fn print_max_plot(
    history: &[SessionResult],
    trajectory: &[(NaiveDate, f64)],
    exercise_name: &str,
    target_reps: u32,
) {
    let tests: Vec<(NaiveDate, u32)> = test_sessions(history)
        .into_iter()
        .map(|s| (s.date, session_max_bw_only(s)))
        .filter(|(_, m)| *m > 0)
        .collect();

    if tests.is_empty() && trajectory.is_empty() {
        println!("No TEST sessions to plot yet.");
        return;
    }

    let first = tests
        .first()
        .map(|(d, _)| *d)
        .or_else(|| trajectory.first().map(|(d, _)| *d))
        .unwrap();
    let last = trajectory
        .last()
        .map(|(d, _)| *d)
        .or_else(|| tests.last().map(|(d, _)| *d))
        .unwrap();
    let span_days = ((last - first).num_days()).max(1);

    let y_max = tests
        .iter()
        .map(|(_, m)| *m as f64)
        .chain(trajectory.iter().map(|(_, v)| *v))
        .fold(target_reps as f64, f64::max)
        .ceil() as i64;
    let y_min = tests
        .iter()
        .map(|(_, m)| *m as f64)
        .chain(trajectory.iter().map(|(_, v)| *v))
        .fold(f64::INFINITY, f64::min)
        .floor()
        .max(0.0) as i64;

    const WIDTH: usize = 64;
    const HEIGHT: usize = 16;
    let mut grid = vec![vec![' '; WIDTH]; HEIGHT];

    let to_cell = |date: NaiveDate, value: f64| -> (usize, usize) {
        let x = ((date - first).num_days() as f64 / span_days as f64 * (WIDTH - 1) as f64)
            .round() as usize;
        let range = (y_max - y_min).max(1) as f64;
        let y = ((value - y_min as f64) / range * (HEIGHT - 1) as f64).round() as usize;
        (x.min(WIDTH - 1), HEIGHT - 1 - y.min(HEIGHT - 1))
    };

    for (date, value) in trajectory {
        let (x, y) = to_cell(*date, *value);
        grid[y][x] = '·';
    }
    for (date, max) in &tests {
        let (x, y) = to_cell(*date, *max as f64);
        grid[y][x] = '*';
    }

    println!();
    println!("{}  — TEST maxes (*), projection (·)", exercise_name.bold());
    for (row_idx, row) in grid.iter().enumerate() {
        let value = y_max as f64
            - row_idx as f64 / (HEIGHT - 1) as f64 * (y_max - y_min) as f64;
        let line: String = row.iter().collect();
        println!("{value:>5.0} │{line}");
    }
    println!("      └{}", "─".repeat(WIDTH));
    println!(
        "       {}{}{}",
        first.format("%Y-%m-%d"),
        " ".repeat(WIDTH.saturating_sub(20)),
        last.format("%Y-%m-%d")
    );
    println!();
}

/// Step-by-step derivation of one planned session, from its trace.
///
/// Everything shown comes from the same pass that produced the plan.
pub fn format_explain(trace: &PlanTrace) -> String {
    let mut out = Vec::new();
    let rule = "─".repeat(54);

    out.push(format!(
        "{} ({})  ·  {}  ·  week {}",
        trace.session_type.display_name(),
        trace.session_type.code(),
        trace.date,
        trace.week_number
    ));
    out.push(rule.clone());

    if trace.overtraining_shift_days > 0 {
        out.push(format!(
            "! start shifted +{} day(s): overtraining level {}/3 in the last week",
            trace.overtraining_shift_days, trace.overtraining_level
        ));
    }

    out.push(String::new());
    out.push("SESSION TYPE".to_string());
    let schedule: Vec<&str> = trace.schedule.iter().map(|t| t.code()).collect();
    out.push(format!(
        "  {}-day template {} repeating weekly; this slot is {}.",
        trace.days_per_week,
        schedule.join(" → "),
        trace.session_type.code()
    ));

    out.push(String::new());
    out.push(format!("VARIANT: {}", trace.variant));
    if trace.cycle.len() > 1 {
        out.push(format!(
            "  {} sessions cycle {}; {} before this one → index {} → {}.",
            trace.session_type.code(),
            trace.cycle.join(" → "),
            trace.variant_count_before,
            trace.variant_count_before as usize % trace.cycle.len(),
            trace.variant
        ));
    } else {
        out.push("  fixed variant for this session type.".to_string());
    }

    out.push(String::new());
    out.push(format!("TRAINING MAX: {}", trace.tm));
    if trace.weekly_log.is_empty() {
        out.push("  no weekly ramp yet (first week of the plan).".to_string());
    } else {
        for (week, increment, before, after) in &trace.weekly_log {
            out.push(format!(
                "  week {week}: {before:.2} + {increment:.2} = {after:.2}"
            ));
        }
    }
    out.push(format!(
        "  TM for this session = round({:.2}) = {} (goal {} reps).",
        trace.tm_float, trace.tm, trace.target_reps_goal
    ));

    out.push(String::new());
    out.push(format!("SETS x REPS: {} x {}", trace.adj_sets, trace.adj_reps));
    out.push(format!(
        "  rep bounds from TM: low {} high {} → base {}; base sets {}.",
        trace.reps_low, trace.reps_high, trace.base_reps, trace.base_sets
    ));
    if !trace.autoreg_active {
        out.push(format!(
            "  autoregulation off ({} sessions logged, need 10).",
            trace.history_len
        ));
    } else if trace.adj_sets != trace.base_sets {
        out.push(format!(
            "  readiness z {:+.2} < -1.0 → sets cut to {}.",
            trace.z_score, trace.adj_sets
        ));
    } else if trace.adj_reps > trace.base_reps {
        out.push(format!(
            "  readiness z {:+.2} > +1.0 → +1 rep.",
            trace.z_score
        ));
    } else {
        out.push(format!("  readiness z {:+.2} in band → unchanged.", trace.z_score));
    }

    if trace.session_type == SessionType::S {
        out.push(String::new());
        out.push(format!("ADDED WEIGHT: {:.1} kg", trace.added_weight_kg));
        if trace.last_test_weight_kg > 0.0 {
            out.push(format!(
                "  carried from the last TEST ({:.1} kg).",
                trace.last_test_weight_kg
            ));
        }
    }

    out.push(String::new());
    out.push(format!("REST: {} s", trace.rest_s));
    if trace.rest_notes.is_empty() {
        out.push("  midpoint of the type's range, no adjustments.".to_string());
    } else {
        for note in &trace.rest_notes {
            out.push(format!("  {note}"));
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CompletedSet;

    fn record(date_str: &str, session_type: SessionType, reps: &[u32]) -> SessionResult {
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
    fn test_fmt_planned_sets_uniform() {
        let sets = vec![PlannedSet { reps: 5, weight_kg: 1.0, rest_s: 240 }; 4];
        assert_eq!(fmt_planned_sets(&sets, SessionType::S), "4x5 +1.0kg / 240s");
    }

    #[test]
    fn test_fmt_planned_sets_ladder() {
        let sets = vec![
            PlannedSet { reps: 6, weight_kg: 0.0, rest_s: 60 },
            PlannedSet { reps: 5, weight_kg: 0.0, rest_s: 60 },
            PlannedSet { reps: 4, weight_kg: 0.0, rest_s: 60 },
        ];
        assert_eq!(fmt_planned_sets(&sets, SessionType::E), "6,5,4 / 60s");
    }

    #[test]
    fn test_fmt_actual_totals() {
        let s = record("2026-02-02", SessionType::H, &[7, 6, 6]);
        assert_eq!(fmt_actual(&s), "7+6+6 = 19");
    }

    #[test]
    fn test_weekly_volume_buckets() {
        let sessions = vec![
            record("2026-01-26", SessionType::S, &[5, 5]),
            record("2026-02-02", SessionType::H, &[7, 7]),
            record("2026-02-04", SessionType::E, &[6, 5, 4]),
        ];
        let rows = weekly_volume(&sessions, 2);
        assert_eq!(rows.len(), 2);
        // Oldest first: the 01-26 session is 9+ days before 02-04
        assert_eq!(rows[0], ("Last week".to_string(), 10));
        assert_eq!(rows[1], ("This week".to_string(), 29));
    }

    #[test]
    fn test_trajectory_starts_at_latest_test() {
        let config = EngineConfig::default();
        let history = vec![record("2026-02-01", SessionType::Test, &[10])];
        let points = build_trajectory(&config, &history, 30);
        assert!(!points.is_empty());
        assert_eq!(points[0].0, "2026-02-01".parse::<NaiveDate>().unwrap());
        // Projection rises toward the goal
        assert!(points.last().unwrap().1 >= points[0].1);
        assert_eq!(points.last().unwrap().1, 30.0);
    }

    #[test]
    fn test_trajectory_empty_without_tests() {
        let config = EngineConfig::default();
        let history = vec![record("2026-02-01", SessionType::S, &[5])];
        assert!(build_trajectory(&config, &history, 30).is_empty());
    }
}
