use crate::dispatch::DispatchReport;
use crate::forest::{Forest, Target};
use crate::reconcile::RowUpdate;
use crate::run_dir::RunSummary;
use crate::status::TargetStatus;
use terminal_size::{terminal_size, Width};

// ANSI color codes
pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const RED: &str = "\x1b[31m";
pub const GRAY: &str = "\x1b[90m";

const DEFAULT_TERMINAL_WIDTH: usize = 100;
const MIN_NAME_WIDTH: usize = 12;
const LEVEL_WIDTH: usize = 8;
const STATUS_WIDTH: usize = 10;
const TIME_WIDTH: usize = 19;

fn terminal_width() -> usize {
    terminal_size()
        .map(|(Width(w), _)| w as usize)
        .unwrap_or(DEFAULT_TERMINAL_WIDTH)
}

/// 24-bit foreground escape for a status, empty when the status has no color.
pub fn status_color(status: TargetStatus) -> String {
    match status.color_rgb() {
        Some((r, g, b)) => format!("\x1b[38;2;{};{};{}m", r, g, b),
        None => String::new(),
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let kept: String = s.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept)
}

fn name_width(total: usize) -> usize {
    // Four single-space gaps between the five columns.
    total
        .saturating_sub(LEVEL_WIDTH + STATUS_WIDTH + 2 * TIME_WIDTH + 4)
        .max(MIN_NAME_WIDTH)
}

fn format_row(target: &Target, is_group_row: bool, name_width: usize) -> String {
    let level = if is_group_row { target.level.as_str() } else { "" };
    let name = if is_group_row {
        target.name.clone()
    } else {
        format!("  {}", target.name)
    };
    let color = status_color(target.status);
    let reset = if color.is_empty() { "" } else { RESET };
    format!(
        "{:<lw$} {:<nw$} {}{:<sw$}{} {:<tw$} {:<tw$}",
        truncate(level, LEVEL_WIDTH),
        truncate(&name, name_width),
        color,
        target.status.as_str(),
        reset,
        target.start_time,
        target.end_time,
        nw = name_width,
        lw = LEVEL_WIDTH,
        sw = STATUS_WIDTH,
        tw = TIME_WIDTH,
    )
}

/// Render every row of a forest, group rows first within each level.
pub fn format_forest(forest: &Forest, width: usize) -> Vec<String> {
    let nw = name_width(width);
    let mut lines = vec![format!(
        "{BOLD}{:<lw$} {:<nw$} {:<sw$} {:<tw$} {:<tw$}{RESET}",
        "Level",
        "Target",
        "Status",
        "Start",
        "End",
        nw = nw,
        lw = LEVEL_WIDTH,
        sw = STATUS_WIDTH,
        tw = TIME_WIDTH,
    )];
    for group in forest.groups() {
        for (i, target) in group.targets.iter().enumerate() {
            lines.push(format_row(target, i == 0, nw));
        }
    }
    lines
}

pub fn print_header(title: &str) {
    println!("{CYAN}{BOLD}{}{RESET}", title);
    println!();
}

pub fn print_forest(forest: &Forest) {
    if forest.is_empty() {
        println!("{GRAY}No active targets{RESET}");
        return;
    }
    for line in format_forest(forest, terminal_width()) {
        println!("{}", line);
    }
}

pub fn format_run_summary(summary: &RunSummary) -> String {
    match (&summary.latest, &summary.note) {
        (Some(mark), _) => {
            let status = mark.target_status();
            let color = status_color(status);
            let reset = if color.is_empty() { "" } else { RESET };
            format!(
                "{BOLD}{}{RESET}  {}  {}{}{}  {DIM}{}{RESET}",
                summary.run, mark.target, color, mark.status, reset, mark.timestamp
            )
        }
        (None, Some(note)) => format!("{BOLD}{}{RESET}  {GRAY}{}{RESET}", summary.run, note),
        (None, None) => format!("{BOLD}{}{RESET}", summary.run),
    }
}

pub fn print_run_summaries(summaries: &[RunSummary]) {
    for summary in summaries {
        println!("{}", format_run_summary(summary));
    }
}

pub fn format_update(update: &RowUpdate) -> String {
    let color = status_color(update.to);
    let reset = if color.is_empty() { "" } else { RESET };
    let to = if update.to.is_none() {
        "(none)"
    } else {
        update.to.as_str()
    };
    let from = if update.from.is_none() {
        "(none)"
    } else {
        update.from.as_str()
    };
    format!("{} {GRAY}{}{RESET} → {}{}{}", update.target, from, color, to, reset)
}

pub fn print_updates(updates: &[RowUpdate]) {
    for update in updates {
        println!("{}", format_update(update));
    }
}

pub fn print_dispatch(report: &DispatchReport) {
    let color = match &report.outcome {
        Some(o) if o.success() => GREEN,
        Some(_) => YELLOW,
        None => RED,
    };
    println!("{color}{}{RESET}", report.summary());
    if let Some(outcome) = &report.outcome {
        if !outcome.stderr.is_empty() {
            println!("{GRAY}{}{RESET}", outcome.stderr);
        }
    }
    print_updates(&report.updates);
}

pub fn print_error(msg: &str) {
    eprintln!("{RED}{BOLD}Error:{RESET} {}", msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{YELLOW}Warning:{RESET} {}", msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_dir::{LatestMark, TargetProbe};

    fn target(name: &str, level: &str, status: TargetStatus) -> Target {
        Target::new(
            name,
            level,
            TargetProbe {
                status,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_status_color_escape() {
        assert_eq!(status_color(TargetStatus::Finish), "\x1b[38;2;103;194;58m");
        assert_eq!(status_color(TargetStatus::None), "");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn test_format_forest_marks_children() {
        let forest = Forest::from_targets(vec![
            target("t1", "1", TargetStatus::Running),
            target("t2", "1", TargetStatus::None),
            target("t3", "2", TargetStatus::Failed),
        ]);
        let lines = format_forest(&forest, 120);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Target"));
        assert!(lines[1].starts_with("1        t1 "));
        assert!(lines[1].contains("running"));
        assert!(lines[2].starts_with("           t2"));
        assert!(lines[3].starts_with("2        t3 "));
        assert!(lines[3].contains(&status_color(TargetStatus::Failed)));
    }

    #[test]
    fn test_name_width_has_floor() {
        assert_eq!(name_width(10), MIN_NAME_WIDTH);
        assert_eq!(name_width(120), 120 - (LEVEL_WIDTH + STATUS_WIDTH + 2 * TIME_WIDTH + 4));
    }

    #[test]
    fn test_format_run_summary() {
        let with_mark = RunSummary {
            run: "run1".to_string(),
            latest: Some(LatestMark {
                target: "syn".to_string(),
                status: "finish".to_string(),
                timestamp: "2024-01-01 00:00:00".to_string(),
            }),
            note: None,
        };
        let line = format_run_summary(&with_mark);
        assert!(line.contains("syn"));
        assert!(line.contains("finish"));

        let noted = RunSummary {
            run: "run2".to_string(),
            latest: None,
            note: Some("No status dir".to_string()),
        };
        assert!(format_run_summary(&noted).contains("No status dir"));
    }

    #[test]
    fn test_format_update_shows_none() {
        let update = RowUpdate {
            target: "t1".to_string(),
            from: TargetStatus::Finish,
            to: TargetStatus::None,
            timestamps_refreshed: false,
        };
        let line = format_update(&update);
        assert!(line.starts_with("t1 "));
        assert!(line.contains("finish"));
        assert!(line.ends_with("(none)"));
    }
}
