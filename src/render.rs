// Terminal rendering of the board and the weekly statistics

use crate::stats::WeeklyStats;
use crate::task::{Task, TaskStatus};
use colored::Colorize;
use std::fmt::Write;

/// Characters of a task id shown on the board
pub const SHORT_ID_LEN: usize = 8;

const BAR_WIDTH: usize = 24;

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

fn card(task: &Task) -> String {
    let title = if task.title.is_empty() {
        "(untitled)".dimmed().to_string()
    } else {
        task.title.clone()
    };
    format!("  {} {}", short_id(&task.id).dimmed(), title)
}

fn column(out: &mut String, status: TaskStatus, tasks: &[&Task]) {
    let heading = format!("{} ({})", status.label(), tasks.len());
    let heading = match status {
        TaskStatus::Todo => heading.yellow().bold(),
        TaskStatus::Done => heading.green().bold(),
    };
    let _ = writeln!(out, "{}", heading);

    if tasks.is_empty() {
        let _ = writeln!(out, "  {}", "nothing here".dimmed());
    }
    for task in tasks {
        let _ = writeln!(out, "{}", card(task));
    }
}

/// Both columns, "To Do" above "Done", in the order given
pub fn board(todo: &[&Task], done: &[&Task]) -> String {
    let mut out = String::new();
    column(&mut out, TaskStatus::Todo, todo);
    out.push('\n');
    column(&mut out, TaskStatus::Done, done);
    out
}

/// Summary line plus one bar per day of the window
pub fn weekly(stats: &WeeklyStats) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  created {}  done {}  completion {}",
        "Last 7 days".bold(),
        stats.created,
        stats.done,
        format!("{}%", stats.completion_percent).cyan().bold()
    );

    let max = stats.busiest_day();
    for (day, &count) in &stats.done_per_day {
        let width = if max == 0 { 0 } else { (count * BAR_WIDTH).div_ceil(max) };
        let bar = format!("{:<w$}", "#".repeat(width), w = BAR_WIDTH);
        let _ = writeln!(out, "  {} {} {}", day.format("%a %d %b"), bar.green(), count);
    }
    out
}
