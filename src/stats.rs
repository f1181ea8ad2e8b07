// Weekly statistics derived from the task list

use crate::task::Task;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::BTreeMap;

/// Number of calendar days covered by the statistics window, today included
pub const WINDOW_DAYS: i64 = 7;

/// The window's calendar days, oldest first, in the time zone of `now`
pub fn window_days<Tz: TimeZone>(now: &DateTime<Tz>) -> Vec<NaiveDate> {
    let today = now.date_naive();
    (0..WINDOW_DAYS)
        .rev()
        .map(|back| today - Duration::days(back))
        .collect()
}

/// Local midnight at the start of the oldest day in the window
pub fn window_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let first = now.date_naive() - Duration::days(WINDOW_DAYS - 1);
    local_midnight(&now.timezone(), first)
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    // Zones that skip midnight for DST start the day an hour later
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

fn in_window<Tz: TimeZone>(ts: DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    ts >= window_start(now) && ts <= now.with_timezone(&Utc)
}

/// Tasks created between the window start and `now`, inclusive
pub fn created_in_window<'a, Tz: TimeZone>(tasks: &'a [Task], now: &DateTime<Tz>) -> Vec<&'a Task> {
    tasks.iter().filter(|t| in_window(t.created_at, now)).collect()
}

/// Tasks completed between the window start and `now`, inclusive
pub fn done_in_window<'a, Tz: TimeZone>(tasks: &'a [Task], now: &DateTime<Tz>) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| t.done_at.is_some_and(|done| in_window(done, now)))
        .collect()
}

/// Completions per calendar day of the window
///
/// Always holds exactly [`WINDOW_DAYS`] entries, oldest first, with zero for
/// days without completions. The counts sum to `done_in_window(..).len()`.
pub fn done_per_day<Tz: TimeZone>(tasks: &[Task], now: &DateTime<Tz>) -> BTreeMap<NaiveDate, usize> {
    let tz = now.timezone();
    let mut per_day: BTreeMap<NaiveDate, usize> = window_days(now).into_iter().map(|d| (d, 0)).collect();

    for task in done_in_window(tasks, now) {
        if let Some(done_at) = task.done_at {
            let day = done_at.with_timezone(&tz).date_naive();
            if let Some(count) = per_day.get_mut(&day) {
                *count += 1;
            }
        }
    }

    per_day
}

/// Share of done against created tasks, as a whole percentage in 0..=100
///
/// Tasks created before the window but finished inside it can push the raw
/// ratio past 100, hence the clamp.
pub fn completion_percent(created: usize, done: usize) -> u32 {
    if created == 0 {
        return 0;
    }
    let pct = (done as f64 * 100.0 / created as f64).round();
    pct.min(100.0) as u32
}

/// Everything the statistics view shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyStats {
    pub created: usize,
    pub done: usize,
    pub completion_percent: u32,
    pub done_per_day: BTreeMap<NaiveDate, usize>,
}

impl WeeklyStats {
    pub fn compute<Tz: TimeZone>(tasks: &[Task], now: &DateTime<Tz>) -> Self {
        let created = created_in_window(tasks, now).len();
        let done = done_in_window(tasks, now).len();
        Self {
            created,
            done,
            completion_percent: completion_percent(created, done),
            done_per_day: done_per_day(tasks, now),
        }
    }

    /// Largest single-day count, for scaling a chart
    pub fn busiest_day(&self) -> usize {
        self.done_per_day.values().copied().max().unwrap_or(0)
    }
}
