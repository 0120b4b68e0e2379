/*!
Job scheduling for the checker process.

`Schedule` answers one question: given the current time, what runs next and
when. `runner.rs` sleeps until then, runs the jobs to completion one after
another, and asks again. All times are UTC.

Jobs:
- `FboCheck`      -> at every configured time of day
- `MonthlyReport` -> on the 1st of the month at the report time (when aircraft are configured)
- `Heartbeat`     -> every hour on the hour (when enabled)

When several jobs fall on the same instant they run in that order.
*/

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeDelta, Timelike, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod runner;

pub use runner::{CheckError, CheckRunner};

use crate::config::Config;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid time of day '{0}' (expected HH:MM, 24-hour)")]
pub struct InvalidTimeOfDay(pub String);

/// A wall-clock time, minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// This time on `date`, in UTC.
    fn on(self, date: NaiveDate) -> Option<DateTime<Utc>> {
        date.and_hms_opt(self.hour, self.minute, 0)
            .map(|dt| dt.and_utc())
    }
}

impl FromStr for TimeOfDay {
    type Err = InvalidTimeOfDay;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || InvalidTimeOfDay(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(err)?;
        if m.len() != 2 {
            return Err(err());
        }
        let hour = h.parse().map_err(|_| err())?;
        let minute = m.parse().map_err(|_| err())?;
        Self::new(hour, minute).ok_or_else(err)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Scheduled work. Declaration order is run order for coinciding jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Job {
    FboCheck,
    MonthlyReport,
    Heartbeat,
}

/// Fixed timetable, built once from config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    check_times: Vec<TimeOfDay>,
    monthly_report: Option<TimeOfDay>,
    heartbeat: bool,
}

impl Schedule {
    pub fn new(
        check_times: Vec<TimeOfDay>,
        monthly_report: Option<TimeOfDay>,
        heartbeat: bool,
    ) -> Self {
        Self {
            check_times,
            monthly_report,
            heartbeat,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, InvalidTimeOfDay> {
        let check_times = cfg
            .schedule
            .check_times
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<TimeOfDay>, _>>()?;
        let monthly_report = if cfg.maintenance.is_enabled() {
            Some(cfg.maintenance.report_time.parse()?)
        } else {
            None
        };
        Ok(Self::new(check_times, monthly_report, cfg.schedule.heartbeat))
    }

    /// The earliest instant strictly after `now` at which something runs,
    /// with every job due at that instant. `None` if nothing is scheduled.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, Vec<Job>)> {
        let mut candidates: Vec<(DateTime<Utc>, Job)> = Vec::new();

        for t in &self.check_times {
            if let Some(at) = next_daily(*t, now) {
                candidates.push((at, Job::FboCheck));
            }
        }
        if let Some(t) = self.monthly_report {
            if let Some(at) = next_monthly(t, now) {
                candidates.push((at, Job::MonthlyReport));
            }
        }
        if self.heartbeat {
            if let Some(at) = next_hour(now) {
                candidates.push((at, Job::Heartbeat));
            }
        }

        let first = candidates.iter().map(|(at, _)| *at).min()?;
        let mut jobs: Vec<Job> = candidates
            .into_iter()
            .filter(|(at, _)| *at == first)
            .map(|(_, job)| job)
            .collect();
        jobs.sort();
        jobs.dedup();
        Some((first, jobs))
    }
}

fn next_daily(t: TimeOfDay, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let today = now.date_naive();
    match t.on(today) {
        Some(at) if at > now => Some(at),
        _ => t.on(today.succ_opt()?),
    }
}

fn next_monthly(t: TimeOfDay, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let first_of_month = now.date_naive().with_day0(0)?;
    match t.on(first_of_month) {
        Some(at) if at > now => Some(at),
        _ => t.on(first_of_month.checked_add_months(Months::new(1))?),
    }
}

fn next_hour(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let top = now.date_naive().and_hms_opt(now.hour(), 0, 0)?.and_utc();
    top.checked_add_signed(TimeDelta::hours(1))
}
