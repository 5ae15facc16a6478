//! When the next backup cycle fires.
//!
//! Only two recurrence expressions are understood; anything else runs hourly.

use chrono::{DateTime, Local, TimeZone, Timelike};
use std::time::Duration;
use tracing::warn;

pub const HOURLY_EXPR: &str = "0 * * * *";
pub const DAILY_EXPR: &str = "0 0 * * *";

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    /// Top of every hour.
    Hourly,
    /// Local midnight.
    Daily,
}

impl Recurrence {
    /// Exact match against the two supported expressions.
    pub fn from_expr(expr: &str) -> Option<Self> {
        match expr {
            HOURLY_EXPR => Some(Recurrence::Hourly),
            DAILY_EXPR => Some(Recurrence::Daily),
            _ => None,
        }
    }

    pub fn from_expr_or_hourly(expr: &str) -> Self {
        Self::from_expr(expr).unwrap_or(Recurrence::Hourly)
    }

    /// Time from `now` until the next fire, always strictly positive.
    pub fn delay_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Duration {
        match self {
            Recurrence::Hourly => {
                let into_hour = Duration::from_secs(u64::from(now.minute()) * 60 + u64::from(now.second()))
                    + Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000));
                HOUR - into_hour
            }
            Recurrence::Daily => {
                let midnight = now
                    .date_naive()
                    .succ_opt()
                    .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
                    .and_then(|naive| now.timezone().from_local_datetime(&naive).earliest());
                match midnight {
                    Some(next) => next.signed_duration_since(now.clone()).to_std().unwrap_or(DAY),
                    // Midnight skipped by a DST jump.
                    None => DAY,
                }
            }
        }
    }
}

/// Delay until the next cycle for a raw recurrence expression at `now`.
pub fn next_fire_delay<Tz: TimeZone>(expr: &str, now: &DateTime<Tz>) -> Duration {
    Recurrence::from_expr_or_hourly(expr).delay_after(now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Firing,
}

/// Holds the single next-fire instant. Missed fires are not replayed.
#[derive(Debug, Clone)]
pub struct CycleScheduler<Tz: TimeZone = Local> {
    recurrence: Recurrence,
    next_fire: DateTime<Tz>,
    state: SchedulerState,
}

impl<Tz: TimeZone> CycleScheduler<Tz> {
    pub fn new(expr: &str, now: DateTime<Tz>) -> Self {
        let recurrence = match Recurrence::from_expr(expr) {
            Some(recurrence) => recurrence,
            None => {
                warn!(
                    schedule = expr,
                    "Unrecognized CRON_SCHEDULE; only '{}' (hourly) and '{}' (daily) are supported. Running hourly.",
                    HOURLY_EXPR,
                    DAILY_EXPR
                );
                Recurrence::Hourly
            }
        };
        let next_fire = advance(&now, recurrence.delay_after(&now));
        Self {
            recurrence,
            next_fire,
            state: SchedulerState::Idle,
        }
    }

    pub fn recurrence(&self) -> Recurrence {
        self.recurrence
    }

    pub fn next_fire(&self) -> &DateTime<Tz> {
        &self.next_fire
    }

    #[cfg(test)]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_due(&self, now: &DateTime<Tz>) -> bool {
        self.state == SchedulerState::Idle && *now >= self.next_fire
    }

    pub fn begin_fire(&mut self) {
        self.state = SchedulerState::Firing;
    }

    /// Returns to `Idle` and schedules the next fire relative to `now`.
    pub fn finish_fire(&mut self, now: DateTime<Tz>) {
        self.next_fire = advance(&now, self.recurrence.delay_after(&now));
        self.state = SchedulerState::Idle;
    }
}

fn advance<Tz: TimeZone>(now: &DateTime<Tz>, delay: Duration) -> DateTime<Tz> {
    let delta = chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::hours(1));
    now.clone() + delta
}
