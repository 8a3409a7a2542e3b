use chrono::{Local, NaiveDateTime, Timelike};
use std::cell::Cell;
use std::time::Duration;

/// Source of local wall-clock time.
pub trait DayClock {
    fn now(&self) -> NaiveDateTime;
}

/// The machine's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl DayClock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
        self.now.set(self.now.get() + delta);
    }
}

impl DayClock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}

/// Wall time that starts at `anchor` and runs on the tokio clock, so a
/// paused runtime also pauses the day.
#[derive(Debug, Clone)]
pub struct RuntimeClock {
    anchor: NaiveDateTime,
    started: tokio::time::Instant,
}

impl RuntimeClock {
    pub fn starting_at(anchor: NaiveDateTime) -> Self {
        Self {
            anchor,
            started: tokio::time::Instant::now(),
        }
    }
}

impl DayClock for RuntimeClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.anchor + elapsed
    }
}

pub fn seconds_since_midnight(now: NaiveDateTime) -> f64 {
    let time = now.time();
    time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1e9
}

/// Content position that should be playing at `now`.
pub fn position_from_time_of_day(now: NaiveDateTime, base_speed: f64) -> Duration {
    Duration::from_secs_f64(seconds_since_midnight(now) * base_speed)
}

pub fn next_midnight(now: NaiveDateTime) -> NaiveDateTime {
    now.date()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MAX)
}

pub fn until(now: NaiveDateTime, deadline: NaiveDateTime) -> Duration {
    (deadline - now).to_std().unwrap_or(Duration::ZERO)
}

pub fn until_next_midnight(now: NaiveDateTime) -> Duration {
    until(now, next_midnight(now))
}
