//! Wall-clock access, swappable for tests.

use chrono::{DateTime, Local, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Local wall time, used for day boundaries and display.
    fn local_now(&self) -> DateTime<Local> {
        self.now().with_timezone(&Local)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.at
    }
}
