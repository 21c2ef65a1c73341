use chrono::{DateTime, Local};

/// Source of wall-clock time for countdowns and the completion log.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The real system clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock that only moves when told to. Used to simulate elapsed time in tests.
#[cfg(test)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Local>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: std::sync::Mutex::new(Local::now()),
        }
    }

    pub fn advance_secs(&self, secs: f64) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::TimeDelta::milliseconds((secs * 1000.0).round() as i64);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap()
    }
}
