use chrono::{DateTime, Utc};

/// Injected time source. Every year/gap computation in the scoring engines
/// takes a `&dyn Clock` instead of reading wall-clock time inline, so tests
/// can pin "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for deterministic tests.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
pub fn fixed(y: i32, m: u32, d: u32) -> FixedClock {
    use chrono::TimeZone;
    FixedClock(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap())
}
