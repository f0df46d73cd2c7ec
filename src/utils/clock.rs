use chrono::{DateTime, Utc};

/// Represents an entity responsible for providing the current time across the
/// application. This allows time-dependent logic to be driven manually in tests.
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    /// Current time as fractional Unix seconds, the unit the activity log is kept in.
    fn unix_time(&self) -> f64 {
        self.time().timestamp_micros() as f64 / 1_000_000.0
    }
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
