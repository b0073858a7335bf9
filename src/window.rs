use std::time::Duration;

use jiff::Timestamp;

use crate::{Error, Result};

pub trait Clock: core::fmt::Debug + Sync + Send {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A fixed-length time grid anchored at the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    nanos: i128,
}
impl Window {
    pub fn new(interval: Duration) -> Result<Self> {
        let nanos = i128::try_from(interval.as_nanos()).map_err(|_| Error::InvalidInterval)?;
        if nanos == 0 {
            return Err(Error::InvalidInterval);
        }
        Ok(Self { nanos })
    }

    pub fn interval(&self) -> Duration {
        // `nanos` came from a `Duration`, so it fits back into one
        let secs = (self.nanos / 1_000_000_000) as u64;
        let subsec = (self.nanos % 1_000_000_000) as u32;
        Duration::new(secs, subsec)
    }

    /// Floors `ts` to the start of the window containing it.
    pub fn start_of(&self, ts: Timestamp) -> Timestamp {
        let ns = ts.as_nanosecond();
        let aligned = ns - ns.rem_euclid(self.nanos);
        // Only fails when flooring crosses `Timestamp::MIN`
        Timestamp::from_nanosecond(aligned).unwrap_or(Timestamp::MIN)
    }

    /// Whether a full window has passed between `since` and `now`.
    ///
    /// A clock that stepped backwards never counts as elapsed.
    pub fn has_elapsed(&self, since: Timestamp, now: Timestamp) -> bool {
        now.as_nanosecond() - since.as_nanosecond() >= self.nanos
    }
}

#[cfg(test)]
pub(crate) mod test_clock {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;

    /// A clock that only moves when told to.
    #[derive(Debug)]
    pub struct ManualClock {
        micros: AtomicI64,
    }
    impl ManualClock {
        pub fn at(ts: Timestamp) -> Self {
            Self {
                micros: AtomicI64::new(ts.as_microsecond()),
            }
        }

        pub fn advance(&self, by: Duration) {
            self.micros
                .fetch_add(by.as_micros() as i64, Ordering::SeqCst);
        }

        pub fn set(&self, ts: Timestamp) {
            self.micros.store(ts.as_microsecond(), Ordering::SeqCst);
        }
    }
    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            Timestamp::from_microsecond(self.micros.load(Ordering::SeqCst)).unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(matches!(
            Window::new(Duration::ZERO),
            Err(Error::InvalidInterval)
        ));
    }

    #[test]
    fn test_interval_round_trip() {
        let interval = Duration::new(3, 250_000_000);
        assert_eq!(Window::new(interval).unwrap().interval(), interval);
    }

    #[test]
    fn test_start_of_hourly() {
        let window = Window::new(Duration::from_secs(3600)).unwrap();
        assert_eq!(
            window.start_of(ts("2024-05-06T07:59:59.999Z")),
            ts("2024-05-06T07:00:00Z")
        );
        assert_eq!(
            window.start_of(ts("2024-05-06T08:00:00Z")),
            ts("2024-05-06T08:00:00Z")
        );
    }

    #[test]
    fn test_start_of_is_a_multiple_of_interval() {
        let window = Window::new(Duration::from_millis(10)).unwrap();
        for raw in [
            "2024-01-01T00:00:00.003Z",
            "2024-01-01T00:00:00.019999Z",
            "2031-12-31T23:59:59.999999999Z",
        ] {
            let start = window.start_of(ts(raw));
            assert_eq!(start.as_nanosecond() % 10_000_000, 0);
            assert!(start <= ts(raw));
        }
    }

    #[test]
    fn test_start_of_before_epoch() {
        let window = Window::new(Duration::from_secs(10)).unwrap();
        assert_eq!(
            window.start_of(ts("1969-12-31T23:59:55Z")),
            ts("1969-12-31T23:59:50Z")
        );
    }

    #[test]
    fn test_has_elapsed() {
        let window = Window::new(Duration::from_millis(10)).unwrap();
        let start = ts("2024-01-01T00:00:00Z");
        assert!(!window.has_elapsed(start, ts("2024-01-01T00:00:00.009999Z")));
        assert!(window.has_elapsed(start, ts("2024-01-01T00:00:00.010Z")));
        assert!(!window.has_elapsed(start, ts("2023-12-31T23:00:00Z")));
    }
}
