//! Time-windowed rotation on top of any [`RotatingSink`].
//!
//! Every write first checks whether the current window has elapsed and, if so,
//! rotates the target before the bytes go out. Windows are aligned to the Unix
//! epoch, so an hourly writer always rotates on the hour no matter when the
//! process started.
//!
//! There is no background timer: a quiet writer stays on its old file until
//! the next write arrives.
//!
//! # Locking
//!
//! Writes hold the lock shared and may run in parallel. Rotation holds it
//! exclusively, so a write either lands entirely before a rotation or entirely
//! after it.
//!
//! # Failures
//!
//! Rotation outcomes are also emitted as `tracing` events. When the writer sits
//! behind the subscriber that is currently dispatching, `tracing` drops those
//! nested events, so failed rotations are counted in
//! [`TimedRotatingWriter::rotation_failures`] as well.

use std::{
    io,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
    time::Duration,
};

use jiff::Timestamp;

use crate::{
    window::{Clock, SystemClock, Window},
    LogSink, Result, RotatingSink,
};

#[derive(Debug)]
pub struct TimedRotatingWriter<R> {
    target: R,
    window: Window,
    clock: Arc<dyn Clock>,
    last_rotated: RwLock<Timestamp>,
    rotation_failures: AtomicU64,
}
impl<R> TimedRotatingWriter<R>
where
    R: RotatingSink,
{
    pub fn new(target: R, interval: Duration) -> Result<Self> {
        Self::with_clock(target, interval, Arc::new(SystemClock))
    }

    pub fn with_clock(target: R, interval: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        let window = Window::new(interval)?;
        let last_rotated = window.start_of(clock.now());
        Ok(Self {
            target,
            window,
            clock,
            last_rotated: RwLock::new(last_rotated),
            rotation_failures: AtomicU64::new(0),
        })
    }

    pub fn target(&self) -> &R {
        &self.target
    }

    pub fn interval(&self) -> Duration {
        self.window.interval()
    }

    /// Start of the window the writer currently considers open.
    pub fn last_rotated(&self) -> Timestamp {
        *self.shared()
    }

    /// Rotations that failed since construction.
    pub fn rotation_failures(&self) -> u64 {
        self.rotation_failures.load(Ordering::Relaxed)
    }

    /// Rotates the target unconditionally and realigns the window to now.
    pub fn rotate(&self) -> io::Result<()> {
        let res = {
            let mut last_rotated = self.exclusive();
            let window_start = self.window.start_of(self.clock.now());
            *last_rotated = window_start;
            self.target.rotate().map(|()| window_start)
        };
        self.report(&res);
        res.map(|_| ())
    }

    fn rotate_if_needed(&self) -> io::Result<()> {
        let res = {
            let mut last_rotated = self.exclusive();
            let now = self.clock.now();
            if !self.window.has_elapsed(*last_rotated, now) {
                return Ok(());
            }
            // Advanced even if the rotation below fails; the next attempt
            // waits for another full window.
            let window_start = self.window.start_of(now);
            *last_rotated = window_start;
            self.target.rotate().map(|()| window_start)
        };
        self.report(&res);
        res.map(|_| ())
    }

    // Called with the lock released: the event may be routed back into this writer.
    fn report(&self, res: &io::Result<Timestamp>) {
        match res {
            Ok(window_start) => tracing::debug!(%window_start, "rotated log file"),
            Err(error) => {
                self.rotation_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%error, "failed to rotate log file");
            }
        }
    }

    fn shared(&self) -> RwLockReadGuard<'_, Timestamp> {
        self.last_rotated
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn exclusive(&self) -> RwLockWriteGuard<'_, Timestamp> {
        self.last_rotated
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
impl<R> LogSink for TimedRotatingWriter<R>
where
    R: RotatingSink,
{
    /// Rotates first if the window has elapsed, then writes.
    ///
    /// A failed rotation fails the write with nothing written.
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.rotate_if_needed()?;
        let _guard = self.shared();
        self.target.write(buf)
    }

    fn flush(&self) -> io::Result<()> {
        let _guard = self.shared();
        self.target.flush()
    }
}
