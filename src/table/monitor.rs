//! Producer/Reader Monitor
//!
//! Readers evaluate a probe against the table; if the answer is not yet
//! known they block on a shared condition until the producer wakes them,
//! then evaluate the probe again from scratch. One wake serves every waiter,
//! whatever each of them is waiting for.
//!
//! Every wait is bounded by the construction outcome (done or failed), the
//! cancellation token, and the optional timeout.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::CancelToken;
use crate::error::{Result, TreeError};

/// Outcome of one probe evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe<T> {
    /// Answer is final
    Ready(T),
    /// Depends on records not yet produced
    Pending,
}

const BUILDING: u8 = 0;
const DONE: u8 = 1;
const FAILED: u8 = 2;

/// Longest a waiter sleeps before re-checking the cancellation token
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) struct Monitor {
    lock: Mutex<()>,
    cond: Condvar,
    state: AtomicU8,
    failure: OnceLock<TreeError>,
    cancel: CancelToken,
    timeout: Option<Duration>,
    /// Times a reader actually blocked
    blocked: AtomicUsize,
}

impl Monitor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Monitor {
            lock: Mutex::new(()),
            cond: Condvar::new(),
            state: AtomicU8::new(BUILDING),
            failure: OnceLock::new(),
            cancel: CancelToken::new(),
            timeout,
            blocked: AtomicUsize::new(0),
        }
    }

    /// Construction finished; everything is published
    #[inline]
    pub fn is_done(&self) -> bool {
        self.state.load(Ordering::Acquire) == DONE
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.state.load(Ordering::Acquire) == FAILED
    }

    /// The construction error, once failed
    pub fn failure(&self) -> Option<TreeError> {
        if self.is_failed() {
            self.failure.get().cloned()
        } else {
            None
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn blocked_waits(&self) -> usize {
        self.blocked.load(Ordering::Relaxed)
    }

    /// Wake every blocked reader
    pub fn wake_all(&self) {
        let _guard = self.lock.lock();
        self.cond.notify_all();
    }

    /// Mark construction complete and wake everyone
    pub fn finish(&self) {
        self.state.store(DONE, Ordering::Release);
        self.wake_all();
    }

    /// Mark construction failed and wake everyone. The first error sticks.
    pub fn fail(&self, err: TreeError) {
        let _ = self.failure.set(err);
        self.state.store(FAILED, Ordering::Release);
        self.wake_all();
    }

    /// Fire the cancellation token and wake everyone
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.wake_all();
    }

    /// Block until `probe` returns `Ready`, construction fails, the token
    /// fires, or the timeout elapses.
    ///
    /// A probe must read the done flag before it reads the table, and must
    /// answer `Ready` whenever construction is done.
    pub fn wait_for<T>(&self, mut probe: impl FnMut() -> Probe<T>) -> Result<T> {
        if let Probe::Ready(value) = probe() {
            return Ok(value);
        }

        let started = Instant::now();
        let mut guard = self.lock.lock();
        loop {
            if let Probe::Ready(value) = probe() {
                return Ok(value);
            }
            if let Some(err) = self.failure() {
                return Err(err);
            }
            if self.is_done() {
                // Finished between the probe's flag read and now
                match probe() {
                    Probe::Ready(value) => return Ok(value),
                    Probe::Pending => panic!("navigation still pending after the document completed"),
                }
            }
            if self.cancel.is_cancelled() {
                return Err(TreeError::Cancelled);
            }

            let slice = match self.timeout {
                Some(limit) => {
                    let elapsed = started.elapsed();
                    if elapsed >= limit {
                        return Err(TreeError::Timeout(limit));
                    }
                    (limit - elapsed).min(POLL_INTERVAL)
                }
                None => POLL_INTERVAL,
            };
            self.blocked.fetch_add(1, Ordering::Relaxed);
            self.cond.wait_for(&mut guard, slice);
        }
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("done", &self.is_done())
            .field("failed", &self.is_failed())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn test_ready_without_blocking() {
        let monitor = Monitor::new(None);
        assert_eq!(monitor.wait_for(|| Probe::Ready(5)), Ok(5));
        assert_eq!(monitor.blocked_waits(), 0);
    }

    #[test]
    fn test_wakes_when_condition_met() {
        let monitor = Arc::new(Monitor::new(None));
        let flag = Arc::new(AtomicBool::new(false));

        let producer = {
            let monitor = Arc::clone(&monitor);
            let flag = Arc::clone(&flag);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                flag.store(true, Ordering::Release);
                monitor.wake_all();
            })
        };

        let value = monitor.wait_for(|| {
            if flag.load(Ordering::Acquire) {
                Probe::Ready("seen")
            } else {
                Probe::Pending
            }
        });
        producer.join().unwrap();
        assert_eq!(value, Ok("seen"));
    }

    #[test]
    fn test_failure_releases_waiters() {
        let monitor = Arc::new(Monitor::new(None));
        let failer = {
            let monitor = Arc::clone(&monitor);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                monitor.fail(TreeError::Construction("bad input".into()));
            })
        };
        let result: Result<()> = monitor.wait_for(|| Probe::Pending);
        failer.join().unwrap();
        assert_eq!(result, Err(TreeError::Construction("bad input".into())));
    }

    #[test]
    fn test_timeout() {
        let monitor = Monitor::new(Some(Duration::from_millis(20)));
        let result: Result<()> = monitor.wait_for(|| Probe::Pending);
        assert_eq!(result, Err(TreeError::Timeout(Duration::from_millis(20))));
        assert!(monitor.blocked_waits() >= 1);
    }

    #[test]
    fn test_cancel() {
        let monitor = Arc::new(Monitor::new(None));
        let token = monitor.cancel_token();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            token.cancel();
        });
        let result: Result<()> = monitor.wait_for(|| Probe::Pending);
        canceller.join().unwrap();
        assert_eq!(result, Err(TreeError::Cancelled));
    }

    #[test]
    fn test_first_failure_sticks() {
        let monitor = Monitor::new(None);
        monitor.fail(TreeError::Construction("first".into()));
        monitor.fail(TreeError::Construction("second".into()));
        assert_eq!(
            monitor.failure(),
            Some(TreeError::Construction("first".into()))
        );
    }
}
