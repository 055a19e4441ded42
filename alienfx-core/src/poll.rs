//! Bounded status polling
//!
//! Every generation's ready/busy wait is the same loop with different
//! numbers; the catalog supplies the (interval, cap) pairs.

use std::time::Duration;

/// Interval and iteration cap for one polling loop
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_polls: u32,
}

impl PollPolicy {
    pub const fn new(interval: Duration, max_polls: u32) -> Self {
        Self { interval, max_polls }
    }

    /// Run `check` until it reports done or the cap is hit. Returns
    /// false on cap exhaustion. The first check happens before any
    /// sleep, so an already-ready device costs nothing.
    pub fn wait<E>(&self, mut check: impl FnMut() -> Result<bool, E>) -> Result<bool, E> {
        for i in 0..self.max_polls {
            if check()? {
                return Ok(true);
            }
            if i + 1 < self.max_polls {
                std::thread::sleep(self.interval);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_immediately_when_ready() {
        let policy = PollPolicy::new(Duration::from_secs(10), 3);
        let mut calls = 0;
        let ok: Result<bool, ()> = policy.wait(|| {
            calls += 1;
            Ok(true)
        });
        assert_eq!(ok, Ok(true));
        assert_eq!(calls, 1);
    }

    #[test]
    fn gives_up_after_cap() {
        let policy = PollPolicy::new(Duration::ZERO, 4);
        let mut calls = 0;
        let ok: Result<bool, ()> = policy.wait(|| {
            calls += 1;
            Ok(false)
        });
        assert_eq!(ok, Ok(false));
        assert_eq!(calls, 4);
    }

    #[test]
    fn propagates_errors() {
        let policy = PollPolicy::new(Duration::ZERO, 4);
        let err: Result<bool, &str> = policy.wait(|| Err("gone"));
        assert_eq!(err, Err("gone"));
    }
}
