//! Configuration version numbers.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Hands out strictly increasing versions based on the wall clock in
/// nanoseconds since the Unix epoch.
///
/// Two calls in the same nanosecond, or a clock stepping backwards, still
/// yield a larger value than the previous one.
#[derive(Debug, Default)]
pub struct ConfigVersion {
    last: AtomicI64,
}

impl ConfigVersion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next version.
    pub fn next(&self) -> i64 {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }

    /// The most recently handed out version, 0 if none.
    pub fn last(&self) -> i64 {
        self.last.load(Ordering::Acquire)
    }
}
