//! Pacing between archived fetches.
//!
//! The throttle runs only after a successful write. It does no quota
//! accounting; the caller picks a delay that fits the remote limits.

use std::time::Duration;

use crate::error::SyncError;

/// Blocking pause after each archived activity.
pub trait Throttle {
    fn wait(&mut self, delay: Duration);
}

/// Production throttle: sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepThrottle;

impl Throttle for SleepThrottle {
    fn wait(&mut self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        tracing::trace!(delay_ms = delay.as_millis() as u64, "pausing");
        std::thread::sleep(delay);
    }
}

/// Convert a user-supplied `--sleep` value in seconds.
pub fn pause_from_secs(secs: f64) -> Result<Duration, SyncError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        SyncError::InvalidConfiguration(format!(
            "sleep must be a non-negative number of seconds, got {secs}"
        ))
    })
}
