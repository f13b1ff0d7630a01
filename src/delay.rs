//! The single suspension point for scripts.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::ScriptError;

/// Waits for `duration` unless `token` is cancelled first.
///
/// Cancellation wins ties, and an already-cancelled token fails immediately.
/// The timer is dropped on both paths.
pub async fn sleep(duration: Duration, token: &CancellationToken) -> Result<(), ScriptError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ScriptError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Converts a block's seconds input to a timer duration. Negative, NaN and
/// infinite inputs fire on the next tick.
pub fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}
