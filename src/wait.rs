//! Bounded polling for external dependencies.
//!
//! One primitive behind every "poll until a foreign global shows up" case:
//! script load, widget entry point, widget API availability.

use std::time::Duration;

use tokio::time::{interval, Instant, MissedTickBehavior};

/// The predicate never became true within the allowed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("condition not met within {waited:?}")]
pub struct WaitTimeout {
    pub waited: Duration,
}

/// Poll `predicate` every `poll_interval` until it returns true or `timeout`
/// elapses. The predicate is checked once immediately before any sleep.
///
/// A zero interval (possible through config) is floored to 1 ms; the tokio
/// ticker requires a non-zero period.
pub async fn wait_until<F>(
    mut predicate: F,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<(), WaitTimeout>
where
    F: FnMut() -> bool,
{
    let poll_interval = poll_interval.max(Duration::from_millis(1));
    let deadline = Instant::now() + timeout;
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        // First tick completes immediately.
        ticker.tick().await;
        if predicate() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(WaitTimeout { waited: timeout });
        }
    }
}
