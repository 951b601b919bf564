//! # Poll Scheduler
//!
//! Drives a callback at a fixed period until cancelled. The first call
//! happens one full period after start, since the caller has just loaded the
//! conversation. Missed ticks are delayed rather than bunched up, so a slow
//! store never causes back-to-back polls.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Call `on_tick` every `period` until `cancel` fires or it returns `Break`
///
/// Returns the number of completed ticks.
pub async fn run_every<F, Fut>(period: Duration, cancel: CancellationToken, mut on_tick: F) -> u64
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = ControlFlow<()>>,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("[SYNC] poll loop cancelled after {} ticks", ticks);
                break;
            }
            _ = ticker.tick() => {
                ticks += 1;
                if on_tick(ticks).await.is_break() {
                    debug!("[SYNC] poll loop stopped at tick {}", ticks);
                    break;
                }
            }
        }
    }
    ticks
}
