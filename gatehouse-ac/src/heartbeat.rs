//! Liveness pulse
//!
//! One process-wide timer writes `ping` to every online channel so the
//! underlying transports never idle closed, and piggybacks cooldown-map
//! pruning on the same tick. Write failures are logged and non-fatal;
//! the pulse is not part of any decision pipeline.

use crate::state::SharedState;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Run the pulse until the process shuts down
pub async fn heartbeat_task(state: Arc<SharedState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // An interval's first tick fires immediately; the readers have just
    // been opened, so skip it and pulse one full period in.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        pulse(&state).await;
    }
}

/// One pulse: ping every online channel, prune expired cooldowns
pub(crate) async fn pulse(state: &SharedState) {
    for channel in state.channels() {
        if !channel.is_online() {
            continue;
        }

        match channel.writer.write_line("ping", 1).await {
            Ok(()) => {
                state.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(channel = %channel.name(), "Heartbeat sent");
            }
            Err(e) => {
                tracing::warn!(channel = %channel.name(), "Heartbeat write failed: {}", e);
            }
        }

        let pruned = channel.prune_cooldowns();
        if pruned > 0 {
            tracing::debug!(
                channel = %channel.name(),
                pruned,
                "Pruned expired cooldown entries"
            );
        }
    }
}
