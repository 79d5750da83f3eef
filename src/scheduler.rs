// =============================================================================
// Tick scheduler
// =============================================================================
//
// Single producer loop at a fixed tick interval with drift-corrected sleep:
// it tracks an absolute `next_tick` deadline instead of sleeping a constant
// duration per iteration, so scheduler overhead never accumulates across
// ticks. Broadcasts a snapshot every `broadcast_every_n_ticks` ticks.
// Cancellation is observed between ticks, never mid-tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info};

use crate::app_state::AppState;

/// Drive the simulation until `shutdown` fires. Errors inside a tick are
/// caught and logged; the loop always continues after sleeping the
/// remaining interval, never terminating on a tick failure.
pub async fn run(state: Arc<AppState>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let interval_ms = state.engine.read().config.tick_interval_ms;
    let broadcast_every = state.engine.read().config.broadcast_every_n_ticks.max(1);
    let interval = Duration::from_millis(interval_ms);

    info!(interval_ms, broadcast_every, "scheduler starting");

    let start = Instant::now();
    let mut tick_number: u64 = 0;

    loop {
        if *shutdown.borrow() {
            info!("scheduler observed shutdown signal, stopping");
            break;
        }

        let next_tick = start + interval * (tick_number as u32 + 1);

        let tick_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            state.tick();
        }));
        if let Err(panic) = tick_result {
            error!(?panic, "tick failed, skipping broadcast for this tick");
        } else {
            tick_number += 1;
            if tick_number % broadcast_every == 0 {
                state.publish();
            }
        }

        let now = Instant::now();
        let sleep_for = next_tick.saturating_duration_since(now);

        tokio::select! {
            _ = tokio::time::sleep(sleep_for) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("scheduler observed shutdown signal during sleep, stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[tokio::test]
    async fn runs_until_shutdown_and_advances_ticks() {
        let mut config = EngineConfig::default();
        config.tick_interval_ms = 1;
        let state = Arc::new(AppState::with_seed(config, 1));
        let (tx, rx) = tokio::sync::watch::channel(false);

        let state_clone = state.clone();
        let handle = tokio::spawn(async move {
            run(state_clone, rx).await;
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(state.engine.read().tick_count > 0);
    }
}
