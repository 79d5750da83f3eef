// =============================================================================
// Central application state
// =============================================================================
//
// Wraps the simulation engine behind a single `RwLock` (the "parallel
// threads, single shared lock" strategy) and a broadcast channel for
// non-blocking snapshot fan-out. The tick producer takes the write lock for
// the duration of a tick; readers take the read lock only long enough to
// copy out an owned snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::config::EngineConfig;
use crate::engine::{ExternalSnapshot, InternalSnapshot, SimulationEngine};

/// Receivers slower than this backlog get lagging-dropped by
/// `tokio::sync::broadcast` rather than stalling the producer.
const BROADCAST_CHANNEL_CAPACITY: usize = 8;

pub struct AppState {
    pub engine: Arc<RwLock<SimulationEngine>>,

    /// Incremented every tick. Lets readers detect repeats or gaps without
    /// inspecting the engine itself.
    pub state_version: AtomicU64,

    broadcast_tx: broadcast::Sender<Arc<ExternalSnapshot>>,

    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Self {
        Self::from_engine(SimulationEngine::new(config))
    }

    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        Self::from_engine(SimulationEngine::with_seed(config, seed))
    }

    fn from_engine(engine: SimulationEngine) -> Self {
        let (broadcast_tx, _rx) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);
        Self {
            engine: Arc::new(RwLock::new(engine)),
            state_version: AtomicU64::new(0),
            broadcast_tx,
            start_time: Instant::now(),
        }
    }

    /// Run one tick under the write lock, then bump the version counter.
    pub fn tick(&self) {
        let mut engine = self.engine.write();
        engine.tick();
        drop(engine);
        self.state_version.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    pub fn snapshot_internal(&self) -> InternalSnapshot {
        self.engine.read().snapshot_internal()
    }

    pub fn snapshot_external(&self) -> ExternalSnapshot {
        self.engine.read().snapshot_external()
    }

    /// Hand a fresh external snapshot off to the broadcast channel. Never
    /// blocks: a full channel just means the slowest subscribers lag and
    /// will observe the gap next time they poll, per the no-stall policy.
    pub fn publish(&self) {
        let snapshot = Arc::new(self.snapshot_external());
        // `send` returns an error only when there are zero receivers, which
        // is routine (no WebSocket clients connected yet) and not a fault.
        let _ = self.broadcast_tx.send(snapshot);
    }

    /// Subscribe to the broadcast stream. The caller should send the current
    /// snapshot immediately afterward so new subscribers see an initial
    /// state before the next periodic update.
    pub fn new_subscriber(&self) -> broadcast::Receiver<Arc<ExternalSnapshot>> {
        self.broadcast_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_increments_state_version() {
        let state = AppState::with_seed(EngineConfig::default(), 1);
        assert_eq!(state.current_version(), 0);
        state.tick();
        assert_eq!(state.current_version(), 1);
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let state = AppState::with_seed(EngineConfig::default(), 2);
        state.tick();
        state.publish();
    }

    #[test]
    fn subscriber_receives_published_snapshot() {
        let state = AppState::with_seed(EngineConfig::default(), 3);
        let mut rx = state.new_subscriber();
        state.tick();
        state.publish();
        let received = rx.try_recv().expect("expected a published snapshot");
        assert_eq!(received.tick_count, 1);
    }

    #[test]
    fn snapshot_internal_and_external_agree_on_tick_count() {
        let state = AppState::with_seed(EngineConfig::default(), 4);
        state.tick();
        let internal = state.snapshot_internal();
        let external = state.snapshot_external();
        assert_eq!(internal.tick_count, external.tick_count);
    }
}
