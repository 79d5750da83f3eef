// =============================================================================
// Simulation orchestrator
// =============================================================================
//
// Owns every piece of mutable engine state and drives one tick at a time.
// `tick()` must only be called by the scheduler; everything else is a
// read-only projection built under whatever lock the caller (`AppState`)
// holds around the engine.

use serde::{Deserialize, Serialize};

use crate::analytics::{self, Analytics, AnalyticsSnapshot};
use crate::config::EngineConfig;
use crate::ipo::IpoManager;
use crate::regime::{self, RegimeMachine};
use crate::ring::RingBuffer;
use crate::rng::SimRng;
use crate::sectors;
use crate::stock::{Stock, StockEvent};
use crate::types::{MarketCapTier, MarketStatus, Phase, Regime, StockStatus, WinnerStatus};

const MARKET_CAP_HISTORY_CAPACITY: usize = 1461;
const LOG_CAPACITY: usize = 10;
const WINNER_REFRESH_INTERVAL: u64 = 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub tick: u64,
    pub message: String,
}

pub struct MarketState {
    pub vix: f64,
    pub interest_rate: f64,
    pub phase: Phase,
}

impl Default for MarketState {
    fn default() -> Self {
        Self {
            vix: 15.5,
            interest_rate: 1.25,
            phase: Phase::Trading,
        }
    }
}

/// Internal, full-fidelity projection of a stock. Serialised for the push
/// channel/REST surface behind authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalStockView {
    pub id: String,
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub sub_industry: String,
    pub price: f64,
    pub shares_outstanding: f64,
    pub current_market_cap: f64,
    pub volatility: f64,
    pub value_score: f64,
    pub metabolic_health: f64,
    pub history: Vec<f64>,
    pub status: StockStatus,
    pub winner_status: WinnerStatus,
    pub market_cap_tier: MarketCapTier,
}

/// Public projection of a stock: omits health/status/history/value_score,
/// adds a derived `market_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalStockView {
    pub id: String,
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub sub_industry: String,
    pub price: f64,
    pub shares_outstanding: f64,
    pub current_market_cap: f64,
    pub volatility: f64,
    pub winner_status: WinnerStatus,
    pub market_cap_tier: MarketCapTier,
    pub market_status: MarketStatus,
}

impl InternalStockView {
    pub fn from_stock(stock: &Stock) -> Self {
        Self {
            id: stock.id.clone(),
            ticker: stock.ticker.clone(),
            name: stock.name.clone(),
            sector: stock.sector.clone(),
            sub_industry: stock.sub_industry.clone(),
            price: stock.price,
            shares_outstanding: stock.shares_outstanding,
            current_market_cap: stock.market_cap,
            volatility: stock.volatility,
            value_score: stock.value_score,
            metabolic_health: stock.metabolic_health,
            history: stock.history.as_vec(),
            status: stock.status,
            winner_status: stock.winner_status,
            market_cap_tier: stock.market_cap_tier(),
        }
    }
}

impl ExternalStockView {
    pub fn from_stock(stock: &Stock, phase: Phase) -> Self {
        Self {
            id: stock.id.clone(),
            ticker: stock.ticker.clone(),
            name: stock.name.clone(),
            sector: stock.sector.clone(),
            sub_industry: stock.sub_industry.clone(),
            price: stock.price,
            shares_outstanding: stock.shares_outstanding,
            current_market_cap: stock.market_cap,
            volatility: stock.volatility,
            winner_status: stock.winner_status,
            market_cap_tier: stock.market_cap_tier(),
            market_status: MarketStatus::from(phase),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStateView {
    pub vix: f64,
    pub interest_rate: f64,
    pub phase: Phase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<S> {
    pub stocks: Vec<S>,
    pub market_state: MarketStateView,
    pub regime: Regime,
    pub time_in_phase: u64,
    pub phase: Phase,
    pub period_returns: analytics::PeriodReturns,
    pub recent_logs: Vec<LogEntry>,
    pub analytics: AnalyticsSnapshot,
    pub tick_count: u64,
}

pub type InternalSnapshot = Snapshot<InternalStockView>;
pub type ExternalSnapshot = Snapshot<ExternalStockView>;

pub struct SimulationEngine {
    pub config: EngineConfig,
    pub stocks: Vec<Stock>,
    pub market_state: MarketState,
    pub regime: RegimeMachine,
    pub ipo: IpoManager,
    pub analytics: Analytics,
    pub market_cap_history: RingBuffer<f64>,
    pub logs: RingBuffer<LogEntry>,
    pub tick_count: u64,
    ticks_in_phase: u64,
    rng: SimRng,
}

impl SimulationEngine {
    /// Build a freshly-seeded engine: ~2-3 companies per (sector,
    /// sub-industry) pair, each drawing an initial price from a log-normal
    /// distribution.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rng(config, SimRng::from_entropy())
    }

    /// Build an engine with a deterministic RNG, for reproducible tests.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        Self::with_rng(config, SimRng::from_seed(seed))
    }

    fn with_rng(config: EngineConfig, mut rng: SimRng) -> Self {
        let mut stocks = Vec::new();
        let mut next_id: u64 = 0;

        for (sector, sub_industry) in sectors::all_sub_industries() {
            let company_count = rng.uniform_int(2, 3);
            for _ in 0..company_count {
                let ticker = sectors::generate_ticker(sector, &mut rng);
                let name = sectors::generate_name(sub_industry, &mut rng);
                let price = rng.log_normal(100.0_f64.ln(), 0.5).clamp(5.0, 2000.0);

                let (market_cap, volatility_range) = if rng.chance(0.15) {
                    (rng.uniform_range(1.0e12, 3.0e12), (0.15, 0.30))
                } else {
                    (rng.uniform_range(5.0e10, 4.5e11), (0.25, 0.45))
                };
                let shares_outstanding = market_cap / price;
                let volatility = rng.uniform_range(volatility_range.0, volatility_range.1);
                let value_score = rng.uniform_range(0.3, 0.8);

                next_id += 1;
                stocks.push(Stock::new(
                    format!("seed-{next_id}"),
                    ticker,
                    name,
                    sector.to_string(),
                    sub_industry.to_string(),
                    price,
                    shares_outstanding,
                    volatility,
                    value_score,
                ));
            }
        }

        let total_market_cap: f64 = stocks.iter().map(|s| s.market_cap).sum();

        Self {
            config,
            stocks,
            market_state: MarketState::default(),
            regime: RegimeMachine::new(),
            ipo: IpoManager::new(),
            analytics: Analytics::new(),
            market_cap_history: RingBuffer::filled(MARKET_CAP_HISTORY_CAPACITY, total_market_cap),
            logs: RingBuffer::new(LOG_CAPACITY),
            tick_count: 0,
            ticks_in_phase: 0,
            rng,
        }
    }

    fn push_log(&mut self, message: String) {
        self.logs.push(LogEntry {
            tick: self.tick_count,
            message,
        });
    }

    fn active_count(&self) -> usize {
        self.stocks.iter().filter(|s| s.is_active()).count()
    }

    /// Up to the 5 most recent log entries, oldest first.
    fn recent_logs(&self) -> Vec<LogEntry> {
        let mut recent: Vec<LogEntry> = self.logs.iter().rev().take(5).cloned().collect();
        recent.reverse();
        recent
    }

    /// Advance the simulation by exactly one tick. Steps run in the fixed
    /// order documented on the orchestrator: phase clock, regime check,
    /// macro update, price+health sweep, IPO check, market-cap history
    /// push, analytics update, winner-status refresh, tick counter.
    pub fn tick(&mut self) {
        self.advance_phase_clock();

        let transitioned = self.regime.tick(&mut self.rng);
        if transitioned {
            self.push_log(format!("Regime shifted to {}", self.regime.current));
        }

        self.update_macro();

        let regime_params = regime::params(self.regime.current);
        let mut bankrupt_tickers = Vec::new();
        for stock in &mut self.stocks {
            if let Some(StockEvent::Extinction { ticker }) = stock.tick(
                self.market_state.vix,
                self.market_state.interest_rate,
                &regime_params,
                &mut self.rng,
            ) {
                bankrupt_tickers.push(ticker);
            }
        }
        for ticker in bankrupt_tickers {
            self.analytics.record_bankruptcy();
            self.push_log(format!("{ticker} went bankrupt"));
        }

        if let Some(new_stock) = self.ipo.tick(
            self.active_count(),
            self.regime.current,
            self.market_state.vix,
            &mut self.rng,
        ) {
            self.analytics.record_ipo();
            self.push_log(format!("{} IPO'd", new_stock.ticker));
            self.stocks.push(new_stock);
        }

        let total_market_cap: f64 = self
            .stocks
            .iter()
            .filter(|s| s.is_active())
            .map(|s| s.market_cap)
            .sum();
        self.market_cap_history.push(total_market_cap);

        self.tick_count += 1;

        self.analytics.tick(
            self.tick_count,
            self.active_count(),
            self.market_state.vix,
            self.market_state.interest_rate,
            self.regime.current,
            transitioned,
            &self.market_cap_history,
        );

        if self.tick_count % WINNER_REFRESH_INTERVAL == 0 {
            self.refresh_winner_statuses();
        }
    }

    fn advance_phase_clock(&mut self) {
        self.ticks_in_phase += 1;
        let window = match self.market_state.phase {
            Phase::Trading => self.config.trading_window_ticks,
            Phase::Closed => self.config.close_window_ticks,
        };

        if self.ticks_in_phase >= window {
            self.ticks_in_phase = 0;
            let was_closed = self.market_state.phase == Phase::Closed;
            self.market_state.phase = match self.market_state.phase {
                Phase::Trading => Phase::Closed,
                Phase::Closed => Phase::Trading,
            };

            if was_closed {
                for stock in &mut self.stocks {
                    stock.apply_gap(&mut self.rng);
                }
            }
        }
    }

    fn update_macro(&mut self) {
        let params = regime::params(self.regime.current);

        let target = (params.rate_range.0 + params.rate_range.1) / 2.0;
        let eps1 = self.rng.uniform_range(-0.01, 0.01);
        self.market_state.interest_rate =
            (self.market_state.interest_rate + 0.05 * (target - self.market_state.interest_rate) + eps1)
                .max(0.0);

        let spike = if self.rng.chance(0.002) {
            self.rng.uniform_range(15.0, 40.0)
        } else if self.rng.chance(0.01) {
            self.rng.uniform_range(5.0, 12.0)
        } else {
            0.0
        };
        let eps2 = self.rng.uniform_range(-0.75, 0.75);
        self.market_state.vix = (self.market_state.vix
            - 0.15 * (self.market_state.vix - params.vix_base)
            + spike
            + eps2)
            .max(10.0);
    }

    fn refresh_winner_statuses(&mut self) {
        let active: Vec<f64> = self
            .stocks
            .iter()
            .filter(|s| s.is_active())
            .filter_map(|s| s.tracked_return())
            .collect();
        if active.is_empty() {
            return;
        }
        let market_avg_return = active.iter().sum::<f64>() / active.len() as f64;
        for stock in &mut self.stocks {
            if stock.is_active() {
                stock.refresh_winner_status(market_avg_return);
            }
        }
    }

    pub fn snapshot_internal(&self) -> InternalSnapshot {
        Snapshot {
            stocks: self.stocks.iter().map(InternalStockView::from_stock).collect(),
            market_state: MarketStateView {
                vix: self.market_state.vix,
                interest_rate: self.market_state.interest_rate,
                phase: self.market_state.phase,
            },
            regime: self.regime.current,
            time_in_phase: self.ticks_in_phase,
            phase: self.market_state.phase,
            period_returns: analytics::period_returns(&self.market_cap_history),
            recent_logs: self.recent_logs(),
            analytics: self.analytics.snapshot(self.tick_count, &self.market_cap_history),
            tick_count: self.tick_count,
        }
    }

    pub fn snapshot_external(&self) -> ExternalSnapshot {
        let phase = self.market_state.phase;
        Snapshot {
            stocks: self
                .stocks
                .iter()
                .map(|s| ExternalStockView::from_stock(s, phase))
                .collect(),
            market_state: MarketStateView {
                vix: self.market_state.vix,
                interest_rate: self.market_state.interest_rate,
                phase: self.market_state.phase,
            },
            regime: self.regime.current,
            time_in_phase: self.ticks_in_phase,
            phase: self.market_state.phase,
            period_returns: analytics::period_returns(&self.market_cap_history),
            recent_logs: self.recent_logs(),
            analytics: self.analytics.snapshot(self.tick_count, &self.market_cap_history),
            tick_count: self.tick_count,
        }
    }

    pub fn find_by_ticker(&self, ticker: &str) -> Option<&Stock> {
        self.stocks.iter().find(|s| s.ticker == ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_engine() -> SimulationEngine {
        SimulationEngine::with_seed(EngineConfig::default(), 42)
    }

    #[test]
    fn seeded_population_is_in_expected_range() {
        let engine = fresh_engine();
        assert!(engine.stocks.len() >= 64 && engine.stocks.len() <= 130);
    }

    #[test]
    fn every_active_stock_has_full_history_after_seeding() {
        let engine = fresh_engine();
        for stock in &engine.stocks {
            assert_eq!(stock.history.len(), crate::stock::HISTORY_LENGTH);
        }
    }

    #[test]
    fn phase_cadence_matches_twelve_eight_pattern() {
        let mut engine = fresh_engine();
        let mut phases = Vec::new();
        for _ in 0..40 {
            phases.push(engine.market_state.phase);
            engine.tick();
        }
        let trading_count = phases.iter().filter(|p| **p == Phase::Trading).count();
        let closed_count = phases.iter().filter(|p| **p == Phase::Closed).count();
        assert_eq!(trading_count, 24);
        assert_eq!(closed_count, 16);
    }

    #[test]
    fn vix_never_drops_below_floor() {
        let mut engine = fresh_engine();
        for _ in 0..2000 {
            engine.tick();
            assert!(engine.market_state.vix >= 10.0);
        }
    }

    #[test]
    fn active_stock_invariants_hold_after_many_ticks() {
        let mut engine = fresh_engine();
        for _ in 0..500 {
            engine.tick();
        }
        for stock in &engine.stocks {
            if stock.is_active() {
                assert!(stock.price >= 0.01);
                assert!((stock.market_cap - stock.price * stock.shares_outstanding).abs() < 1e-6);
                assert_eq!(stock.history.len(), crate::stock::HISTORY_LENGTH);
            } else {
                assert_eq!(stock.price, 0.0);
            }
        }
    }

    #[test]
    fn snapshot_stock_count_never_shrinks() {
        let mut engine = fresh_engine();
        let initial = engine.stocks.len();
        for _ in 0..1000 {
            engine.tick();
        }
        assert!(engine.stocks.len() >= initial);
    }

    #[test]
    fn calling_snapshot_twice_between_ticks_is_stable() {
        let engine = fresh_engine();
        let a = engine.snapshot_external();
        let b = engine.snapshot_external();
        assert_eq!(a.tick_count, b.tick_count);
        assert_eq!(a.stocks.len(), b.stocks.len());
    }

    #[test]
    fn external_view_omits_internal_fields_but_keeps_identity() {
        let engine = fresh_engine();
        let snap = engine.snapshot_external();
        let first = &snap.stocks[0];
        assert!(!first.ticker.is_empty());
    }
}
