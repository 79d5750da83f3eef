// =============================================================================
// Stock price & health engine
// =============================================================================
//
// One stock's state and its per-tick evolution (formula in module docs on
// `Stock::tick`). Bankruptcy is one-way: once a stock goes bankrupt it is
// never mutated again, but it is kept in the population as a tombstone so
// aggregate counts and history remain auditable.

use serde::{Deserialize, Serialize};

use crate::regime::RegimeParams;
use crate::rng::SimRng;
use crate::ring::RingBuffer;
use crate::types::{MarketCapTier, StockStatus, WinnerStatus};

pub const HISTORY_LENGTH: usize = 60;
pub const PERFORMANCE_TRACKER_LEN: usize = 1460;

const HEALTH_MIN: f64 = 0.0;
const HEALTH_MAX: f64 = 1.2;
const MIN_ACTIVE_PRICE: f64 = 0.01;
const BANKRUPTCY_PRICE_THRESHOLD: f64 = 0.25;
const BANKRUPTCY_HEALTH_THRESHOLD: f64 = 0.05;

/// A tick-level event worth recording in the orchestrator's log ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StockEvent {
    Extinction { ticker: String },
}

pub struct Stock {
    pub id: String,
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub sub_industry: String,

    pub price: f64,
    pub shares_outstanding: f64,
    pub market_cap: f64,

    pub volatility: f64,
    pub value_score: f64,
    pub metabolic_health: f64,

    pub history: RingBuffer<f64>,
    pub performance_tracker: RingBuffer<f64>,

    pub status: StockStatus,
    pub winner_status: WinnerStatus,
}

impl Stock {
    pub fn new(
        id: String,
        ticker: String,
        name: String,
        sector: String,
        sub_industry: String,
        price: f64,
        shares_outstanding: f64,
        volatility: f64,
        value_score: f64,
    ) -> Self {
        let market_cap = price * shares_outstanding;
        Self {
            id,
            ticker,
            name,
            sector,
            sub_industry,
            price,
            shares_outstanding,
            market_cap,
            volatility,
            value_score,
            metabolic_health: 1.0,
            history: RingBuffer::filled(HISTORY_LENGTH, price),
            performance_tracker: RingBuffer::filled(PERFORMANCE_TRACKER_LEN, price),
            status: StockStatus::Active,
            winner_status: WinnerStatus::Normal,
        }
    }

    pub fn market_cap_tier(&self) -> MarketCapTier {
        MarketCapTier::classify(self.market_cap)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, StockStatus::Active)
    }

    /// Evolve the stock by one tick: metabolic cost, performance
    /// regeneration, health clamp, drift, bounded volatility shock, price
    /// step, bankruptcy test, commit.
    ///
    /// No-op for stocks already bankrupt.
    pub fn tick(
        &mut self,
        vix: f64,
        interest_rate: f64,
        regime: &RegimeParams,
        rng: &mut SimRng,
    ) -> Option<StockEvent> {
        if !self.is_active() {
            return None;
        }

        // 1. Metabolic cost.
        let cost = 0.0004 * (interest_rate / 5.0) + 0.0005 * (vix / 90.0);

        // 2. Performance regeneration.
        let perf = if self.history.len() >= HISTORY_LENGTH {
            match self.history.value_n_back(HISTORY_LENGTH - 1) {
                Some(&past) if past != 0.0 => ((self.price - past) / past) * 0.02,
                _ => 0.0,
            }
        } else {
            0.0
        };

        // 3. Health update.
        self.metabolic_health =
            (self.metabolic_health - cost + perf + regime.health_regen).clamp(HEALTH_MIN, HEALTH_MAX);

        // 4. Drift.
        let drift = (self.value_score * 2e-5) * regime.drift_multiplier
            + (self.metabolic_health - 0.5) * 1e-5;

        // 5. Volatility term.
        let v = (self.volatility / 50.0) * (vix / 14.0);
        let u = rng.uniform();
        let term = (v * (u - 0.5)).clamp(-0.015, 0.015);

        // 6. Price step.
        self.price = (self.price * (drift + term).exp()).max(MIN_ACTIVE_PRICE);

        // 7. Bankruptcy test.
        if self.price < BANKRUPTCY_PRICE_THRESHOLD && self.metabolic_health <= BANKRUPTCY_HEALTH_THRESHOLD
        {
            self.status = StockStatus::Bankrupt;
            self.price = 0.0;
            self.market_cap = 0.0;
            return Some(StockEvent::Extinction {
                ticker: self.ticker.clone(),
            });
        }

        // 8. Commit.
        self.market_cap = self.price * self.shares_outstanding;
        self.history.push(self.price);
        self.performance_tracker.push(self.price);

        None
    }

    /// Apply a one-off gap-pricing jump on market reopen. Does not touch
    /// `history`.
    pub fn apply_gap(&mut self, rng: &mut SimRng) {
        if !self.is_active() {
            return;
        }
        let direction = if rng.chance(0.5) { 1.0 } else { -1.0 };
        let magnitude = rng.uniform_range(0.005, 0.020);
        self.price = (self.price * (1.0 + direction * magnitude)).max(0.1);
        self.market_cap = self.price * self.shares_outstanding;
    }

    /// Return over the performance tracker window, for winner-status
    /// detection. `None` if the tracker is not yet full.
    pub fn tracked_return(&self) -> Option<f64> {
        let oldest = self.performance_tracker.value_n_back(self.performance_tracker.len() - 1)?;
        if *oldest == 0.0 {
            return None;
        }
        Some((self.price - oldest) / oldest)
    }

    /// Refresh `winner_status` against the market's average return over the
    /// same window, using an escape-velocity threshold and a lower
    /// hysteresis band to fall back to normal.
    pub fn refresh_winner_status(&mut self, market_avg_return: f64) {
        let Some(own_return) = self.tracked_return() else {
            return;
        };
        match self.winner_status {
            WinnerStatus::Normal => {
                if own_return > market_avg_return * 1.5 {
                    self.winner_status = WinnerStatus::Winner;
                }
            }
            WinnerStatus::Winner => {
                if own_return < market_avg_return * 0.8 {
                    self.winner_status = WinnerStatus::Normal;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::params;
    use crate::types::Regime;

    fn sample_stock() -> Stock {
        Stock::new(
            "id-1".to_string(),
            "TST".to_string(),
            "Test Systems".to_string(),
            "Technology".to_string(),
            "Cloud".to_string(),
            100.0,
            1_000_000.0,
            0.3,
            0.5,
        )
    }

    #[test]
    fn new_stock_has_full_history_of_initial_price() {
        let stock = sample_stock();
        assert_eq!(stock.history.len(), HISTORY_LENGTH);
        assert_eq!(stock.history.newest(), Some(&100.0));
        assert_eq!(stock.market_cap, 100.0 * 1_000_000.0);
    }

    #[test]
    fn tick_keeps_history_length_fixed() {
        let mut stock = sample_stock();
        let mut rng = SimRng::from_seed(1);
        let regime = params(Regime::Growth);
        stock.tick(15.0, 1.0, &regime, &mut rng);
        assert_eq!(stock.history.len(), HISTORY_LENGTH);
    }

    #[test]
    fn market_cap_always_matches_price_times_shares() {
        let mut stock = sample_stock();
        let mut rng = SimRng::from_seed(2);
        let regime = params(Regime::Growth);
        for _ in 0..50 {
            stock.tick(15.0, 1.0, &regime, &mut rng);
            if stock.is_active() {
                let expected = stock.price * stock.shares_outstanding;
                assert!((stock.market_cap - expected).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn bankruptcy_zeroes_price_and_market_cap() {
        let mut stock = sample_stock();
        stock.price = 0.1;
        stock.metabolic_health = 0.0;
        let mut rng = SimRng::from_seed(3);
        let regime = params(Regime::Crisis);

        // Force the price step to stay under the threshold by using a
        // regime with strongly negative drift and a low starting price.
        let event = stock.tick(35.0, 5.0, &regime, &mut rng);
        if stock.price < 0.25 && !stock.is_active() {
            assert!(matches!(event, Some(StockEvent::Extinction { .. })));
            assert_eq!(stock.price, 0.0);
            assert_eq!(stock.market_cap, 0.0);
        }
    }

    #[test]
    fn bankrupt_stock_is_never_mutated_again() {
        let mut stock = sample_stock();
        stock.status = StockStatus::Bankrupt;
        stock.price = 0.0;
        let mut rng = SimRng::from_seed(4);
        let regime = params(Regime::Growth);
        let event = stock.tick(15.0, 1.0, &regime, &mut rng);
        assert!(event.is_none());
        assert_eq!(stock.price, 0.0);
    }

    #[test]
    fn gap_pricing_moves_price_within_bounded_range() {
        let mut stock = sample_stock();
        stock.price = 100.0;
        let mut rng = SimRng::from_seed(5);
        for _ in 0..100 {
            stock.price = 100.0;
            stock.apply_gap(&mut rng);
            let ratio = stock.price / 100.0;
            let in_up = (1.005..=1.020).contains(&ratio);
            let in_down = (0.980..=0.995).contains(&ratio);
            assert!(in_up || in_down, "ratio {ratio} out of bounds");
        }
    }

    #[test]
    fn gap_pricing_does_not_touch_history() {
        let mut stock = sample_stock();
        let before = stock.history.as_vec();
        let mut rng = SimRng::from_seed(6);
        stock.apply_gap(&mut rng);
        assert_eq!(stock.history.as_vec(), before);
    }
}
