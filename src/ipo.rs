// =============================================================================
// IPO manager
// =============================================================================
//
// Gated-probability admission, independent of bankruptcy activity: every
// `CHECK_INTERVAL` ticks, if the regime/VIX/population gates pass, a single
// new stock is admitted with probability `ADMISSION_PROBABILITY`.

use crate::rng::SimRng;
use crate::sectors;
use crate::stock::Stock;
use crate::types::Regime;

pub const CHECK_INTERVAL: u64 = 50;
const ADMISSION_PROBABILITY: f64 = 0.10;
const MAX_ACTIVE_STOCKS: usize = 110;
const VIX_GATE: f64 = 25.0;

pub struct IpoManager {
    ticks_since_check: u64,
    next_id: u64,
}

impl Default for IpoManager {
    fn default() -> Self {
        Self {
            ticks_since_check: 0,
            next_id: 0,
        }
    }
}

impl IpoManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the check clock by one tick. When the interval elapses and
    /// all gates pass, returns a newly-admitted `Stock`.
    pub fn tick(
        &mut self,
        active_count: usize,
        regime: Regime,
        vix: f64,
        rng: &mut SimRng,
    ) -> Option<Stock> {
        self.ticks_since_check += 1;
        if self.ticks_since_check < CHECK_INTERVAL {
            return None;
        }
        self.ticks_since_check = 0;

        if active_count >= MAX_ACTIVE_STOCKS {
            return None;
        }
        if regime != Regime::Growth {
            return None;
        }
        if vix > VIX_GATE {
            return None;
        }
        if !rng.chance(ADMISSION_PROBABILITY) {
            return None;
        }

        Some(self.admit(rng))
    }

    fn admit(&mut self, rng: &mut SimRng) -> Stock {
        let (sector, sub_industry) = sectors::random_sub_industry(rng);
        let ticker = sectors::generate_ticker(sector, rng);
        let name = sectors::generate_name(sub_industry, rng);

        let price = rng.uniform_range(80.0, 120.0);

        let (market_cap, volatility_range) = if rng.chance(0.85) {
            (rng.uniform_range(0.25e9, 2.0e9), (0.35, 0.55))
        } else {
            (rng.uniform_range(2.0e9, 10.0e9), (0.25, 0.40))
        };
        let shares_outstanding = market_cap / price;
        let volatility = rng.uniform_range(volatility_range.0, volatility_range.1);

        self.next_id += 1;
        let id = format!("ipo-{}", self.next_id);

        Stock::new(
            id,
            ticker,
            name,
            sector.to_string(),
            sub_industry.to_string(),
            price,
            shares_outstanding,
            volatility,
            0.4,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_ipo_before_interval_elapses() {
        let mut manager = IpoManager::new();
        let mut rng = SimRng::from_seed(1);
        for _ in 0..CHECK_INTERVAL - 1 {
            assert!(manager.tick(50, Regime::Growth, 15.0, &mut rng).is_none());
        }
    }

    #[test]
    fn no_ipo_when_population_at_cap() {
        let mut manager = IpoManager::new();
        let mut rng = SimRng::from_seed(2);
        for _ in 0..CHECK_INTERVAL {
            let result = manager.tick(MAX_ACTIVE_STOCKS, Regime::Growth, 15.0, &mut rng);
            assert!(result.is_none());
        }
    }

    #[test]
    fn no_ipo_outside_growth_regime() {
        let mut manager = IpoManager::new();
        let mut rng = SimRng::from_seed(3);
        for _ in 0..CHECK_INTERVAL {
            let result = manager.tick(50, Regime::Crisis, 15.0, &mut rng);
            assert!(result.is_none());
        }
    }

    #[test]
    fn no_ipo_when_vix_too_high() {
        let mut manager = IpoManager::new();
        let mut rng = SimRng::from_seed(4);
        for _ in 0..CHECK_INTERVAL {
            let result = manager.tick(50, Regime::Growth, 30.0, &mut rng);
            assert!(result.is_none());
        }
    }

    #[test]
    fn admitted_stock_has_sane_fields() {
        let mut manager = IpoManager::new();
        let mut rng = SimRng::from_seed(5);
        let mut admitted = None;
        for _ in 0..5000 {
            if let Some(stock) = manager.tick(50, Regime::Growth, 15.0, &mut rng) {
                admitted = Some(stock);
                break;
            }
        }
        let stock = admitted.expect("expected at least one IPO over 5000 ticks");
        assert!(stock.price >= 80.0 && stock.price <= 120.0);
        assert!(stock.shares_outstanding > 0.0);
        assert_eq!(stock.value_score, 0.4);
        assert_eq!(stock.metabolic_health, 1.0);
        assert_eq!(stock.history.len(), crate::stock::HISTORY_LENGTH);
    }
}
