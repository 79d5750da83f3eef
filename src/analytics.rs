// =============================================================================
// Cycle analytics
// =============================================================================
//
// Accumulates per-tick statistics (active count, VIX, interest rate, regime
// dwell, IPO/bankruptcy counts) and finalises a `CycleStats` record every
// 7300 ticks. `market_cap_history` is global to the engine and survives
// across cycle boundaries; only the accumulators reset.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ring::RingBuffer;
use crate::types::Regime;

pub const TICKS_PER_PERIOD: u64 = 20;
pub const PERIODS_PER_CYCLE: u64 = 365;
pub const TICKS_PER_CYCLE: u64 = TICKS_PER_PERIOD * PERIODS_PER_CYCLE;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodReturns {
    pub return60: Option<f64>,
    pub return180: Option<f64>,
    pub return365: Option<f64>,
}

pub fn period_returns(market_cap_history: &RingBuffer<f64>) -> PeriodReturns {
    PeriodReturns {
        return60: return_over(market_cap_history, 60),
        return180: return_over(market_cap_history, 180),
        return365: return_over(market_cap_history, 365),
    }
}

fn return_over(history: &RingBuffer<f64>, n: usize) -> Option<f64> {
    if history.len() < n + 1 {
        return None;
    }
    let past = *history.value_n_back(n)?;
    let last = *history.newest()?;
    if past == 0.0 {
        return None;
    }
    Some(100.0 * (last - past) / past)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleStats {
    pub start_tick: u64,
    pub end_tick: u64,
    pub is_complete: bool,
    pub min_active: usize,
    pub max_active: usize,
    pub avg_active: f64,
    pub ipo_count: u64,
    pub bankruptcy_count: u64,
    pub regime_periods: HashMap<Regime, u64>,
    pub transition_count: u64,
    pub vix_min: f64,
    pub vix_median: f64,
    pub vix_max: f64,
    pub rate_min: f64,
    pub rate_median: f64,
    pub rate_max: f64,
    pub period_returns: PeriodReturns,
}

fn min_median_max(samples: &[f64]) -> (f64, f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let median = sorted[sorted.len() / 2];
    (min, median, max)
}

#[derive(Default)]
struct Accumulators {
    active_counts: Vec<usize>,
    vix_samples: Vec<f64>,
    rate_samples: Vec<f64>,
    ipo_count: u64,
    bankruptcy_count: u64,
    regime_periods: HashMap<Regime, u64>,
    transition_count: u64,
    ticks_into_current_period: u64,
}

pub struct Analytics {
    cycle_start_tick: u64,
    acc: Accumulators,
    pub completed_cycles: Vec<CycleStats>,
}

impl Default for Analytics {
    fn default() -> Self {
        Self {
            cycle_start_tick: 0,
            acc: Accumulators::default(),
            completed_cycles: Vec::new(),
        }
    }
}

impl Analytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ipo(&mut self) {
        self.acc.ipo_count += 1;
    }

    pub fn record_bankruptcy(&mut self) {
        self.acc.bankruptcy_count += 1;
    }

    /// Called once per tick after all other tick steps. `regime_transitioned`
    /// is true iff the regime manager flipped state this tick.
    pub fn tick(
        &mut self,
        tick_count: u64,
        active_count: usize,
        vix: f64,
        interest_rate: f64,
        regime: Regime,
        regime_transitioned: bool,
        market_cap_history: &RingBuffer<f64>,
    ) {
        self.acc.active_counts.push(active_count);
        self.acc.vix_samples.push(vix);
        self.acc.rate_samples.push(interest_rate);
        if regime_transitioned {
            self.acc.transition_count += 1;
        }

        self.acc.ticks_into_current_period += 1;
        if self.acc.ticks_into_current_period >= TICKS_PER_PERIOD {
            self.acc.ticks_into_current_period = 0;
            *self.acc.regime_periods.entry(regime).or_insert(0) += 1;
        }

        if tick_count > self.cycle_start_tick && (tick_count - self.cycle_start_tick) % TICKS_PER_CYCLE == 0
        {
            let finished = self.finalize(tick_count, market_cap_history);
            self.completed_cycles.push(finished);
            self.cycle_start_tick = tick_count;
            self.acc = Accumulators::default();
        }
    }

    fn finalize(&self, end_tick: u64, market_cap_history: &RingBuffer<f64>) -> CycleStats {
        self.build_stats(end_tick, true, market_cap_history)
    }

    /// The in-progress cycle, computed on demand the same way a finalised
    /// one would be.
    pub fn current_cycle(&self, current_tick: u64, market_cap_history: &RingBuffer<f64>) -> CycleStats {
        self.build_stats(current_tick, false, market_cap_history)
    }

    fn build_stats(
        &self,
        end_tick: u64,
        is_complete: bool,
        market_cap_history: &RingBuffer<f64>,
    ) -> CycleStats {
        let active = &self.acc.active_counts;
        let (min_active, max_active, avg_active) = if active.is_empty() {
            (0, 0, 0.0)
        } else {
            let min = *active.iter().min().unwrap();
            let max = *active.iter().max().unwrap();
            let avg = active.iter().sum::<usize>() as f64 / active.len() as f64;
            (min, max, avg)
        };

        let (vix_min, vix_median, vix_max) = min_median_max(&self.acc.vix_samples);
        let (rate_min, rate_median, rate_max) = min_median_max(&self.acc.rate_samples);

        CycleStats {
            start_tick: self.cycle_start_tick,
            end_tick,
            is_complete,
            min_active,
            max_active,
            avg_active,
            ipo_count: self.acc.ipo_count,
            bankruptcy_count: self.acc.bankruptcy_count,
            regime_periods: self.acc.regime_periods.clone(),
            transition_count: self.acc.transition_count,
            vix_min,
            vix_median,
            vix_max,
            rate_min,
            rate_median,
            rate_max,
            period_returns: period_returns(market_cap_history),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub completed_cycle_count: usize,
    pub total_ipo_count: u64,
    pub total_bankruptcy_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub completed_cycles: Vec<CycleStats>,
    pub current_cycle: CycleStats,
    pub summary: AnalyticsSummary,
}

impl Analytics {
    pub fn snapshot(&self, current_tick: u64, market_cap_history: &RingBuffer<f64>) -> AnalyticsSnapshot {
        let current_cycle = self.current_cycle(current_tick, market_cap_history);
        let total_ipo_count = self.completed_cycles.iter().map(|c| c.ipo_count).sum::<u64>()
            + current_cycle.ipo_count;
        let total_bankruptcy_count = self
            .completed_cycles
            .iter()
            .map(|c| c.bankruptcy_count)
            .sum::<u64>()
            + current_cycle.bankruptcy_count;

        AnalyticsSnapshot {
            completed_cycles: self.completed_cycles.clone(),
            current_cycle,
            summary: AnalyticsSummary {
                completed_cycle_count: self.completed_cycles.len(),
                total_ipo_count,
                total_bankruptcy_count,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_return_is_none_without_enough_samples() {
        let history = RingBuffer::filled(10, 100.0);
        assert!(return_over(&history, 60).is_none());
    }

    #[test]
    fn period_return_computes_percentage_change() {
        let mut history = RingBuffer::new(100);
        for _ in 0..61 {
            history.push(100.0);
        }
        history.push(110.0); // overwrites nothing, len stays at 62 since cap 100
        let r = return_over(&history, 60).unwrap();
        assert!((r - 10.0).abs() < 1e-9);
    }

    #[test]
    fn cycle_finalizes_exactly_at_boundary() {
        let mut analytics = Analytics::new();
        let history = RingBuffer::filled(1461, 1_000_000.0);
        for tick in 1..=TICKS_PER_CYCLE {
            analytics.tick(tick, 90, 15.0, 1.0, Regime::Growth, false, &history);
        }
        assert_eq!(analytics.completed_cycles.len(), 1);
        let cycle = &analytics.completed_cycles[0];
        assert_eq!(cycle.end_tick - cycle.start_tick, TICKS_PER_CYCLE);
        assert!(cycle.is_complete);
    }

    #[test]
    fn current_cycle_resets_after_rollover() {
        let mut analytics = Analytics::new();
        let history = RingBuffer::filled(1461, 1_000_000.0);
        for tick in 1..=TICKS_PER_CYCLE {
            analytics.tick(tick, 90, 15.0, 1.0, Regime::Growth, false, &history);
        }
        let current = analytics.current_cycle(TICKS_PER_CYCLE, &history);
        assert_eq!(current.min_active, 0);
        assert_eq!(current.max_active, 0);
    }

    #[test]
    fn regime_dwell_accumulates_one_period_per_twenty_ticks() {
        let mut analytics = Analytics::new();
        let history = RingBuffer::filled(1461, 1_000_000.0);
        for tick in 1..=40 {
            analytics.tick(tick, 90, 15.0, 1.0, Regime::Growth, false, &history);
        }
        let current = analytics.current_cycle(40, &history);
        assert_eq!(current.regime_periods.get(&Regime::Growth), Some(&2));
    }
}
