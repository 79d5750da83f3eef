// =============================================================================
// Shared enums used across the market simulation engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Four-state macro regime the simulated market cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Regime {
    Growth,
    Stagnation,
    Contraction,
    Crisis,
}

impl Default for Regime {
    fn default() -> Self {
        Self::Growth
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Growth => write!(f, "GROWTH"),
            Self::Stagnation => write!(f, "STAGNATION"),
            Self::Contraction => write!(f, "CONTRACTION"),
            Self::Crisis => write!(f, "CRISIS"),
        }
    }
}

/// Trading-day phase clock. The market alternates between an open window
/// where prices evolve and a closed window where they hold, with a single
/// gap-pricing jump applied on the Closed -> Trading transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Trading,
    Closed,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Trading
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trading => write!(f, "TRADING"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Derived, externally-visible market status. Distinct from `Phase` because
/// external consumers only care about open/closed, not the internal clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Closed,
}

impl From<Phase> for MarketStatus {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Trading => Self::Open,
            Phase::Closed => Self::Closed,
        }
    }
}

/// Lifecycle status of an individual stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Active,
    Bankrupt,
}

impl Default for StockStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Bankrupt => write!(f, "BANKRUPT"),
        }
    }
}

/// Escape-velocity flag derived from a stock's long-run performance tracker.
/// Descriptive only; does not feed back into the price engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WinnerStatus {
    Normal,
    Winner,
}

impl Default for WinnerStatus {
    fn default() -> Self {
        Self::Normal
    }
}

/// Descriptive market-cap bucket. Purely a label recomputed from
/// `market_cap`; the price engine does not branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketCapTier {
    MegaCap,
    LargeCap,
    MidCap,
    SmallCap,
}

impl MarketCapTier {
    pub fn classify(market_cap: f64) -> Self {
        if market_cap >= 1.0e12 {
            Self::MegaCap
        } else if market_cap >= 2.0e11 {
            Self::LargeCap
        } else if market_cap >= 5.0e10 {
            Self::MidCap
        } else {
            Self::SmallCap
        }
    }
}
