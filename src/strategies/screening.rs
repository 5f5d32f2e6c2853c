//! Screening policy: decides whether a candidate's metrics justify a buy
//!
//! Fixed heuristic floors: a positive price, a pool that is not dust, and
//! some trading activity in the last 24 hours.

use crate::config::ScreeningConfig;
use crate::types::TokenMetrics;
use rust_decimal::Decimal;
use std::fmt;

/// Outcome of screening a candidate
#[derive(Debug, Clone, PartialEq)]
pub enum ScreeningDecision {
    Admit,
    Reject(RejectReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    NoPrice,
    LowReserve(Decimal),
    LowVolume(Decimal),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NoPrice => write!(f, "no positive price"),
            RejectReason::LowReserve(r) => write!(f, "reserve ${} below floor", r),
            RejectReason::LowVolume(v) => write!(f, "24h volume ${} below floor", v),
        }
    }
}

/// Screening policy over token metrics
#[derive(Debug, Clone)]
pub struct ScreeningPolicy {
    config: ScreeningConfig,
}

impl ScreeningPolicy {
    pub fn new(config: ScreeningConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, metrics: &TokenMetrics) -> ScreeningDecision {
        // Decimal is always finite; unparseable provider prices arrive as zero
        if metrics.price_usd <= Decimal::ZERO {
            return ScreeningDecision::Reject(RejectReason::NoPrice);
        }
        if metrics.total_reserve_usd < self.config.min_reserve_usd {
            return ScreeningDecision::Reject(RejectReason::LowReserve(metrics.total_reserve_usd));
        }
        if metrics.volume_24h_usd < self.config.min_volume_usd {
            return ScreeningDecision::Reject(RejectReason::LowVolume(metrics.volume_24h_usd));
        }
        ScreeningDecision::Admit
    }
}

impl Default for ScreeningPolicy {
    fn default() -> Self {
        Self::new(ScreeningConfig::default())
    }
}
