//! Core types for the token sniper

use alloy::primitives::U256;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Market metrics for a single token, as reported by the data provider
#[derive(Debug, Clone, PartialEq)]
pub struct TokenMetrics {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    pub price_usd: Decimal,
    pub total_reserve_usd: Decimal,
    pub volume_24h_usd: Decimal,
}

/// First sighting of a candidate token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenToken {
    pub token: String,
    pub first_seen_ms: i64,
}

/// An open position awaiting a take-profit or stop-loss exit
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    /// Lower-cased token address
    pub token: String,
    pub symbol: String,
    pub decimals: u8,
    /// Held amount in token base units, as observed right after the buy
    pub quantity: U256,
    pub entry_price_usd: Decimal,
    pub take_profit_pct: Decimal,
    pub stop_loss_pct: Decimal,
    pub bought_at_ms: i64,
}

impl Position {
    /// Percent change of `current_price` against the entry price.
    ///
    /// Returns `None` when the entry price is not positive. A move too large
    /// for `Decimal` saturates to `Decimal::MAX` / `Decimal::MIN`, so it still
    /// crosses the matching threshold.
    pub fn change_pct(&self, current_price: Decimal) -> Option<Decimal> {
        if self.entry_price_usd <= Decimal::ZERO {
            return None;
        }

        let change = current_price
            .checked_sub(self.entry_price_usd)
            .and_then(|delta| delta.checked_div(self.entry_price_usd))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));

        Some(change.unwrap_or(if current_price > self.entry_price_usd {
            Decimal::MAX
        } else {
            Decimal::MIN
        }))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.token)
    }
}

/// JSON view of a position for the control surface
#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    pub token: String,
    pub symbol: String,
    pub decimals: u8,
    pub quantity: String,
    pub entry_price_usd: Decimal,
    pub take_profit_pct: Decimal,
    pub stop_loss_pct: Decimal,
    pub bought_at_ms: i64,
}

impl From<&Position> for PositionView {
    fn from(p: &Position) -> Self {
        Self {
            token: p.token.clone(),
            symbol: p.symbol.clone(),
            decimals: p.decimals,
            quantity: p.quantity.to_string(),
            entry_price_usd: p.entry_price_usd,
            take_profit_pct: p.take_profit_pct,
            stop_loss_pct: p.stop_loss_pct,
            bought_at_ms: p.bought_at_ms,
        }
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Canonical form used for every address comparison and storage key
pub fn canonical_address(address: &str) -> String {
    address.trim().to_lowercase()
}
