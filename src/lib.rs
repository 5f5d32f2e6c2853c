//! Base Token Sniper Library
//!
//! Discovers recently updated tokens on Base via GeckoTerminal, buys the ones
//! that pass a liquidity/volume screen with a fixed USDC notional on Aerodrome,
//! and sells each position once it moves past its take-profit or stop-loss
//! threshold.

pub mod api;
pub mod chain;
pub mod config;
pub mod db;
pub mod executor;
pub mod scanner;
pub mod services;
pub mod strategies;
pub mod types;
pub mod wallet;

#[cfg(test)]
mod testing;

pub use chain::{Chain, RpcChain};
pub use config::Config;
pub use db::Database;
pub use executor::{SwapError, TradeRouter};
pub use scanner::{MarketData, Scanner};
pub use services::{Discovery, PositionMonitor};
pub use types::{Position, TokenMetrics};
pub use wallet::load_signer;
