//! Configuration management for the token sniper

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Bot configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Base JSON-RPC endpoint
    pub rpc_url: String,

    /// Hex private key used to sign swaps and approvals
    pub private_key: String,

    /// Path to SQLite database
    pub database_path: String,

    /// Control surface bind address
    pub bind_addr: String,

    /// Take-profit threshold in percent (30 = +30%)
    pub take_profit_pct: Decimal,

    /// Stop-loss threshold in percent (20 = -20%)
    pub stop_loss_pct: Decimal,

    /// USDC spent per buy
    pub buy_notional_usdc: Decimal,

    /// Discovery interval in seconds
    pub poll_interval_seconds: u64,

    /// Screening floors
    pub screening: ScreeningConfig,

    /// GeckoTerminal settings
    pub market_data: MarketDataConfig,
}

/// Screening floors applied to candidate metrics
#[derive(Debug, Clone)]
pub struct ScreeningConfig {
    /// Minimum total pool reserve in USD
    pub min_reserve_usd: Decimal,
    /// Minimum 24h volume in USD
    pub min_volume_usd: Decimal,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            min_reserve_usd: Decimal::from(5_000),
            min_volume_usd: Decimal::from(1_000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    pub base_url: String,
    pub network: String,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: GeckoTerminalApi::BASE_URL.to_string(),
            network: "base".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let rpc_url = required("RPC_URL")?;
        let private_key = required("PRIVATE_KEY")?;

        let database_path = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "state.sqlite".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let take_profit_pct = decimal_or("TP_PCT", Decimal::from(30));
        let stop_loss_pct = decimal_or("SL_PCT", Decimal::from(20));
        let buy_notional_usdc = decimal_or("BUY_USDC", Decimal::from(10));

        let poll_interval_seconds = env::var("POLL_SEC")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(120);

        let defaults = ScreeningConfig::default();
        let screening = ScreeningConfig {
            min_reserve_usd: decimal_or("MIN_RESERVE_USD", defaults.min_reserve_usd),
            min_volume_usd: decimal_or("MIN_VOLUME_USD", defaults.min_volume_usd),
        };

        let defaults = MarketDataConfig::default();
        let market_data = MarketDataConfig {
            base_url: env::var("GECKO_API_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.base_url),
            network: env::var("GECKO_NETWORK")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.network),
        };

        let config = Self {
            rpc_url,
            private_key,
            database_path,
            bind_addr,
            take_profit_pct,
            stop_loss_pct,
            buy_notional_usdc,
            poll_interval_seconds,
            screening,
            market_data,
        };
        config.validate()?;

        Ok(config)
    }

    /// Reject thresholds that would make the lifecycle meaningless
    pub fn validate(&self) -> Result<()> {
        if self.take_profit_pct <= Decimal::ZERO {
            anyhow::bail!("TP_PCT must be positive, got {}", self.take_profit_pct);
        }
        if self.stop_loss_pct <= Decimal::ZERO {
            anyhow::bail!("SL_PCT must be positive, got {}", self.stop_loss_pct);
        }
        if self.buy_notional_usdc <= Decimal::ZERO {
            anyhow::bail!("BUY_USDC must be positive, got {}", self.buy_notional_usdc);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .with_context(|| format!("{} must be set", key))
}

fn decimal_or(key: &str, default: Decimal) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|v| Decimal::from_str(v.trim()).ok())
        .unwrap_or(default)
}

/// Fixed lifecycle timings
pub struct Schedule;

impl Schedule {
    /// Pause between exit-monitor passes
    pub const EXIT_CHECK_INTERVAL: Duration = Duration::from_secs(30 * 60);
    /// Delay before the first exit-monitor pass
    pub const EXIT_CHECK_WARMUP: Duration = Duration::from_secs(5);
    /// Candidates older than this (since first sighting) are never bought
    pub const FRESHNESS_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;
    /// Absolute deadline applied to every swap
    pub const SWAP_DEADLINE_SECS: u64 = 120;
}

/// GeckoTerminal API configuration
pub struct GeckoTerminalApi;

impl GeckoTerminalApi {
    pub const BASE_URL: &'static str = "https://api.geckoterminal.com/api/v2";

    pub fn recently_updated_url(base: &str, network: &str) -> String {
        format!("{}/tokens/info_recently_updated?network={}", base, network)
    }

    pub fn token_url(base: &str, network: &str, address: &str) -> String {
        format!("{}/networks/{}/tokens/{}", base, network, address)
    }
}

/// Contract addresses on Base
pub struct BaseChain;

impl BaseChain {
    pub const USDC: &'static str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
    pub const USDC_DECIMALS: u32 = 6;
    pub const WETH: &'static str = "0x4200000000000000000000000000000000000006";
    pub const AERODROME_ROUTER: &'static str = "0xcF77a3Ba9A5CA399B7c97c74d54e5b1Beb874E43";
    pub const AERODROME_FACTORY: &'static str = "0x420DD381b31aEf6683db6B902084cB0FFECe40Da";
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        rpc_url: "http://localhost:8545".to_string(),
        private_key: "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d".to_string(),
        database_path: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        take_profit_pct: Decimal::from(30),
        stop_loss_pct: Decimal::from(20),
        buy_notional_usdc: Decimal::from(10),
        poll_interval_seconds: 120,
        screening: ScreeningConfig::default(),
        market_data: MarketDataConfig::default(),
    }
}
