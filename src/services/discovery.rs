//! Discovery loop - finds fresh candidate tokens and buys the ones that pass screening
//!
//! Per candidate: record first sighting, drop stale candidates (first seen more
//! than 24h ago), fetch metrics, screen, skip tokens already held, then buy and
//! persist a position sized by the wallet's actual post-trade balance.

use crate::config::{Config, Schedule};
use crate::db::Database;
use crate::executor::{usdc_base_units, TradeRouter};
use crate::scanner::MarketData;
use crate::strategies::{RejectReason, ScreeningDecision, ScreeningPolicy};
use crate::types::{canonical_address, now_ms, Position, TokenMetrics};
use alloy::primitives::Address;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Entry parameters captured into each new position
#[derive(Debug, Clone)]
pub struct EntrySettings {
    pub buy_notional_usdc: Decimal,
    pub take_profit_pct: Decimal,
    pub stop_loss_pct: Decimal,
}

impl From<&Config> for EntrySettings {
    fn from(config: &Config) -> Self {
        Self {
            buy_notional_usdc: config.buy_notional_usdc,
            take_profit_pct: config.take_profit_pct,
            stop_loss_pct: config.stop_loss_pct,
        }
    }
}

/// Summary of one discovery pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub candidates: usize,
    pub stale: usize,
    pub unavailable: usize,
    pub rejected: usize,
    pub already_held: usize,
    pub bought: usize,
    pub failed: usize,
}

#[derive(Debug)]
enum CandidateOutcome {
    Stale,
    Unavailable,
    Rejected(RejectReason),
    AlreadyHeld,
    Bought(Position),
    NothingReceived,
}

/// Whether a token first seen at `first_seen_ms` may still be bought at `now_ms`
pub fn is_fresh(first_seen_ms: i64, now_ms: i64) -> bool {
    now_ms - first_seen_ms <= Schedule::FRESHNESS_WINDOW_MS
}

/// Discovery service
pub struct Discovery {
    db: Arc<Database>,
    market: Arc<dyn MarketData>,
    router: Arc<TradeRouter>,
    screening: ScreeningPolicy,
    entry: EntrySettings,
    /// Held for the whole pass; passes never overlap
    in_flight: Mutex<()>,
}

impl Discovery {
    pub fn new(
        db: Arc<Database>,
        market: Arc<dyn MarketData>,
        router: Arc<TradeRouter>,
        screening: ScreeningPolicy,
        entry: EntrySettings,
    ) -> Self {
        Self {
            db,
            market,
            router,
            screening,
            entry,
            in_flight: Mutex::new(()),
        }
    }

    /// Run discovery every `period`, starting one period from now
    pub async fn run(&self, period: Duration) {
        info!("Discovery started (every {}s)", period.as_secs());

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.try_run_once().await {
                Some(Ok(report)) => log_report(&report),
                Some(Err(e)) => error!("Discovery cycle failed: {:#}", e),
                None => debug!("Discovery pass still running, skipping tick"),
            }
        }
    }

    /// Run one pass, waiting for any pass already in progress to finish first
    pub async fn run_once(&self) -> Result<DiscoveryReport> {
        let _guard = self.in_flight.lock().await;
        self.cycle(now_ms()).await
    }

    /// Run one pass unless another is in progress
    pub async fn try_run_once(&self) -> Option<Result<DiscoveryReport>> {
        let _guard = self.in_flight.try_lock().ok()?;
        Some(self.cycle(now_ms()).await)
    }

    #[cfg(test)]
    async fn run_once_at(&self, now_ms: i64) -> Result<DiscoveryReport> {
        let _guard = self.in_flight.lock().await;
        self.cycle(now_ms).await
    }

    async fn cycle(&self, now_ms: i64) -> Result<DiscoveryReport> {
        let candidates = self
            .market
            .list_recent_candidates()
            .await
            .context("Failed to fetch candidate tokens")?;

        let mut report = DiscoveryReport {
            candidates: candidates.len(),
            ..Default::default()
        };

        for candidate in candidates {
            let address = canonical_address(&candidate);

            match self.process_candidate(&address, now_ms).await {
                Ok(CandidateOutcome::Stale) => report.stale += 1,
                Ok(CandidateOutcome::Unavailable) => report.unavailable += 1,
                Ok(CandidateOutcome::Rejected(reason)) => {
                    debug!("Rejected {}: {}", address, reason);
                    report.rejected += 1;
                }
                Ok(CandidateOutcome::AlreadyHeld) => report.already_held += 1,
                Ok(CandidateOutcome::Bought(position)) => {
                    info!(
                        "Opened position {}: {} units @ ${}",
                        position, position.quantity, position.entry_price_usd
                    );
                    report.bought += 1;
                }
                Ok(CandidateOutcome::NothingReceived) => report.failed += 1,
                Err(e) => {
                    warn!("Candidate {} failed: {:#}", address, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn process_candidate(&self, address: &str, now_ms: i64) -> Result<CandidateOutcome> {
        let seen = self.db.record_seen(address, now_ms).await?;
        if !is_fresh(seen.first_seen_ms, now_ms) {
            return Ok(CandidateOutcome::Stale);
        }

        let Some(metrics) = self.market.token_metrics(address).await else {
            return Ok(CandidateOutcome::Unavailable);
        };

        if let ScreeningDecision::Reject(reason) = self.screening.evaluate(&metrics) {
            return Ok(CandidateOutcome::Rejected(reason));
        }

        // Checked before spending funds
        if self.db.has_position(address).await? {
            return Ok(CandidateOutcome::AlreadyHeld);
        }

        self.buy(address, &metrics).await
    }

    async fn buy(&self, address: &str, metrics: &TokenMetrics) -> Result<CandidateOutcome> {
        let token: Address = address
            .parse()
            .with_context(|| format!("Invalid token address {}", address))?;
        let usdc_in = usdc_base_units(self.entry.buy_notional_usdc)?;

        info!(
            "Buying {} ({}) @ ~${} for {} USDC",
            metrics.symbol, address, metrics.price_usd, self.entry.buy_notional_usdc
        );

        let receipt = self.router.buy(usdc_in, token).await?;
        info!("Buy tx {} ({})", receipt.tx_hash, receipt.route);

        // Slippage and fees mean the fill is not the nominal amount
        let quantity = self
            .router
            .balance_of(token)
            .await
            .with_context(|| format!("Bought {} but could not read its balance", address))?;

        if quantity.is_zero() {
            warn!("Buy of {} mined but wallet balance is zero", address);
            return Ok(CandidateOutcome::NothingReceived);
        }

        let position = Position {
            token: address.to_string(),
            symbol: metrics.symbol.clone(),
            decimals: metrics.decimals,
            quantity,
            entry_price_usd: metrics.price_usd,
            take_profit_pct: self.entry.take_profit_pct,
            stop_loss_pct: self.entry.stop_loss_pct,
            bought_at_ms: now_ms(),
        };
        self.db.upsert_position(&position).await?;

        Ok(CandidateOutcome::Bought(position))
    }
}

/// Log a one-line summary of a discovery pass
pub fn log_report(report: &DiscoveryReport) {
    info!(
        "Discovery pass: {} candidates, {} stale, {} unavailable, {} rejected, {} held, {} bought, {} failed",
        report.candidates,
        report.stale,
        report.unavailable,
        report.rejected,
        report.already_held,
        report.bought,
        report.failed
    );
}
