//! Position Monitor - re-prices open positions and sells on take-profit / stop-loss
//!
//! Runs as a self-paced loop: the next pass starts a fixed pause after the
//! previous one finished, so a slow pass delays the next instead of overlapping.

use crate::config::Schedule;
use crate::db::Database;
use crate::executor::TradeRouter;
use crate::scanner::MarketData;
use crate::strategies::{evaluate_exit, ExitDecision};
use crate::types::Position;
use alloy::primitives::Address;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Summary of one monitor pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    pub checked: usize,
    pub held: usize,
    pub unavailable: usize,
    pub sold: usize,
    /// Positions dropped because the wallet no longer held the token
    pub cleared: usize,
    pub failed: usize,
}

#[derive(Debug)]
enum PositionOutcome {
    Held,
    Unavailable,
    Sold,
    Cleared,
}

/// Position Monitor service
pub struct PositionMonitor {
    db: Arc<Database>,
    market: Arc<dyn MarketData>,
    router: Arc<TradeRouter>,
}

impl PositionMonitor {
    pub fn new(db: Arc<Database>, market: Arc<dyn MarketData>, router: Arc<TradeRouter>) -> Self {
        Self { db, market, router }
    }

    /// Run the monitor forever: warm-up, then pass / pause / pass ...
    pub async fn run(&self) {
        info!(
            "Position monitor started (first pass in {}s, then every {}m)",
            Schedule::EXIT_CHECK_WARMUP.as_secs(),
            Schedule::EXIT_CHECK_INTERVAL.as_secs() / 60
        );

        tokio::time::sleep(Schedule::EXIT_CHECK_WARMUP).await;

        loop {
            match self.check_positions().await {
                Ok(report) => info!(
                    "Monitor pass: {} checked, {} held, {} unavailable, {} sold, {} cleared, {} failed",
                    report.checked,
                    report.held,
                    report.unavailable,
                    report.sold,
                    report.cleared,
                    report.failed
                ),
                Err(e) => error!("Monitor pass failed: {:#}", e),
            }

            tokio::time::sleep(Schedule::EXIT_CHECK_INTERVAL).await;
        }
    }

    /// Evaluate every open position once
    pub async fn check_positions(&self) -> Result<MonitorReport> {
        let positions = self
            .db
            .list_positions()
            .await
            .context("Failed to load open positions")?;

        let mut report = MonitorReport::default();

        for position in positions {
            report.checked += 1;

            match self.check_position(&position).await {
                Ok(PositionOutcome::Held) => report.held += 1,
                Ok(PositionOutcome::Unavailable) => report.unavailable += 1,
                Ok(PositionOutcome::Sold) => report.sold += 1,
                Ok(PositionOutcome::Cleared) => report.cleared += 1,
                Err(e) => {
                    // Position stays open and is re-evaluated next pass
                    warn!("Exit for {} failed: {:#}", position, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn check_position(&self, position: &Position) -> Result<PositionOutcome> {
        let Some(metrics) = self.market.token_metrics(&position.token).await else {
            return Ok(PositionOutcome::Unavailable);
        };

        let decision = evaluate_exit(position, metrics.price_usd);
        match &decision {
            ExitDecision::Hold { change_pct } => {
                match change_pct {
                    Some(change) => info!("{}: {:.2}% (hold)", position.symbol, change),
                    None => warn!("{}: no usable entry price (hold)", position.symbol),
                }
                Ok(PositionOutcome::Held)
            }
            ExitDecision::TakeProfit { change_pct } => {
                info!("TP hit for {}: +{:.2}% - selling", position.symbol, change_pct);
                self.exit_position(position).await
            }
            ExitDecision::StopLoss { change_pct } => {
                info!("SL hit for {}: {:.2}% - selling", position.symbol, change_pct);
                self.exit_position(position).await
            }
        }
    }

    /// Sell the wallet's full balance and drop the position
    async fn exit_position(&self, position: &Position) -> Result<PositionOutcome> {
        let token: Address = position
            .token
            .parse()
            .with_context(|| format!("Invalid token address {}", position.token))?;

        // Live balance rather than the stored quantity: transfers may have moved it
        let balance = self.router.balance_of(token).await?;

        if balance.is_zero() {
            info!("{} balance is zero, clearing position", position);
            self.db.remove_position(&position.token).await?;
            return Ok(PositionOutcome::Cleared);
        }

        let receipt = self.router.sell(token, balance).await?;
        info!(
            "Sold {} units of {} in {} ({})",
            balance, position, receipt.tx_hash, receipt.route
        );

        self.db.remove_position(&position.token).await?;
        Ok(PositionOutcome::Sold)
    }
}
