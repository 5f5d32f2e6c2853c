//! Trade router: USDC <-> token swaps on Aerodrome with a bridged fallback
//!
//! Every swap first makes sure the router may spend the input amount, then
//! tries the direct two-asset route. If that attempt fails for any reason the
//! router makes exactly one more attempt through WETH. Minimum output is zero:
//! the bot does not quote prices, so any non-zero fill is accepted.

use crate::chain::Chain;
use crate::config::{BaseChain, Schedule};
use alloy::primitives::{Address, TxHash, U256};
use anyhow::Result;
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Which path a swap took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Direct,
    Fallback,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteKind::Direct => write!(f, "direct"),
            RouteKind::Fallback => write!(f, "via WETH"),
        }
    }
}

/// A swap that was mined successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub tx_hash: TxHash,
    pub route: RouteKind,
}

/// Execution failures surfaced to the lifecycle loops
#[derive(Debug, thiserror::Error)]
pub enum SwapError {
    #[error("approval failed: {0}")]
    Approval(String),

    #[error("direct route failed ({direct}); fallback route failed ({fallback})")]
    RoutesExhausted { direct: String, fallback: String },
}

/// Swap executor for the trading wallet
pub struct TradeRouter {
    chain: Arc<dyn Chain>,
    usdc: Address,
    bridge: Address,
    spender: Address,
}

impl TradeRouter {
    pub fn new(chain: Arc<dyn Chain>) -> Result<Self> {
        Ok(Self {
            chain,
            usdc: BaseChain::USDC.parse()?,
            bridge: BaseChain::WETH.parse()?,
            spender: BaseChain::AERODROME_ROUTER.parse()?,
        })
    }

    #[cfg(test)]
    pub fn usdc(&self) -> Address {
        self.usdc
    }

    /// Spend `usdc_in` (base units) on `token_out`
    pub async fn buy(&self, usdc_in: U256, token_out: Address) -> Result<SwapReceipt, SwapError> {
        self.swap(self.usdc, token_out, usdc_in).await
    }

    /// Sell `quantity_in` of `token_in` back into USDC
    pub async fn sell(&self, token_in: Address, quantity_in: U256) -> Result<SwapReceipt, SwapError> {
        self.swap(token_in, self.usdc, quantity_in).await
    }

    /// Wallet balance of `token`
    pub async fn balance_of(&self, token: Address) -> Result<U256> {
        self.chain.balance_of(token).await
    }

    async fn swap(&self, input: Address, output: Address, amount_in: U256) -> Result<SwapReceipt, SwapError> {
        self.ensure_approval(input, amount_in)
            .await
            .map_err(|e| SwapError::Approval(format!("{:#}", e)))?;

        let direct = match self.attempt(&[input, output], amount_in).await {
            Ok(tx_hash) => {
                return Ok(SwapReceipt {
                    tx_hash,
                    route: RouteKind::Direct,
                })
            }
            Err(e) => format!("{:#}", e),
        };

        warn!(
            "Direct swap {} -> {} failed ({}), retrying via WETH",
            input, output, direct
        );

        if input == self.bridge || output == self.bridge {
            return Err(SwapError::RoutesExhausted {
                direct,
                fallback: "bridge asset is an endpoint of the swap".to_string(),
            });
        }

        match self.attempt(&[input, self.bridge, output], amount_in).await {
            Ok(tx_hash) => Ok(SwapReceipt {
                tx_hash,
                route: RouteKind::Fallback,
            }),
            Err(e) => Err(SwapError::RoutesExhausted {
                direct,
                fallback: format!("{:#}", e),
            }),
        }
    }

    async fn attempt(&self, path: &[Address], amount_in: U256) -> Result<TxHash> {
        let deadline = Utc::now().timestamp().max(0) as u64 + Schedule::SWAP_DEADLINE_SECS;
        let tx_hash = self
            .chain
            .swap_exact_tokens(amount_in, U256::ZERO, path, deadline)
            .await?;

        info!("Swap {} over {} hop(s) mined: {}", amount_in, path.len() - 1, tx_hash);
        Ok(tx_hash)
    }

    /// Approve the router for `amount` of `token` unless the allowance already covers it
    async fn ensure_approval(&self, token: Address, amount: U256) -> Result<()> {
        let current = self.chain.allowance(token, self.spender).await?;
        if current >= amount {
            return Ok(());
        }

        self.chain.approve(token, self.spender, amount).await?;
        Ok(())
    }
}

/// Convert a USDC notional into base units, rounding down
pub fn usdc_base_units(notional: Decimal) -> Result<U256> {
    let scale = Decimal::from(10u64.pow(BaseChain::USDC_DECIMALS));
    let raw = notional
        .checked_mul(scale)
        .map(|units| units.floor())
        .and_then(|units| units.to_u128())
        .ok_or_else(|| anyhow::anyhow!("USDC amount {} out of range", notional))?;
    Ok(U256::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeChain;
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;

    fn token() -> Address {
        Address::repeat_byte(0x42)
    }

    fn router(chain: &Arc<FakeChain>) -> TradeRouter {
        TradeRouter::new(chain.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_buy_direct_route() {
        let chain = Arc::new(FakeChain::default());
        let router = router(&chain);

        let receipt = router.buy(U256::from(10_000_000u64), token()).await.unwrap();

        assert_eq!(receipt.route, RouteKind::Direct);
        let swaps = chain.swaps.lock().unwrap().clone();
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].path, vec![router.usdc(), token()]);
        assert_eq!(swaps[0].amount_out_min, U256::ZERO);
    }

    #[tokio::test]
    async fn test_deadline_is_two_minutes_out() {
        let chain = Arc::new(FakeChain::default());
        let before = Utc::now().timestamp() as u64;
        router(&chain).buy(U256::from(1u64), token()).await.unwrap();
        let after = Utc::now().timestamp() as u64;

        let deadline = chain.swaps.lock().unwrap()[0].deadline;
        assert!(deadline >= before + 120 && deadline <= after + 120);
    }

    #[tokio::test]
    async fn test_fallback_after_direct_failure() {
        let chain = Arc::new(FakeChain::default());
        chain.fail_direct.store(true, Ordering::SeqCst);
        let router = router(&chain);

        let receipt = router.sell(token(), U256::from(500u64)).await.unwrap();

        assert_eq!(receipt.route, RouteKind::Fallback);
        let swaps = chain.swaps.lock().unwrap().clone();
        assert_eq!(swaps.len(), 2);
        let weth: Address = BaseChain::WETH.parse().unwrap();
        assert_eq!(swaps[1].path, vec![token(), weth, router.usdc()]);
        // The fallback reuses the approval made for the direct attempt
        assert_eq!(chain.approval_count(), 1);
    }

    #[tokio::test]
    async fn test_both_routes_failing_surfaces_error() {
        let chain = Arc::new(FakeChain::default());
        chain.fail_direct.store(true, Ordering::SeqCst);
        chain.fail_fallback.store(true, Ordering::SeqCst);

        let err = router(&chain).buy(U256::from(1u64), token()).await.unwrap_err();

        assert!(matches!(err, SwapError::RoutesExhausted { .. }));
        assert_eq!(chain.swap_count(), 2);
    }

    #[tokio::test]
    async fn test_approval_skipped_when_allowance_suffices() {
        let chain = Arc::new(FakeChain::default());
        let router = router(&chain);
        let spender: Address = BaseChain::AERODROME_ROUTER.parse().unwrap();
        chain
            .allowances
            .lock()
            .unwrap()
            .insert((router.usdc(), spender), U256::from(10_000_000u64));

        router.buy(U256::from(10_000_000u64), token()).await.unwrap();
        assert_eq!(chain.approval_count(), 0);

        router.buy(U256::from(10_000_001u64), token()).await.unwrap();
        let approvals = chain.approvals.lock().unwrap().clone();
        assert_eq!(approvals, vec![(router.usdc(), spender, U256::from(10_000_001u64))]);
    }

    #[tokio::test]
    async fn test_failed_approval_attempts_no_route() {
        let chain = Arc::new(FakeChain::default());
        chain.fail_approve.store(true, Ordering::SeqCst);

        let err = router(&chain).buy(U256::from(1u64), token()).await.unwrap_err();

        assert!(matches!(err, SwapError::Approval(_)));
        assert_eq!(chain.swap_count(), 0);
    }

    #[test]
    fn test_usdc_base_units() {
        assert_eq!(usdc_base_units(dec!(10)).unwrap(), U256::from(10_000_000u64));
        assert_eq!(usdc_base_units(dec!(0.1234567)).unwrap(), U256::from(123_456u64));
        assert!(usdc_base_units(dec!(-1)).is_err());
        assert!(usdc_base_units(Decimal::MAX).is_err());
    }
}
