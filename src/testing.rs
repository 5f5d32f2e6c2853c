//! In-memory fakes for the market data provider and the chain

use crate::chain::Chain;
use crate::scanner::MarketData;
use crate::types::{canonical_address, TokenMetrics};
use alloy::primitives::{Address, TxHash, B256, U256};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn metrics(address: &str, price: Decimal) -> TokenMetrics {
    TokenMetrics {
        address: canonical_address(address),
        symbol: "TKN".to_string(),
        decimals: 18,
        price_usd: price,
        total_reserve_usd: Decimal::from(50_000),
        volume_24h_usd: Decimal::from(10_000),
    }
}

#[derive(Default)]
pub struct FakeMarketData {
    pub candidates: Mutex<Vec<String>>,
    pub metrics: Mutex<HashMap<String, TokenMetrics>>,
    pub feed_down: AtomicBool,
    pub metrics_calls: AtomicUsize,
}

impl FakeMarketData {
    pub fn with_candidates(candidates: &[&str]) -> Self {
        let fake = Self::default();
        *fake.candidates.lock().unwrap() = candidates.iter().map(|c| c.to_string()).collect();
        fake
    }

    pub fn set_metrics(&self, m: TokenMetrics) {
        self.metrics.lock().unwrap().insert(m.address.clone(), m);
    }

    pub fn set_price(&self, address: &str, price: Decimal) {
        self.set_metrics(metrics(address, price));
    }
}

#[async_trait]
impl MarketData for FakeMarketData {
    async fn list_recent_candidates(&self) -> Result<Vec<String>> {
        if self.feed_down.load(Ordering::SeqCst) {
            anyhow::bail!("feed unavailable");
        }
        Ok(self.candidates.lock().unwrap().clone())
    }

    async fn token_metrics(&self, address: &str) -> Option<TokenMetrics> {
        self.metrics_calls.fetch_add(1, Ordering::SeqCst);
        self.metrics.lock().unwrap().get(&canonical_address(address)).cloned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapCall {
    pub amount_in: U256,
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    pub deadline: u64,
}

/// Chain fake: swaps succeed unless the matching route is told to fail.
/// A successful swap debits the input token and credits `swap_output` of
/// the output token.
pub struct FakeChain {
    pub balances: Mutex<HashMap<Address, U256>>,
    pub allowances: Mutex<HashMap<(Address, Address), U256>>,
    pub approvals: Mutex<Vec<(Address, Address, U256)>>,
    pub swaps: Mutex<Vec<SwapCall>>,
    pub swap_output: Mutex<U256>,
    pub fail_direct: AtomicBool,
    pub fail_fallback: AtomicBool,
    pub fail_approve: AtomicBool,
    /// Delay inside each swap, to widen interleaving windows in tests
    pub swap_delay: Mutex<Duration>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            allowances: Mutex::new(HashMap::new()),
            approvals: Mutex::new(Vec::new()),
            swaps: Mutex::new(Vec::new()),
            swap_output: Mutex::new(U256::from(1_000_000u64)),
            fail_direct: AtomicBool::new(false),
            fail_fallback: AtomicBool::new(false),
            fail_approve: AtomicBool::new(false),
            swap_delay: Mutex::new(Duration::ZERO),
        }
    }
}

impl FakeChain {
    pub fn set_balance(&self, token: Address, amount: U256) {
        self.balances.lock().unwrap().insert(token, amount);
    }

    pub fn balance(&self, token: Address) -> U256 {
        self.balances.lock().unwrap().get(&token).copied().unwrap_or(U256::ZERO)
    }

    pub fn swap_count(&self) -> usize {
        self.swaps.lock().unwrap().len()
    }

    pub fn approval_count(&self) -> usize {
        self.approvals.lock().unwrap().len()
    }
}

fn fake_hash(n: usize) -> TxHash {
    B256::with_last_byte(n as u8)
}

#[async_trait]
impl Chain for FakeChain {
    async fn allowance(&self, token: Address, spender: Address) -> Result<U256> {
        Ok(self
            .allowances
            .lock()
            .unwrap()
            .get(&(token, spender))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash> {
        if self.fail_approve.load(Ordering::SeqCst) {
            anyhow::bail!("approve reverted");
        }
        self.allowances.lock().unwrap().insert((token, spender), amount);
        let mut approvals = self.approvals.lock().unwrap();
        approvals.push((token, spender, amount));
        Ok(fake_hash(approvals.len()))
    }

    async fn balance_of(&self, token: Address) -> Result<U256> {
        Ok(self.balance(token))
    }

    async fn swap_exact_tokens(
        &self,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        deadline: u64,
    ) -> Result<TxHash> {
        let delay = *self.swap_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let n = {
            let mut swaps = self.swaps.lock().unwrap();
            swaps.push(SwapCall {
                amount_in,
                amount_out_min,
                path: path.to_vec(),
                deadline,
            });
            swaps.len()
        };

        let failing = if path.len() == 2 {
            &self.fail_direct
        } else {
            &self.fail_fallback
        };
        if failing.load(Ordering::SeqCst) {
            anyhow::bail!("execution reverted");
        }

        let input = path[0];
        let output = path[path.len() - 1];
        let out = *self.swap_output.lock().unwrap();
        let mut balances = self.balances.lock().unwrap();
        let held = balances.get(&input).copied().unwrap_or(U256::ZERO);
        balances.insert(input, held.saturating_sub(amount_in));
        *balances.entry(output).or_insert(U256::ZERO) += out;

        Ok(fake_hash(n))
    }
}
