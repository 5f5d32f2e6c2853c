//! On-chain access for the trading wallet
//!
//! ERC-20 reads, approvals and Aerodrome swaps, behind a trait so the
//! router and loops can run against a fake chain in tests.

use crate::config::BaseChain;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolCall;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

sol! {
    function allowance(address owner, address spender) external view returns (uint256);
    function approve(address spender, uint256 amount) external returns (bool);
    function balanceOf(address account) external view returns (uint256);

    struct Route {
        address from;
        address to;
        bool stable;
        address factory;
    }

    function swapExactTokensForTokens(
        uint256 amountIn,
        uint256 amountOutMin,
        Route[] routes,
        address to,
        uint256 deadline
    ) external returns (uint256[] amounts);
}

/// Chain operations used by the trade router and the lifecycle loops
#[async_trait]
pub trait Chain: Send + Sync {
    /// ERC-20 allowance granted by the wallet to `spender`
    async fn allowance(&self, token: Address, spender: Address) -> Result<U256>;

    /// Submit `approve(spender, amount)` and wait until it is mined
    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash>;

    /// ERC-20 balance of the wallet
    async fn balance_of(&self, token: Address) -> Result<U256>;

    /// Swap `amount_in` of `path[0]` into `path[last]` through every hop in
    /// `path`, paying out to the wallet. Waits for the receipt; a reverted
    /// transaction is an error.
    async fn swap_exact_tokens(
        &self,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        deadline: u64,
    ) -> Result<TxHash>;
}

/// JSON-RPC chain client signing with the configured wallet
pub struct RpcChain {
    provider: DynProvider,
    owner: Address,
    router: Address,
    factory: Address,
}

impl RpcChain {
    pub fn new(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self> {
        let url = rpc_url.parse().context("Invalid RPC_URL")?;
        let owner = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self {
            provider,
            owner,
            router: BaseChain::AERODROME_ROUTER.parse()?,
            factory: BaseChain::AERODROME_FACTORY.parse()?,
        })
    }

    /// Read-only contract call
    async fn call_view<C: SolCall + Send>(&self, to: Address, call: C) -> Result<C::Return> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(call.abi_encode());

        let output = self
            .provider
            .call(tx)
            .await
            .with_context(|| format!("eth_call {} on {} failed", C::SIGNATURE, to))?;

        C::abi_decode_returns(&output)
            .with_context(|| format!("Failed to decode {} result", C::SIGNATURE))
    }

    /// Sign, submit and wait for a transaction; reverted receipts are errors
    async fn send(&self, to: Address, input: Vec<u8>, label: &str) -> Result<TxHash> {
        let tx = TransactionRequest::default()
            .with_from(self.owner)
            .with_to(to)
            .with_input(input);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .with_context(|| format!("{} submission failed", label))?;

        debug!("{} submitted: {}", label, pending.tx_hash());

        let receipt = pending
            .get_receipt()
            .await
            .with_context(|| format!("{} receipt unavailable", label))?;

        if !receipt.status() {
            anyhow::bail!("{} reverted in tx {}", label, receipt.transaction_hash);
        }

        Ok(receipt.transaction_hash)
    }

    /// Consecutive hop pairs as volatile Aerodrome routes
    fn routes(&self, path: &[Address]) -> Vec<Route> {
        path.windows(2)
            .map(|hop| Route {
                from: hop[0],
                to: hop[1],
                stable: false,
                factory: self.factory,
            })
            .collect()
    }
}

#[async_trait]
impl Chain for RpcChain {
    async fn allowance(&self, token: Address, spender: Address) -> Result<U256> {
        self.call_view(
            token,
            allowanceCall {
                owner: self.owner,
                spender,
            },
        )
        .await
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash> {
        let call = approveCall { spender, amount };
        let hash = self.send(token, call.abi_encode(), "approve").await?;
        info!("Approved {} of {} for {} in {}", amount, token, spender, hash);
        Ok(hash)
    }

    async fn balance_of(&self, token: Address) -> Result<U256> {
        self.call_view(token, balanceOfCall { account: self.owner })
            .await
    }

    async fn swap_exact_tokens(
        &self,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        deadline: u64,
    ) -> Result<TxHash> {
        if path.len() < 2 {
            anyhow::bail!("swap path needs at least two assets, got {}", path.len());
        }

        let call = swapExactTokensForTokensCall {
            amountIn: amount_in,
            amountOutMin: amount_out_min,
            routes: self.routes(path),
            to: self.owner,
            deadline: U256::from(deadline),
        };

        self.send(self.router, call.abi_encode(), "swap").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_follow_path_hops() {
        let signer: PrivateKeySigner =
            "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d".parse().unwrap();
        let chain = RpcChain::new("http://localhost:8545", signer).unwrap();

        let usdc: Address = BaseChain::USDC.parse().unwrap();
        let weth: Address = BaseChain::WETH.parse().unwrap();
        let token = Address::repeat_byte(0x11);

        let routes = chain.routes(&[usdc, weth, token]);
        assert_eq!(routes.len(), 2);
        assert_eq!((routes[0].from, routes[0].to), (usdc, weth));
        assert_eq!((routes[1].from, routes[1].to), (weth, token));
        assert!(routes.iter().all(|r| !r.stable && r.factory == chain.factory));
    }

    #[test]
    fn test_swap_calldata_selector() {
        let call = swapExactTokensForTokensCall {
            amountIn: U256::from(10_000_000u64),
            amountOutMin: U256::ZERO,
            routes: vec![],
            to: Address::ZERO,
            deadline: U256::from(1u64),
        };
        assert_eq!(
            swapExactTokensForTokensCall::SIGNATURE,
            "swapExactTokensForTokens(uint256,uint256,(address,address,bool,address)[],address,uint256)"
        );
        assert_eq!(&call.abi_encode()[..4], &swapExactTokensForTokensCall::SELECTOR[..]);
    }
}
