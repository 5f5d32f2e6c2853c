//! Market data client for the GeckoTerminal API

use crate::config::{GeckoTerminalApi, MarketDataConfig};
use crate::types::{canonical_address, TokenMetrics};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Source of candidate tokens and their market metrics
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Addresses of recently updated tokens, one finite batch per call
    async fn list_recent_candidates(&self) -> Result<Vec<String>>;

    /// Current metrics for a token. `None` means "skip this token this cycle".
    async fn token_metrics(&self, address: &str) -> Option<TokenMetrics>;
}

/// GeckoTerminal-backed market data client
pub struct Scanner {
    client: Client,
    config: MarketDataConfig,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct GeckoToken {
    #[serde(default)]
    attributes: Option<GeckoAttributes>,
}

/// Token attributes; numeric fields arrive as strings, numbers or null
#[derive(Debug, Default, Deserialize)]
struct GeckoAttributes {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    decimals: Option<u8>,
    #[serde(default)]
    price_usd: Option<Value>,
    #[serde(default)]
    total_reserve_in_usd: Option<Value>,
    #[serde(default)]
    volume_usd: Option<GeckoVolume>,
}

#[derive(Debug, Default, Deserialize)]
struct GeckoVolume {
    #[serde(default)]
    h24: Option<Value>,
}

impl Scanner {
    pub fn new(config: MarketDataConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .context("Failed to reach GeckoTerminal")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse GeckoTerminal response")
    }
}

#[async_trait]
impl MarketData for Scanner {
    async fn list_recent_candidates(&self) -> Result<Vec<String>> {
        let url = GeckoTerminalApi::recently_updated_url(&self.config.base_url, &self.config.network);
        let envelope: Envelope<Vec<GeckoToken>> = self.get_json(&url).await?;
        let addresses = parse_candidates(envelope);

        info!("Fetched {} recently updated tokens", addresses.len());
        Ok(addresses)
    }

    async fn token_metrics(&self, address: &str) -> Option<TokenMetrics> {
        let url = GeckoTerminalApi::token_url(&self.config.base_url, &self.config.network, address);

        match self.get_json::<Envelope<GeckoToken>>(&url).await {
            Ok(envelope) => {
                let metrics = parse_metrics(address, envelope);
                if metrics.is_none() {
                    debug!("No attributes for {}", address);
                }
                metrics
            }
            Err(e) => {
                warn!("Metrics unavailable for {}: {:#}", address, e);
                None
            }
        }
    }
}

fn parse_candidates(envelope: Envelope<Vec<GeckoToken>>) -> Vec<String> {
    envelope
        .data
        .unwrap_or_default()
        .into_iter()
        .filter_map(|t| t.attributes.and_then(|a| a.address))
        .filter(|a| !a.is_empty())
        .collect()
}

fn parse_metrics(requested: &str, envelope: Envelope<GeckoToken>) -> Option<TokenMetrics> {
    let attrs = envelope.data?.attributes?;

    let volume_24h = attrs.volume_usd.and_then(|v| v.h24);

    Some(TokenMetrics {
        address: canonical_address(attrs.address.as_deref().unwrap_or(requested)),
        symbol: attrs.symbol.unwrap_or_default(),
        decimals: attrs.decimals.unwrap_or(18),
        price_usd: parse_usd(usd_text(attrs.price_usd).as_deref()),
        total_reserve_usd: parse_usd(usd_text(attrs.total_reserve_in_usd).as_deref()),
        volume_24h_usd: parse_usd(usd_text(volume_24h).as_deref()),
    })
}

/// Text form of a string or numeric JSON field; anything else is absent
fn usd_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a USD amount; absent or unparseable values (including NaN/inf) become zero
fn parse_usd(value: Option<&str>) -> Decimal {
    let Some(s) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Decimal::ZERO;
    };

    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .unwrap_or(Decimal::ZERO)
}
