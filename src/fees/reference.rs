//! Market reference fee document with a short in-memory cache

use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::{FeeError, PriorityLevel};
use crate::config::FeeConfig;

/// Fee tiers in lamports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    /// medium
    pub m: u64,
    /// high
    pub h: u64,
    /// very high
    pub vh: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketReferenceFee {
    #[serde(default)]
    pub claim: u64,
    #[serde(default)]
    pub jup: Fee,
    #[serde(default)]
    pub jup2: Fee,
    #[serde(default, rename = "loAndDCA")]
    pub lo_and_dca: u64,
    #[serde(default)]
    pub referral: u64,
    #[serde(default)]
    pub perps: Fee,
    #[serde(default)]
    pub swap_fee: u64,
    #[serde(default)]
    pub last_updated_at: u64,
}

impl MarketReferenceFee {
    /// Swap fee for the tier; the flat `swapFee` when any tier is missing
    pub fn fee_for(&self, level: PriorityLevel) -> u64 {
        if self.jup.m == 0 || self.jup.h == 0 || self.jup.vh == 0 {
            return self.swap_fee;
        }
        match level {
            PriorityLevel::Medium => self.jup.m,
            PriorityLevel::High => self.jup.h,
            PriorityLevel::VeryHigh => self.jup.vh,
        }
    }
}

#[derive(Debug)]
struct CachedFees {
    fetched_at: Instant,
    data: MarketReferenceFee,
}

#[derive(Debug)]
pub struct ReferenceFeeProvider {
    http: Client,
    url: String,
    ttl: Duration,
    cache: Mutex<Option<CachedFees>>,
}

impl ReferenceFeeProvider {
    pub fn new(config: &FeeConfig) -> Result<Self, FeeError> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            url: config.reference_fee_url.clone(),
            ttl: Duration::from_secs(config.cache_ttl_secs),
            cache: Mutex::new(None),
        })
    }

    fn cached(&self) -> Option<MarketReferenceFee> {
        let cache = self.cache.lock();
        cache
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.data.clone())
    }

    /// Cached document if younger than the TTL, otherwise a fresh fetch
    pub async fn fetch(&self) -> Result<MarketReferenceFee, FeeError> {
        if let Some(data) = self.cached() {
            return Ok(data);
        }

        let data: MarketReferenceFee = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(
            url = %self.url,
            last_updated_at = data.last_updated_at,
            "Fetched market reference fees"
        );

        *self.cache.lock() = Some(CachedFees {
            fetched_at: Instant::now(),
            data: data.clone(),
        });
        Ok(data)
    }

    pub async fn fee_for(&self, level: PriorityLevel) -> Result<u64, FeeError> {
        match self.fetch().await?.fee_for(level) {
            0 => Err(FeeError::NoFee(level)),
            fee => Ok(fee),
        }
    }

    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "claim": 5000,
        "jup": {"m": 10000, "h": 50000, "vh": 200000},
        "jup2": {"m": 1, "h": 2, "vh": 3},
        "loAndDCA": 3000,
        "referral": 1000,
        "perps": {"m": 4, "h": 5, "vh": 6},
        "swapFee": 7000,
        "lastUpdatedAt": 1718000000000
    }"#;

    fn provider_for(url: String) -> ReferenceFeeProvider {
        let config = FeeConfig {
            reference_fee_url: url,
            ..FeeConfig::default()
        };
        ReferenceFeeProvider::new(&config).unwrap()
    }

    #[test]
    fn test_fee_for_tiers() {
        let fees: MarketReferenceFee = serde_json::from_str(DOCUMENT).unwrap();
        assert_eq!(fees.lo_and_dca, 3000);
        assert_eq!(fees.fee_for(PriorityLevel::Medium), 10_000);
        assert_eq!(fees.fee_for(PriorityLevel::High), 50_000);
        assert_eq!(fees.fee_for(PriorityLevel::VeryHigh), 200_000);
    }

    #[test]
    fn test_missing_tier_falls_back_to_swap_fee() {
        let fees = MarketReferenceFee {
            jup: Fee { m: 10, h: 0, vh: 30 },
            swap_fee: 7000,
            ..MarketReferenceFee::default()
        };
        assert_eq!(fees.fee_for(PriorityLevel::Medium), 7000);
        assert_eq!(fees.fee_for(PriorityLevel::VeryHigh), 7000);
    }

    #[tokio::test]
    async fn test_fetch_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/reference-fees")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(DOCUMENT)
            .expect(1)
            .create_async()
            .await;

        let provider = provider_for(format!("{}/reference-fees", server.url()));
        assert_eq!(provider.fee_for(PriorityLevel::High).await.unwrap(), 50_000);
        assert_eq!(provider.fetch().await.unwrap().swap_fee, 7000);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalidate_refetches() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/reference-fees")
            .with_status(200)
            .with_body(DOCUMENT)
            .expect(2)
            .create_async()
            .await;

        let provider = provider_for(format!("{}/reference-fees", server.url()));
        provider.fetch().await.unwrap();
        provider.invalidate();
        provider.fetch().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/reference-fees")
            .with_status(503)
            .create_async()
            .await;

        let provider = provider_for(format!("{}/reference-fees", server.url()));
        assert!(matches!(provider.fetch().await, Err(FeeError::Http(_))));
    }
}
