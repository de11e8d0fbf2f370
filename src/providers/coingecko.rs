use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error, instrument};

use crate::core::price::{PriceProvider, Quote};

const VS_CURRENCY: &str = "usd";

/// Prices from the CoinGecko `simple/price` endpoint, quoted in USD.
pub struct CoinGeckoProvider {
    base_url: String,
    client: reqwest::Client,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("coinfolio/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Deserialize, Debug)]
struct SimplePrice {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    #[instrument(name = "CoinGeckoPriceFetch", skip(self, asset_ids), fields(assets = asset_ids.len()))]
    async fn fetch_quotes(&self, asset_ids: &[String]) -> Result<HashMap<String, Quote>> {
        if asset_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!(
            "{}/api/v3/simple/price?ids={}&vs_currencies={VS_CURRENCY}&include_24hr_change=true",
            self.base_url,
            asset_ids.join(",")
        );
        debug!("Requesting prices from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Price service responded with {status}"));
        }

        let response_text = response
            .text()
            .await
            .context("Failed to get response text")?;

        let data: HashMap<String, SimplePrice> = match serde_json::from_str(&response_text) {
            Ok(data) => data,
            Err(e) => {
                error!(
                    error = ?e,
                    response = %response_text,
                    "Failed to parse price response"
                );
                return Err(e).context("Failed to parse price response");
            }
        };

        let quotes: HashMap<String, Quote> = data
            .into_iter()
            .filter(|(id, _)| asset_ids.contains(id))
            .filter_map(|(id, price)| {
                let unit_price = price.usd.filter(|p| p.is_finite() && *p >= 0.0)?;
                Some((
                    id,
                    Quote {
                        unit_price,
                        change_24h: price.usd_24h_change,
                    },
                ))
            })
            .collect();
        debug!(received = quotes.len(), "Parsed price response");

        Ok(quotes)
    }
}
