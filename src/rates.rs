use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::primitives::Currency;

/// Source of currency conversion rates.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Units of `to` per one unit of `from`.
    async fn rate(&self, from: Currency, to: Currency) -> Result<f64>;
}

/// Rate source backed by an exchange-rate HTTP API.
///
/// Expects a `GET {base_url}/latest?base=X&symbols=Y` endpoint answering
/// `{"base": "X", "rates": {"Y": 1.23}}`.
pub struct HttpRateSource {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RatesEnvelope {
    rates: HashMap<String, f64>,
}

impl HttpRateSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn rate(&self, from: Currency, to: Currency) -> Result<f64> {
        if from == to {
            return Ok(1.0);
        }

        let url = format!("{}/latest", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("base", from.to_string()),
                ("symbols", to.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Rate request failed: {}",
                response.status()
            ));
        }

        let envelope: RatesEnvelope = response.json().await?;
        envelope
            .rates
            .get(&to.to_string())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Rate source returned no {} rate", to))
    }
}

/// Fixed-rate source for handler tests.
#[cfg(test)]
pub struct FixedRates(pub f64);

#[cfg(test)]
#[async_trait]
impl RateSource for FixedRates {
    async fn rate(&self, from: Currency, to: Currency) -> Result<f64> {
        Ok(if from == to { 1.0 } else { self.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_rates_envelope() {
        let raw = r#"{"base": "ETH", "date": "2024-01-01", "rates": {"USD": 2301.52}}"#;
        let envelope: RatesEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.rates.get("USD"), Some(&2301.52));
    }

    #[tokio::test]
    async fn identical_currencies_convert_at_parity() {
        let source = HttpRateSource::new("http://localhost:0".to_string());
        let rate = source.rate(Currency::Usd, Currency::Usd).await.unwrap();
        assert_eq!(rate, 1.0);
    }
}
