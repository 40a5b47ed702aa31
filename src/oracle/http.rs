//! HTTP implementation of the price source over the public quote APIs.

use super::{PriceError, PriceSource};
use crate::domain::{Decimal, FeedKind};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetches quotes from the ChainLink and Pyth HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpPriceSource {
    client: Client,
    chainlink_base_url: String,
    pyth_base_url: String,
}

impl HttpPriceSource {
    pub fn new(
        chainlink_base_url: String,
        pyth_base_url: String,
        timeout_ms: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            chainlink_base_url,
            pyth_base_url,
        }
    }

    fn quote_url(&self, kind: FeedKind, feed_id: &str) -> String {
        let base = match kind {
            FeedKind::ChainLink => &self.chainlink_base_url,
            FeedKind::Pyth => &self.pyth_base_url,
        };
        format!("{}/v1/prices/{}", base, feed_id)
    }
}

/// Field holding the quote in each upstream's response body.
fn price_field(kind: FeedKind) -> &'static str {
    match kind {
        FeedKind::ChainLink => "price",
        FeedKind::Pyth => "current_price",
    }
}

fn extract_price(body: &serde_json::Value, kind: FeedKind) -> Result<Decimal, PriceError> {
    let field = price_field(kind);
    let value = body
        .get(field)
        .ok_or_else(|| PriceError::Parse(format!("Missing {} field", field)))?;

    // Feeds disagree on whether the quote is a JSON number or a string.
    match value {
        serde_json::Value::String(s) => Decimal::from_str_canonical(s)
            .map_err(|e| PriceError::Parse(format!("Invalid {}: {}", field, e))),
        serde_json::Value::Number(n) => Decimal::from_str_canonical(&n.to_string())
            .map_err(|e| PriceError::Parse(format!("Invalid {}: {}", field, e))),
        other => Err(PriceError::Parse(format!(
            "Unexpected {} value: {}",
            field, other
        ))),
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_price(&self, kind: FeedKind, feed_id: &str) -> Result<Decimal, PriceError> {
        let url = self.quote_url(kind, feed_id);
        debug!(feed = %kind, feed_id = feed_id, "Fetching price quote");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PriceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceError::Http {
                status: status.as_u16(),
                message: format!("quote request to {} failed", url),
            });
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| PriceError::Parse(e.to_string()))?;

        extract_price(&body, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_urls_per_feed() {
        let source = HttpPriceSource::new(
            "https://api.chainlink.com".to_string(),
            "https://api.pyth.network".to_string(),
            5000,
        );
        assert_eq!(
            source.quote_url(FeedKind::ChainLink, "cl-tsla"),
            "https://api.chainlink.com/v1/prices/cl-tsla"
        );
        assert_eq!(
            source.quote_url(FeedKind::Pyth, "pyth-tsla"),
            "https://api.pyth.network/v1/prices/pyth-tsla"
        );
    }

    #[test]
    fn test_extract_price_chainlink_number() {
        let body = serde_json::json!({ "price": 250.5 });
        let price = extract_price(&body, FeedKind::ChainLink).unwrap();
        assert_eq!(price.to_canonical_string(), "250.5");
    }

    #[test]
    fn test_extract_price_pyth_string() {
        let body = serde_json::json!({ "current_price": "1999.25" });
        let price = extract_price(&body, FeedKind::Pyth).unwrap();
        assert_eq!(price.to_canonical_string(), "1999.25");
    }

    #[test]
    fn test_extract_price_missing_field() {
        let body = serde_json::json!({ "px": 1 });
        let err = extract_price(&body, FeedKind::ChainLink).unwrap_err();
        assert!(matches!(err, PriceError::Parse(_)));
    }

    #[test]
    fn test_extract_price_wrong_type() {
        let body = serde_json::json!({ "price": [1, 2] });
        let err = extract_price(&body, FeedKind::ChainLink).unwrap_err();
        assert!(matches!(err, PriceError::Parse(_)));
    }
}
