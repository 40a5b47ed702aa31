//! Mock price source for testing without network calls.

use super::{PriceError, PriceSource};
use crate::domain::{Decimal, FeedKind};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Mock price source returning predefined quotes keyed by feed id.
#[derive(Debug, Clone, Default)]
pub struct MockPriceSource {
    prices: HashMap<String, Decimal>,
    failures: HashSet<String>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `feed_id` with a fixed price.
    pub fn with_price(mut self, feed_id: &str, price: Decimal) -> Self {
        self.prices.insert(feed_id.to_string(), price);
        self
    }

    /// Make `feed_id` fail with a network error.
    pub fn with_failure(mut self, feed_id: &str) -> Self {
        self.failures.insert(feed_id.to_string());
        self
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch_price(&self, _kind: FeedKind, feed_id: &str) -> Result<Decimal, PriceError> {
        if self.failures.contains(feed_id) {
            return Err(PriceError::Network(format!(
                "simulated failure for feed {}",
                feed_id
            )));
        }

        self.prices
            .get(feed_id)
            .copied()
            .ok_or_else(|| PriceError::Http {
                status: 404,
                message: format!("no quote for feed {}", feed_id),
            })
    }
}
