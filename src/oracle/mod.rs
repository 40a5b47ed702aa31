//! Price oracle adapter: current USD quotes for catalog assets.
//!
//! An asset declares its feed ids in priority order; the oracle walks that
//! list and returns the first usable quote. There is no caching and no
//! retry beyond the fallback feed -- callers own any retry policy, and the
//! HTTP client carries the configured deadline since these calls cross a
//! network boundary.

pub mod http;
pub mod mock;

pub use http::HttpPriceSource;
pub use mock::MockPriceSource;

use crate::domain::{Asset, Decimal, FeedKind};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// A single upstream quote source, addressed by feed kind and feed id.
#[async_trait]
pub trait PriceSource: Send + Sync + fmt::Debug {
    async fn fetch_price(&self, kind: FeedKind, feed_id: &str) -> Result<Decimal, PriceError>;
}

#[derive(Debug, Clone, Error)]
pub enum PriceError {
    #[error("No price feed configured for asset {0}")]
    NoFeedConfigured(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Resolves the USD price of an asset through its configured feeds.
#[derive(Debug, Clone)]
pub struct Oracle {
    source: Arc<dyn PriceSource>,
}

impl Oracle {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Oracle { source }
    }

    /// Current USD price for an asset.
    ///
    /// Tries each configured feed in order and returns the first positive
    /// quote. Fails with the last feed's error when every feed fails, or
    /// with `NoFeedConfigured` when the asset declares none.
    pub async fn usd_price(&self, asset: &Asset) -> Result<Decimal, PriceError> {
        let feeds = asset.feed_refs();
        if feeds.is_empty() {
            return Err(PriceError::NoFeedConfigured(asset.symbol.to_string()));
        }

        let mut last_error = None;
        for (kind, feed_id) in feeds {
            match self.source.fetch_price(kind, feed_id).await {
                Ok(price) if price.is_positive() => return Ok(price),
                Ok(price) => {
                    warn!(
                        symbol = %asset.symbol,
                        feed = %kind,
                        price = %price,
                        "Feed returned non-positive price, trying next feed"
                    );
                    last_error = Some(PriceError::Parse(format!(
                        "feed {} returned non-positive price {}",
                        kind, price
                    )));
                }
                Err(e) => {
                    warn!(
                        symbol = %asset.symbol,
                        feed = %kind,
                        error = %e,
                        "Feed call failed, trying next feed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PriceError::NoFeedConfigured(asset.symbol.to_string())))
    }
}
