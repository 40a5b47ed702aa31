//! Catalog entities (Asset, Pool) and the transaction target union.

use serde::{Deserialize, Serialize};

use super::{PoolAddress, Symbol, TimeMs};

/// Upstream price quote network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    ChainLink,
    Pyth,
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedKind::ChainLink => write!(f, "chainlink"),
            FeedKind::Pyth => write!(f, "pyth"),
        }
    }
}

/// Price feed ids for an asset. At least one must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFeeds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chainlink: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pyth: Option<String>,
}

impl PriceFeeds {
    pub fn is_empty(&self) -> bool {
        self.chainlink.is_none() && self.pyth.is_none()
    }
}

/// A catalog asset: immutable identity by symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub symbol: Symbol,
    pub name: String,
    pub image: String,
    pub price_feeds: PriceFeeds,
    pub created_at: TimeMs,
}

impl Asset {
    /// Feed references in priority order: ChainLink first, then Pyth.
    ///
    /// The oracle walks this list; adding a feed kind extends the list
    /// rather than the call sites.
    pub fn feed_refs(&self) -> Vec<(FeedKind, &str)> {
        let mut refs = Vec::new();
        if let Some(id) = self.price_feeds.chainlink.as_deref() {
            refs.push((FeedKind::ChainLink, id));
        }
        if let Some(id) = self.price_feeds.pyth.as_deref() {
            refs.push((FeedKind::Pyth, id));
        }
        refs
    }
}

/// A catalog pool: immutable identity by blockchain address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub pool_address: PoolAddress,
    pub name: String,
    pub description: String,
    pub image: String,
    pub created_at: TimeMs,
}

/// What a transaction or position points at: an asset or a pool.
///
/// Resolved once at the API boundary against the catalog, then carried as a
/// typed variant everywhere below it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Target {
    Asset(Symbol),
    Pool(PoolAddress),
}

impl Target {
    /// Discriminant as stored in the database.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Target::Asset(_) => "asset",
            Target::Pool(_) => "pool",
        }
    }

    /// The referenced symbol or pool address.
    pub fn ref_str(&self) -> &str {
        match self {
            Target::Asset(symbol) => symbol.as_str(),
            Target::Pool(address) => address.as_str(),
        }
    }

    /// Rebuild a target from its stored (kind, ref) pair.
    pub fn from_parts(kind: &str, reference: &str) -> Option<Target> {
        match kind {
            "asset" => Some(Target::Asset(Symbol::new(reference.to_string()))),
            "pool" => Some(Target::Pool(PoolAddress::new(reference.to_string()))),
            _ => None,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind_str(), self.ref_str())
    }
}
