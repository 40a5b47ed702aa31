//! Domain primitives: TimeMs, UserId, WalletId, Symbol, PoolAddress.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Capture the current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }
}

/// User identifier (UUID string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: String) -> Self {
        UserId(id)
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        UserId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wallet identifier (UUID string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WalletId(pub String);

impl WalletId {
    pub fn new(id: String) -> Self {
        WalletId(id)
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        WalletId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Asset symbol (e.g., "TSLA", "ETH").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(symbol: String) -> Self {
        Symbol(symbol)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Blockchain address of a liquidity pool.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolAddress(pub String);

impl PoolAddress {
    pub fn new(address: String) -> Self {
        PoolAddress(address)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PoolAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timems_ordering() {
        assert!(TimeMs::new(1000) < TimeMs::new(2000));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(UserId::generate(), UserId::generate());
        assert_ne!(WalletId::generate(), WalletId::generate());
    }

    #[test]
    fn test_symbol_display() {
        let symbol = Symbol::new("TSLA".to_string());
        assert_eq!(symbol.to_string(), "TSLA");
    }

    #[test]
    fn test_pool_address_display() {
        let addr = PoolAddress::new("0xpool".to_string());
        assert_eq!(addr.to_string(), "0xpool");
    }
}
