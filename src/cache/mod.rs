//! Two-tier verdict cache.
//!
//! Address verdicts and domain verdicts live in separate key namespaces of
//! the same [`CacheStore`]. Positive verdicts are kept for a day, negative
//! ones for an hour so that transient failures heal quickly.

mod error;
mod file;
mod key;
mod store;


use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

pub use error::CacheError;
pub use file::FileStore;
pub use key::{CacheKey, Namespace};
pub use store::{CacheStore, Clock, ManualClock, MemoryStore, SystemClock};

pub const VALID_TTL: Duration = Duration::from_secs(86_400);
pub const INVALID_TTL: Duration = Duration::from_secs(3_600);

/// Tri-state cache answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationResult {
    Unknown,
    Valid,
    Invalid,
}

impl VerificationResult {
    pub fn from_bool(valid: bool) -> Self {
        if valid { Self::Valid } else { Self::Invalid }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Valid => Some(true),
            Self::Invalid => Some(false),
        }
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

pub fn ttl_for(valid: bool) -> Duration {
    if valid { VALID_TTL } else { INVALID_TTL }
}

/// Boolean verdicts on top of a string store.
#[derive(Clone)]
pub struct VerificationCache {
    store: Arc<dyn CacheStore>,
}

impl VerificationCache {
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn from_shared(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Missing, expired, corrupt and unreadable entries all read as
    /// [`VerificationResult::Unknown`].
    pub fn lookup(&self, key: &CacheKey) -> VerificationResult {
        let raw = match self.store.get(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return VerificationResult::Unknown,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "cache read failed");
                return VerificationResult::Unknown;
            }
        };
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Bool(valid)) => VerificationResult::from_bool(valid),
            _ => {
                tracing::warn!(key = %key, payload = %raw, "ignoring non-boolean cache entry");
                VerificationResult::Unknown
            }
        }
    }

    /// Writes `valid` with the matching TTL.
    pub fn store(&self, key: &CacheKey, valid: bool) -> Result<(), CacheError> {
        let payload = serde_json::Value::Bool(valid).to_string();
        self.store.set(key.as_str(), &payload, ttl_for(valid))
    }
}
