use std::fmt;

use sha2::{Digest, Sha256};

use crate::validator::EmailAddress;

const KEY_PREFIX: &str = "mailverify";

/// Which half of the cache a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Address,
    Domain,
}

impl Namespace {
    fn tag(self) -> &'static str {
        match self {
            Self::Address => "addr",
            Self::Domain => "domain",
        }
    }
}

/// Fixed-length, ASCII-safe cache key: `mailverify_<ns>_<sha256 hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: Namespace,
    key: String,
}

impl CacheKey {
    pub fn address(address: &EmailAddress) -> Self {
        Self::derive(Namespace::Address, address.as_str())
    }

    pub fn domain(domain: &str) -> Self {
        Self::derive(Namespace::Domain, &domain.trim().to_lowercase())
    }

    fn derive(namespace: Namespace, value: &str) -> Self {
        let digest = Sha256::digest(value.as_bytes());
        Self {
            namespace,
            key: format!("{KEY_PREFIX}_{}_{digest:x}", namespace.tag()),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
