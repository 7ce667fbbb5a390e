//! DNS MX resolution.
//!
//! The pipeline talks to DNS through the [`MxLookup`] trait so tests can stub
//! it. With the `with-mx` feature, [`SystemResolver`] implements it on top of
//! the system resolver configuration, and [`check_mx`] performs a one-shot
//! lookup returning a [`MxStatus`].

mod error;
#[cfg(feature = "with-mx")]
mod resolver;
mod types;

pub use error::MxError as Error;
pub use error::MxError;
#[cfg(feature = "with-mx")]
pub use resolver::{SystemResolver, check_mx};
pub use types::{DnsOptions, MxRecord, MxStatus};

/// Source of raw MX records for an ASCII domain.
///
/// "No records" must be reported as `Ok(vec![])`; errors are reserved for
/// timeouts and resolver failures.
pub trait MxLookup: Send + Sync {
    fn lookup_mx(&self, ascii_domain: &str) -> Result<Vec<MxRecord>, MxError>;
}

impl<T: MxLookup + ?Sized> MxLookup for std::sync::Arc<T> {
    fn lookup_mx(&self, ascii_domain: &str) -> Result<Vec<MxRecord>, MxError> {
        (**self).lookup_mx(ascii_domain)
    }
}

/// Resolves `domain` through `resolver`, returning records sorted by
/// ascending preference with duplicates removed.
pub fn resolve_with<R>(resolver: &R, domain: &str) -> Result<MxStatus, MxError>
where
    R: MxLookup + ?Sized,
{
    let ascii = normalize_domain(domain)?;
    let mut records: Vec<MxRecord> = resolver
        .lookup_mx(&ascii)?
        .into_iter()
        .map(|record| MxRecord::new(record.preference, normalize_exchange(&record.exchange)))
        .filter(|record| !record.exchange.is_empty())
        .collect();

    records.sort();
    records.dedup();

    if records.is_empty() {
        Ok(MxStatus::NoRecords)
    } else {
        Ok(MxStatus::Records(records))
    }
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, MxError> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(MxError::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(MxError::idna)
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    let trimmed = exchange.trim().trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}
