use std::net::IpAddr;

use trust_dns_resolver::Resolver;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};

use super::{DnsOptions, MxError, MxLookup, MxRecord, MxStatus, resolve_with};

/// Lookup MX records for `domain` using the system resolver and default bounds.
pub fn check_mx(domain: &str) -> Result<MxStatus, MxError> {
    let resolver = SystemResolver::new(&DnsOptions::default())?;
    resolve_with(&resolver, domain)
}

/// [`MxLookup`] backed by the blocking trust-dns resolver.
pub struct SystemResolver {
    inner: Resolver,
}

impl SystemResolver {
    /// Reads the system resolver configuration (falling back to the library
    /// defaults when it is unreadable) and applies `options` on top.
    pub fn new(options: &DnsOptions) -> Result<Self, MxError> {
        let (config, mut opts) = trust_dns_resolver::system_conf::read_system_conf()
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "system resolver config unreadable, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            });
        opts.timeout = options.timeout;
        opts.attempts = options.attempts.max(1);
        let inner = Resolver::new(config, opts).map_err(MxError::resolver_init)?;
        Ok(Self { inner })
    }

    /// A and AAAA addresses of `host`, bounded by the same timeout and
    /// attempts as MX queries. A name without addresses gives an empty list.
    pub fn lookup_ips(&self, host: &str) -> Result<Vec<IpAddr>, MxError> {
        match self.inner.lookup_ip(host) {
            Ok(lookup) => Ok(lookup.iter().collect()),
            Err(err) => map_resolve_error(host, err).map(|_| Vec::new()),
        }
    }
}

impl MxLookup for SystemResolver {
    fn lookup_mx(&self, ascii_domain: &str) -> Result<Vec<MxRecord>, MxError> {
        let lookup = match self.inner.mx_lookup(ascii_domain) {
            Ok(lookup) => lookup,
            Err(err) => return map_resolve_error(ascii_domain, err),
        };
        Ok(lookup
            .iter()
            .map(|mx| MxRecord::new(mx.preference(), mx.exchange().to_utf8()))
            .collect())
    }
}

fn map_resolve_error(domain: &str, err: ResolveError) -> Result<Vec<MxRecord>, MxError> {
    match err.kind() {
        // NXDOMAIN and NODATA both land here
        ResolveErrorKind::NoRecordsFound { .. } => Ok(Vec::new()),
        ResolveErrorKind::Timeout => Err(MxError::timeout(domain)),
        _ => Err(MxError::lookup(domain, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_timeout_error() {
        let err = ResolveError::from(ResolveErrorKind::Timeout);
        let mapped = map_resolve_error("example.com", err).expect_err("timeout is an error");
        assert!(matches!(mapped, MxError::Timeout { .. }));
    }

    #[test]
    fn message_maps_to_lookup_error() {
        let err = ResolveError::from("resolver exploded");
        let mapped = map_resolve_error("example.com", err).expect_err("message is an error");
        match mapped {
            MxError::Lookup { domain, message } => {
                assert_eq!(domain, "example.com");
                assert!(message.contains("resolver exploded"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
