use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain IDNA conversion failed")]
    IdnaConversion {
        #[source]
        source: idna::Errors,
    },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("MX lookup for {domain} timed out")]
    Timeout { domain: String },
    #[error("MX lookup for {domain} failed: {message}")]
    Lookup { domain: String, message: String },
}

impl MxError {
    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::IdnaConversion { source }
    }

    #[cfg_attr(not(feature = "with-mx"), allow(dead_code))]
    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }

    pub fn lookup(domain: &str, err: impl Display) -> Self {
        Self::Lookup {
            domain: domain.to_string(),
            message: err.to_string(),
        }
    }

    pub fn timeout(domain: &str) -> Self {
        Self::Timeout {
            domain: domain.to_string(),
        }
    }
}
