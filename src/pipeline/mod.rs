//! The verification pipeline.
//!
//! Stages run cheapest first and stop at the first decisive answer:
//!
//! 1. address cache
//! 2. syntax
//! 3. domain cache (negative verdicts only)
//! 4. MX lookup, negative result cached per domain
//! 5. level gate: without the SMTP tier a routable domain is enough
//! 6. SMTP probe, connectivity cached per domain, verdict per address
//!
//! Every collaborator failure becomes a logged negative verdict, so
//! [`Pipeline::validate_email`] always answers.

mod lock;
mod log;
mod outcome;


use serde_json::Value;
use thiserror::Error;

use crate::cache::{CacheError, CacheKey, VerificationCache, VerificationResult};
use crate::config::{
    ConfigProvider, DEFAULT_SENDER_KEY, LEVEL_KEY, VERIFY_EMAIL_KEY, VerificationLevel, parse_flag,
};
use crate::mx::{MxError, MxLookup, MxRecord, MxStatus, resolve_with};
use crate::smtp_verify::{ProbeRequest, Sender, SmtpDetails, SmtpProber};
use crate::validator::{EmailAddress, SyntaxChecker};

use lock::KeyedLocks;
pub use log::{TracingLogger, VerificationLogger};
pub use outcome::{Outcome, Verification};

/// Failure to assemble a pipeline from a [`VerifierConfig`](crate::config::VerifierConfig).
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Resolver(#[from] MxError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub struct Pipeline {
    config: Box<dyn ConfigProvider>,
    syntax: SyntaxChecker,
    resolver: Box<dyn MxLookup>,
    prober: Box<dyn SmtpProber>,
    cache: VerificationCache,
    logger: Box<dyn VerificationLogger>,
    locks: Option<KeyedLocks>,
}

impl Pipeline {
    /// Pipeline with the default syntax rules, a [`TracingLogger`] and no
    /// per-address coordination.
    pub fn new(
        config: impl ConfigProvider + 'static,
        resolver: impl MxLookup + 'static,
        prober: impl SmtpProber + 'static,
        cache: VerificationCache,
    ) -> Self {
        Self {
            config: Box::new(config),
            syntax: SyntaxChecker::default(),
            resolver: Box::new(resolver),
            prober: Box::new(prober),
            cache,
            logger: Box::new(TracingLogger),
            locks: None,
        }
    }

    pub fn with_syntax_checker(mut self, syntax: SyntaxChecker) -> Self {
        self.syntax = syntax;
        self
    }

    pub fn with_logger(mut self, logger: impl VerificationLogger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    /// Serializes concurrent verifications of the same address so only one
    /// of them reaches the network.
    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.locks = enabled.then(KeyedLocks::default);
        self
    }

    /// Builds the production pipeline: system resolver, TCP prober and a
    /// file cache when `cache_dir` is set (memory otherwise). The prober
    /// resolves MX hosts through the same resolver.
    #[cfg(all(feature = "with-mx", feature = "with-smtp-verify"))]
    pub fn from_config(config: crate::config::VerifierConfig) -> Result<Self, SetupError> {
        use crate::cache::{FileStore, MemoryStore};
        use std::sync::Arc;

        use crate::mx::SystemResolver;
        use crate::smtp_verify::SmtpVerifier;

        let resolver = Arc::new(SystemResolver::new(&config.dns)?);
        let prober = SmtpVerifier::new(config.probe.clone()).with_resolver(Arc::clone(&resolver));
        let cache = match &config.cache_dir {
            Some(dir) => VerificationCache::new(FileStore::new(dir)?),
            None => VerificationCache::new(MemoryStore::new()),
        };
        let syntax = config.syntax_checker();
        let single_flight = config.single_flight;
        Ok(Self::new(config, resolver, prober, cache)
            .with_syntax_checker(syntax)
            .single_flight(single_flight))
    }

    pub fn validate_email(&self, email: &str) -> bool {
        self.verify(email).is_valid()
    }

    pub fn verify(&self, email: &str) -> Verification {
        let address = EmailAddress::new(email);
        let address_key = CacheKey::address(&address);

        let outcome = match self.cached_verdict(&address_key) {
            Some(outcome) => outcome,
            None => match &self.locks {
                Some(locks) => {
                    let _guard = locks.acquire(address_key.as_str());
                    self.cached_verdict(&address_key)
                        .unwrap_or_else(|| self.run_stages(&address, &address_key))
                }
                None => self.run_stages(&address, &address_key),
            },
        };
        tracing::debug!(email = %address, stage = outcome.code(), valid = outcome.is_valid(), "verification finished");
        Verification::new(address, outcome)
    }

    fn cached_verdict(&self, key: &CacheKey) -> Option<Outcome> {
        self.cache
            .lookup(key)
            .as_bool()
            .map(|valid| Outcome::AddressCached { valid })
    }

    fn run_stages(&self, address: &EmailAddress, address_key: &CacheKey) -> Outcome {
        let report = self.syntax.validate(address);
        if !report.ok {
            tracing::debug!(email = %address, reasons = ?report.reasons, "syntax check failed");
            return Outcome::SyntaxError {
                reasons: report.reasons,
            };
        }
        let domain = report.ascii_domain;
        let domain_key = CacheKey::domain(&domain);

        if self.cache.lookup(&domain_key) == VerificationResult::Invalid {
            tracing::debug!(%domain, "domain cached as invalid");
            return Outcome::DomainCachedInvalid { domain };
        }

        let mx_hosts = match self.resolve_mx(&domain) {
            Ok(records) => records,
            Err(reason) => {
                self.remember(&domain_key, false);
                self.logger.error(&reason, None);
                return Outcome::DomainUnroutable { domain, reason };
            }
        };

        let level = VerificationLevel::from_config_value(&self.config.get_string(LEVEL_KEY));
        if level != VerificationLevel::Smtp {
            return Outcome::ConfiguredSkip { domain, mx_hosts };
        }

        let configured_sender = self.config.get_string(VERIFY_EMAIL_KEY);
        let sender = self.sender(configured_sender.trim());
        let details = self.prober.probe(&ProbeRequest {
            domain: &domain,
            mx_hosts: &mx_hosts,
            local: &report.local,
            sender,
        });

        self.remember(&domain_key, details.can_connect);
        if !details.can_connect {
            let message = details
                .error
                .clone()
                .unwrap_or_else(|| format!("Cannot connect to mail servers of {domain}"));
            self.logger.error(&message, None);
            return Outcome::ConnectFailure { domain, details };
        }

        let valid = details.is_valid();
        self.remember(address_key, valid);
        if valid {
            Outcome::Deliverable { details }
        } else {
            let context = failure_context(address, &details);
            self.logger.error(
                &format!("Email address \"{address}\" test failed"),
                context.as_ref(),
            );
            Outcome::DeliverabilityNegative { details }
        }
    }

    /// MX hosts for `domain`, or the reason it is unroutable. Resolver
    /// errors count as "no records".
    fn resolve_mx(&self, domain: &str) -> Result<Vec<MxRecord>, String> {
        match resolve_with(self.resolver.as_ref(), domain) {
            Ok(MxStatus::Records(records)) => Ok(records),
            Ok(MxStatus::NoRecords) => Err(format!("Domain {domain} has no mx records")),
            Err(err) => {
                tracing::warn!(%domain, error = %err, "mx lookup failed");
                Err(format!("Domain {domain} has no mx records ({err})"))
            }
        }
    }

    fn sender<'a>(&self, configured: &'a str) -> Sender<'a> {
        if !configured.is_empty() {
            Sender::Address(configured)
        } else if parse_flag(&self.config.get_string(DEFAULT_SENDER_KEY), true) {
            Sender::ProberDefault
        } else {
            Sender::NullPath
        }
    }

    fn remember(&self, key: &CacheKey, valid: bool) {
        if let Err(err) = self.cache.store(key, valid) {
            tracing::warn!(key = %key, error = %err, "cache write failed");
        }
    }
}

fn failure_context(address: &EmailAddress, details: &SmtpDetails) -> Option<Value> {
    let result = serde_json::to_value(details).ok()?;
    let mut context = serde_json::Map::new();
    context.insert("email".into(), Value::String(address.to_string()));
    context.insert("reason".into(), Value::String(details.failure_summary()));
    context.insert("result".into(), result);
    Some(Value::Object(context))
}
