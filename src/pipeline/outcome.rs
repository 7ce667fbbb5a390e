use std::fmt;

use serde::Serialize;

use crate::cache::VerificationResult;
use crate::mx::MxRecord;
use crate::smtp_verify::SmtpDetails;
use crate::validator::EmailAddress;

/// The pipeline exit that produced a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Outcome {
    /// A previous verdict for this address was still cached.
    AddressCached { valid: bool },
    /// Malformed address. Never cached.
    SyntaxError { reasons: Vec<String> },
    /// The domain was recently found unroutable or unreachable.
    DomainCachedInvalid { domain: String },
    /// No usable MX records; cached against the domain.
    DomainUnroutable { domain: String, reason: String },
    /// Syntax and MX passed and the SMTP tier is switched off.
    ConfiguredSkip { domain: String, mx_hosts: Vec<MxRecord> },
    /// No MX host answered; cached against the domain.
    ConnectFailure { domain: String, details: SmtpDetails },
    /// The mailbox was refused, disabled or full; cached against the address.
    DeliverabilityNegative { details: SmtpDetails },
    Deliverable { details: SmtpDetails },
}

impl Outcome {
    pub fn is_valid(&self) -> bool {
        match self {
            Self::AddressCached { valid } => *valid,
            Self::ConfiguredSkip { .. } | Self::Deliverable { .. } => true,
            Self::SyntaxError { .. }
            | Self::DomainCachedInvalid { .. }
            | Self::DomainUnroutable { .. }
            | Self::ConnectFailure { .. }
            | Self::DeliverabilityNegative { .. } => false,
        }
    }

    pub fn result(&self) -> VerificationResult {
        VerificationResult::from_bool(self.is_valid())
    }

    /// Short machine-friendly stage name.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AddressCached { .. } => "address_cached",
            Self::SyntaxError { .. } => "syntax_error",
            Self::DomainCachedInvalid { .. } => "domain_cached_invalid",
            Self::DomainUnroutable { .. } => "domain_unroutable",
            Self::ConfiguredSkip { .. } => "configured_skip",
            Self::ConnectFailure { .. } => "connect_failure",
            Self::DeliverabilityNegative { .. } => "deliverability_negative",
            Self::Deliverable { .. } => "deliverable",
        }
    }

    pub fn smtp_details(&self) -> Option<&SmtpDetails> {
        match self {
            Self::ConnectFailure { details, .. }
            | Self::DeliverabilityNegative { details }
            | Self::Deliverable { details } => Some(details),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressCached { valid: true } => f.write_str("cached verdict: valid"),
            Self::AddressCached { valid: false } => f.write_str("cached verdict: invalid"),
            Self::SyntaxError { reasons } if reasons.is_empty() => f.write_str("syntax error"),
            Self::SyntaxError { reasons } => write!(f, "syntax error: {}", reasons.join("; ")),
            Self::DomainCachedInvalid { domain } => {
                write!(f, "domain {domain} is cached as invalid")
            }
            Self::DomainUnroutable { reason, .. } => f.write_str(reason),
            Self::ConfiguredSkip { domain, mx_hosts } => write!(
                f,
                "{} mx record(s) for {domain}, mailbox not probed",
                mx_hosts.len()
            ),
            Self::ConnectFailure { domain, details } => write!(
                f,
                "cannot connect to mail servers of {domain}: {}",
                details.failure_summary()
            ),
            Self::DeliverabilityNegative { details } => {
                write!(f, "mailbox rejected: {}", details.failure_summary())
            }
            Self::Deliverable { details } => match &details.mx_host {
                Some(host) => write!(f, "mailbox accepted by {host}"),
                None => f.write_str("mailbox accepted"),
            },
        }
    }
}

/// Verdict for one address plus the stage that decided it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub address: EmailAddress,
    pub valid: bool,
    pub outcome: Outcome,
}

impl Verification {
    pub(crate) fn new(address: EmailAddress, outcome: Outcome) -> Self {
        Self {
            valid: outcome.is_valid(),
            address,
            outcome,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn result(&self) -> VerificationResult {
        self.outcome.result()
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.valid { "valid" } else { "invalid" };
        write!(f, "{}: {verdict} ({})", self.address, self.outcome)
    }
}
