#![forbid(unsafe_code)]
//! mailverify_lib: email deliverability verification (syntax, MX, SMTP probe)
//! with a two-tier verdict cache.

pub mod cache;
pub mod config;
pub mod mx;
pub mod pipeline;
pub mod smtp_verify;
pub mod validator;

pub use cache::{
    CacheStore, FileStore, MemoryStore, VerificationCache, VerificationResult, INVALID_TTL,
    VALID_TTL,
};
pub use config::{ConfigProvider, StaticConfig, VerificationLevel, VerifierConfig};
pub use mx::{Error as MxError, MxLookup, MxRecord, MxStatus};
#[cfg(feature = "with-mx")]
pub use mx::{SystemResolver, check_mx};
pub use pipeline::{Outcome, Pipeline, TracingLogger, Verification, VerificationLogger};
pub use smtp_verify::{ProbeRequest, Sender, SmtpDetails, SmtpProber};
#[cfg(feature = "with-smtp-verify")]
pub use smtp_verify::SmtpVerifier;
pub use validator::{EmailAddress, SyntaxChecker, SyntaxReport, ValidationMode, validate_email};
