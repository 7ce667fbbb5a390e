//! SMTP mailbox probing.
//!
//! The pipeline depends on the [`SmtpProber`] trait only. With the
//! `with-smtp-verify` feature, [`SmtpVerifier`] implements it by running a
//! minimal `EHLO` / `MAIL FROM` / `RCPT TO` dialogue against the MX hosts in
//! preference order, stopping at the first host that greets it.

mod error;
mod options;
#[cfg(feature = "with-smtp-verify")]
mod probe;
#[cfg(feature = "with-smtp-verify")]
mod session;
mod types;
#[cfg(feature = "with-smtp-verify")]
mod util;

pub use error::SmtpVerifyError;
pub use options::MailboxProbeOptions;
#[cfg(feature = "with-smtp-verify")]
pub use probe::SmtpVerifier;
pub use types::{ProbeRequest, RcptVerdict, Sender, SmtpDetails, SmtpReply};

/// Capability probing one mailbox. Implementations never fail: connection
/// problems are reported through [`SmtpDetails::can_connect`] and
/// [`SmtpDetails::error`].
pub trait SmtpProber: Send + Sync {
    fn probe(&self, request: &ProbeRequest<'_>) -> SmtpDetails;
}

impl<T: SmtpProber + ?Sized> SmtpProber for std::sync::Arc<T> {
    fn probe(&self, request: &ProbeRequest<'_>) -> SmtpDetails {
        (**self).probe(request)
    }
}
