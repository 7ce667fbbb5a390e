use std::borrow::Cow;
use std::time::Duration;

/// Configuration knobs for [`SmtpVerifier`](super::SmtpVerifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxProbeOptions {
    pub port: u16,
    pub helo_domain: Option<String>,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub max_mx: usize,
    pub catchall_probes: u8,
}

impl Default for MailboxProbeOptions {
    fn default() -> Self {
        Self {
            port: 25,
            helo_domain: None,
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
            max_mx: 3,
            catchall_probes: 1,
        }
    }
}

impl MailboxProbeOptions {
    /// Returns the hostname used in the `EHLO` command. Defaults to the ASCII domain
    /// of the target mailbox when none is provided.
    pub fn helo_name<'a>(&'a self, ascii_domain: &'a str) -> Cow<'a, str> {
        self.helo_domain
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(Cow::Borrowed)
            .unwrap_or(Cow::Borrowed(ascii_domain))
    }

    /// Placeholder envelope sender used when the caller asks for the prober default.
    pub fn default_sender(&self, ascii_domain: &str) -> String {
        format!("postmaster@{}", self.helo_name(ascii_domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helo_falls_back_to_target_domain() {
        let options = MailboxProbeOptions::default();
        assert_eq!(options.helo_name("example.com"), "example.com");
        assert_eq!(options.default_sender("example.com"), "postmaster@example.com");
    }

    #[test]
    fn blank_helo_is_ignored() {
        let options = MailboxProbeOptions {
            helo_domain: Some("  ".to_string()),
            ..MailboxProbeOptions::default()
        };
        assert_eq!(options.helo_name("example.com"), "example.com");
    }

    #[test]
    fn configured_helo_wins() {
        let options = MailboxProbeOptions {
            helo_domain: Some("probe.example.net".to_string()),
            ..MailboxProbeOptions::default()
        };
        assert_eq!(options.default_sender("example.com"), "postmaster@probe.example.net");
    }
}
