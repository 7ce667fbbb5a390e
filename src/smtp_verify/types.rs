use std::fmt;

use serde::Serialize;

use crate::mx::MxRecord;

/// A raw SMTP reply, preserving the numeric status code and text lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn new(code: u16, message: &str) -> Self {
        Self {
            code,
            lines: message.lines().map(str::to_string).collect(),
        }
    }

    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }

    pub fn text(&self) -> String {
        self.lines.join(" ")
    }
}

impl fmt::Display for SmtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text())
    }
}

/// Envelope sender used for `MAIL FROM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender<'a> {
    /// An explicitly configured address.
    Address(&'a str),
    /// Let the prober synthesise one (`postmaster@<helo>`).
    ProberDefault,
    /// The null reverse-path, `MAIL FROM:<>`.
    NullPath,
}

/// Everything the prober needs for one mailbox.
#[derive(Debug, Clone, Copy)]
pub struct ProbeRequest<'a> {
    pub domain: &'a str,
    pub mx_hosts: &'a [MxRecord],
    pub local: &'a str,
    pub sender: Sender<'a>,
}

impl ProbeRequest<'_> {
    pub fn recipient(&self) -> String {
        format!("{}@{}", self.local, self.domain)
    }
}

/// Signals gathered by an SMTP probe. When `can_connect` is false the other
/// flags carry no information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SmtpDetails {
    pub can_connect: bool,
    pub is_deliverable: bool,
    pub is_disabled: bool,
    pub has_full_inbox: bool,
    pub is_catch_all: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mx_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<SmtpReply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transcript: Vec<String>,
}

impl SmtpDetails {
    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// `deliverable && !disabled && !full`.
    pub fn is_valid(&self) -> bool {
        self.is_deliverable && !self.is_disabled && !self.has_full_inbox
    }

    /// Short human description of why the mailbox was refused.
    pub fn failure_summary(&self) -> String {
        if !self.can_connect {
            return self
                .error
                .clone()
                .unwrap_or_else(|| "SMTP connect failed".to_string());
        }
        if self.has_full_inbox {
            return "mailbox full".to_string();
        }
        if self.is_disabled {
            return "mailbox disabled".to_string();
        }
        match (&self.reply, &self.error) {
            (Some(reply), _) => format!("mailbox not deliverable ({reply})"),
            (None, Some(error)) => error.clone(),
            (None, None) => "mailbox not deliverable".to_string(),
        }
    }
}

/// Classification of a `RCPT TO` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcptVerdict {
    Deliverable,
    FullInbox,
    Disabled,
    Undeliverable,
    Inconclusive,
}

/// Phrases that identify a full mailbox when no enhanced status code says so.
const FULL_INBOX_PHRASES: &[&str] = &[
    "mailbox full",
    "mailbox is full",
    "inbox is full",
    "over quota",
    "quota exceeded",
    "exceeded storage",
    "insufficient storage",
    "out of storage",
];

const DISABLED_PHRASES: &[&str] = &[
    "disabled",
    "discontinued",
    "inactive",
    "not active",
    "suspended",
    "deactivated",
];

/// RFC 3463 `class.subject.detail` code leading the reply text, if any.
fn enhanced_status(text: &str) -> Option<(u8, u16, u16)> {
    let token = text.split_whitespace().next()?;
    let mut parts = token.split('.');
    let class = parts.next()?.parse().ok()?;
    let subject = parts.next()?.parse().ok()?;
    let detail = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !matches!(class, 2 | 4 | 5) {
        return None;
    }
    Some((class, subject, detail))
}

/// Whole-word, case-insensitive phrase match.
fn mentions(text: &str, phrase: &str) -> bool {
    text.match_indices(phrase).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + phrase.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

impl RcptVerdict {
    pub fn classify(reply: &SmtpReply) -> Self {
        if reply.is_positive_completion() {
            return Self::Deliverable;
        }
        let text = reply.text().to_ascii_lowercase();
        match enhanced_status(&text) {
            Some((_, 2, 2)) => return Self::FullInbox,
            Some((5, 2, 1)) => return Self::Disabled,
            Some(_) => {}
            // 552: requested mail action aborted, exceeded storage allocation
            None if reply.code == 552 => return Self::FullInbox,
            None => {}
        }
        if FULL_INBOX_PHRASES.iter().any(|p| mentions(&text, p)) {
            return Self::FullInbox;
        }
        if reply.is_permanent_failure() {
            if DISABLED_PHRASES.iter().any(|p| mentions(&text, p)) {
                return Self::Disabled;
            }
            return Self::Undeliverable;
        }
        Self::Inconclusive
    }
}
