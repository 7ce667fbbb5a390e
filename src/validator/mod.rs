mod domain;
mod local;
mod tld;
mod types;

pub use types::{EmailAddress, SyntaxReport, ValidationMode};

use domain::check_domain;
use local::{is_local_relaxed, is_local_strict};

/// Address-grammar checker used as the first stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxChecker {
    pub mode: ValidationMode,
    pub require_known_tld: bool,
}

impl Default for SyntaxChecker {
    fn default() -> Self {
        Self {
            mode: ValidationMode::Strict,
            require_known_tld: true,
        }
    }
}

impl SyntaxChecker {
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn require_known_tld(mut self, required: bool) -> Self {
        self.require_known_tld = required;
        self
    }

    pub fn validate(&self, address: &EmailAddress) -> SyntaxReport {
        check_address(address.as_str(), self.mode, self.require_known_tld)
    }
}

/// Validates `email` with the default TLD policy. The input is trimmed and
/// lower-cased first, as the pipeline does.
pub fn validate_email(email: &str, mode: ValidationMode) -> SyntaxReport {
    SyntaxChecker::new(mode).validate(&EmailAddress::new(email))
}

fn check_address(input: &str, mode: ValidationMode, require_known_tld: bool) -> SyntaxReport {
    let mut reasons = Vec::new();

    if input.len() > 254 {
        reasons.push(format!("total length {} > 254", input.len()));
    }

    let split = match mode {
        // quoted local parts may carry their own '@'
        ValidationMode::Relaxed if input.starts_with('"') => input.rsplit_once('@'),
        _ if input.matches('@').count() == 1 => input.split_once('@'),
        _ => None,
    };
    let Some((local, domain)) = split else {
        reasons.push("must contain exactly one '@'".to_string());
        return SyntaxReport::rejected(reasons);
    };

    if local.is_empty() || local.len() > 64 {
        reasons.push(format!(
            "local part length {} invalid (1..=64)",
            local.len()
        ));
    }

    let ascii_domain = check_domain(domain, require_known_tld, &mut reasons);

    let local_ok = match mode {
        ValidationMode::Strict => is_local_strict(local),
        ValidationMode::Relaxed => is_local_relaxed(local),
    };
    if !local_ok {
        reasons.push(match mode {
            ValidationMode::Strict => "invalid local part (strict rules)".into(),
            ValidationMode::Relaxed => "invalid local part (relaxed rules)".into(),
        });
    }

    let ok = reasons.is_empty() && !ascii_domain.is_empty();
    SyntaxReport {
        ok,
        local: local.to_string(),
        domain: domain.to_string(),
        ascii_domain,
        reasons,
    }
}
