//! Runtime configuration.
//!
//! The pipeline reads its three switches through [`ConfigProvider`] on every
//! call, so a host application can change them without rebuilding anything.
//! [`VerifierConfig`] is the TOML-backed provider used by the CLI.

mod file;

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::RwLock;
use thiserror::Error;

pub use file::VerifierConfig;

pub const LEVEL_KEY: &str = "mailverify.level";
pub const VERIFY_EMAIL_KEY: &str = "mailverify.verify_email";
pub const DEFAULT_SENDER_KEY: &str = "mailverify.default_sender_when_unset";

/// String-valued settings lookup. Unknown keys read as the empty string.
pub trait ConfigProvider: Send + Sync {
    fn get_string(&self, key: &str) -> String;
}

impl<T: ConfigProvider + ?Sized> ConfigProvider for std::sync::Arc<T> {
    fn get_string(&self, key: &str) -> String {
        (**self).get_string(key)
    }
}

/// How far the pipeline goes after syntax and MX checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    #[default]
    SyntaxDns,
    Smtp,
}

impl VerificationLevel {
    /// `"smtp"` selects the SMTP tier; anything else means syntax and DNS only.
    pub fn from_config_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("smtp") {
            Self::Smtp
        } else {
            Self::SyntaxDns
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SyntaxDns => "syntax_dns",
            Self::Smtp => "smtp",
        }
    }
}

/// Parses a boolean-ish setting; blank or unrecognised values give `default`.
pub fn parse_flag(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// In-memory provider, mostly for embedding and tests.
#[derive(Debug, Default)]
pub struct StaticConfig {
    values: RwLock<HashMap<String, String>>,
}

impl StaticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Replaces a value; the next pipeline call sees it.
    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.values.write().insert(key.to_string(), value.into());
    }
}

impl ConfigProvider for StaticConfig {
    fn get_string(&self, key: &str) -> String {
        self.values.read().get(key).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing() {
        assert_eq!(VerificationLevel::from_config_value("smtp"), VerificationLevel::Smtp);
        assert_eq!(VerificationLevel::from_config_value(" SMTP "), VerificationLevel::Smtp);
        assert_eq!(VerificationLevel::from_config_value(""), VerificationLevel::SyntaxDns);
        assert_eq!(VerificationLevel::from_config_value("dns"), VerificationLevel::SyntaxDns);
    }

    #[test]
    fn flag_parsing() {
        assert!(parse_flag("", true));
        assert!(!parse_flag("", false));
        assert!(!parse_flag("false", true));
        assert!(parse_flag("On", false));
        assert!(parse_flag("maybe", true));
    }

    #[test]
    fn static_config_reads_latest_value() {
        let config = StaticConfig::new().with(LEVEL_KEY, "smtp");
        assert_eq!(config.get_string(LEVEL_KEY), "smtp");
        assert_eq!(config.get_string(VERIFY_EMAIL_KEY), "");
        config.set(LEVEL_KEY, "dns");
        assert_eq!(config.get_string(LEVEL_KEY), "dns");
    }
}
