use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::{
    ConfigError, ConfigProvider, DEFAULT_SENDER_KEY, LEVEL_KEY, VERIFY_EMAIL_KEY,
    VerificationLevel,
};
use crate::mx::DnsOptions;
use crate::smtp_verify::MailboxProbeOptions;
use crate::validator::{SyntaxChecker, ValidationMode};

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    verification: VerificationSection,
    #[serde(default)]
    dns: DnsSection,
    #[serde(default)]
    smtp: SmtpSection,
    #[serde(default)]
    cache: CacheSection,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct VerificationSection {
    level: Option<String>,
    verify_email: Option<String>,
    default_sender_when_unset: Option<bool>,
    mode: Option<ValidationMode>,
    require_known_tld: Option<bool>,
    single_flight: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct DnsSection {
    timeout_ms: Option<u64>,
    attempts: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct SmtpSection {
    port: Option<u16>,
    helo_domain: Option<String>,
    connect_timeout_ms: Option<u64>,
    command_timeout_ms: Option<u64>,
    max_mx: Option<usize>,
    catchall_probes: Option<u8>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct CacheSection {
    dir: Option<PathBuf>,
}

/// Fully resolved settings. Anything missing from the file keeps its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    pub level: VerificationLevel,
    pub verify_email: String,
    pub default_sender_when_unset: bool,
    pub mode: ValidationMode,
    pub require_known_tld: bool,
    pub single_flight: bool,
    pub dns: DnsOptions,
    pub probe: MailboxProbeOptions,
    /// `None` keeps the cache in memory.
    pub cache_dir: Option<PathBuf>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            level: VerificationLevel::SyntaxDns,
            verify_email: String::new(),
            default_sender_when_unset: true,
            mode: ValidationMode::Strict,
            require_known_tld: true,
            single_flight: false,
            dns: DnsOptions::default(),
            probe: MailboxProbeOptions::default(),
            cache_dir: None,
        }
    }
}

impl VerifierConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(raw)?;
        let mut config = Self::default();
        config.apply(file)?;
        Ok(config)
    }

    fn apply(&mut self, file: ConfigFile) -> Result<(), ConfigError> {
        let v = file.verification;
        if let Some(level) = v.level {
            self.level = VerificationLevel::from_config_value(&level);
        }
        if let Some(sender) = v.verify_email {
            self.verify_email = sender.trim().to_string();
        }
        if let Some(flag) = v.default_sender_when_unset {
            self.default_sender_when_unset = flag;
        }
        if let Some(mode) = v.mode {
            self.mode = mode;
        }
        if let Some(flag) = v.require_known_tld {
            self.require_known_tld = flag;
        }
        if let Some(flag) = v.single_flight {
            self.single_flight = flag;
        }

        if let Some(ms) = file.dns.timeout_ms {
            self.dns.timeout = nonzero_ms("dns.timeout_ms", ms)?;
        }
        if let Some(attempts) = file.dns.attempts {
            if attempts == 0 {
                return Err(ConfigError::invalid("dns.attempts", "must be at least 1"));
            }
            self.dns.attempts = attempts;
        }

        let smtp = file.smtp;
        if let Some(port) = smtp.port {
            self.probe.port = port;
        }
        if smtp.helo_domain.is_some() {
            self.probe.helo_domain = smtp.helo_domain;
        }
        if let Some(ms) = smtp.connect_timeout_ms {
            self.probe.connect_timeout = nonzero_ms("smtp.connect_timeout_ms", ms)?;
        }
        if let Some(ms) = smtp.command_timeout_ms {
            self.probe.command_timeout = nonzero_ms("smtp.command_timeout_ms", ms)?;
        }
        if let Some(max_mx) = smtp.max_mx {
            if max_mx == 0 {
                return Err(ConfigError::invalid("smtp.max_mx", "must be at least 1"));
            }
            self.probe.max_mx = max_mx;
        }
        if let Some(probes) = smtp.catchall_probes {
            self.probe.catchall_probes = probes;
        }

        if file.cache.dir.is_some() {
            self.cache_dir = file.cache.dir;
        }
        Ok(())
    }

    pub fn syntax_checker(&self) -> SyntaxChecker {
        SyntaxChecker::new(self.mode).require_known_tld(self.require_known_tld)
    }
}

impl ConfigProvider for VerifierConfig {
    fn get_string(&self, key: &str) -> String {
        match key {
            LEVEL_KEY => self.level.as_str().to_string(),
            VERIFY_EMAIL_KEY => self.verify_email.clone(),
            DEFAULT_SENDER_KEY => self.default_sender_when_unset.to_string(),
            _ => String::new(),
        }
    }
}

fn nonzero_ms(key: &'static str, ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_millis(ms))
}
