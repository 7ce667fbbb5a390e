use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    Strict,
    Relaxed,
}

/// A trimmed, lower-cased email address as handed to the pipeline.
///
/// The string is not validated on construction; [`EmailAddress::parts`]
/// splits it on demand once the syntax checker has accepted it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `(local, domain)` split on the last `@`, if any.
    pub fn parts(&self) -> Option<(&str, &str)> {
        self.0.rsplit_once('@')
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Outcome of the grammar check. When `ok` is true, `domain` and
/// `ascii_domain` are never empty.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SyntaxReport {
    pub ok: bool,
    pub local: String,
    pub domain: String,
    pub ascii_domain: String,
    pub reasons: Vec<String>,
}

impl SyntaxReport {
    pub(crate) fn rejected(reasons: Vec<String>) -> Self {
        Self {
            ok: false,
            local: String::new(),
            domain: String::new(),
            ascii_domain: String::new(),
            reasons,
        }
    }
}
