use super::tld::is_known_tld;

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Converts `domain` to its ASCII (punycode) form and pushes every rule it
/// breaks onto `reasons`. Returns an empty string when IDNA conversion fails.
pub(crate) fn check_domain(domain: &str, require_known_tld: bool, reasons: &mut Vec<String>) -> String {
    if domain.is_empty() {
        reasons.push("domain is empty".to_string());
        return String::new();
    }

    let Ok(ascii) = idna::domain_to_ascii(domain) else {
        reasons.push("domain punycode conversion failed".to_string());
        return String::new();
    };
    if ascii.is_empty() {
        reasons.push("domain empty after IDNA conversion".to_string());
        return ascii;
    }

    if ascii.len() > MAX_DOMAIN_LEN {
        reasons.push(format!("domain length {} > {MAX_DOMAIN_LEN}", ascii.len()));
    }
    let labels: Vec<&str> = ascii.split('.').collect();
    if labels.len() < 2 {
        reasons.push("domain must contain at least one dot".to_string());
    }
    for label in &labels {
        if let Some(reason) = label_problem(label) {
            reasons.push(reason);
        }
    }

    if require_known_tld && labels.len() >= 2 {
        if let Some(tld) = labels.last().filter(|tld| !tld.is_empty()) {
            if !is_known_tld(tld) {
                reasons.push(format!("unknown top-level domain '{tld}'"));
            }
        }
    }

    ascii
}

fn label_problem(label: &str) -> Option<String> {
    if label.is_empty() {
        return Some("empty domain label".to_string());
    }
    if label.len() > MAX_LABEL_LEN {
        return Some(format!("domain label '{label}' length {} > {MAX_LABEL_LEN}", label.len()));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Some(format!("domain label '{label}' cannot start/end with '-'"));
    }
    if !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return Some(format!("domain label '{label}' has invalid chars"));
    }
    None
}
