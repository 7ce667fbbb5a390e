/// Symbols allowed in an RFC 5322 `atext` besides ASCII letters and digits.
const ATEXT_SYMBOLS: &str = "!#$%&'*+-/=?^_`{|}~";

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || ATEXT_SYMBOLS.contains(c)
}

/// Dot-atom: one or more non-empty atoms joined by single dots.
pub(crate) fn is_local_strict(s: &str) -> bool {
    !s.is_empty()
        && s
            .split('.')
            .all(|atom| !atom.is_empty() && atom.chars().all(is_atext))
}

/// Relaxed mode also takes a simple quoted string: printable ASCII between the
/// quotes, with no inner quote or backslash.
pub(crate) fn is_local_relaxed(s: &str) -> bool {
    match s.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        Some(inner) => inner
            .chars()
            .all(|c| (' '..='~').contains(&c) && c != '"' && c != '\\'),
        None => is_local_strict(s),
    }
}
