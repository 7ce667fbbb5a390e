use rand::{Rng, distributions::Alphanumeric};

/// Random local part used to detect catch-all servers.
pub(crate) fn random_local_part(len: usize) -> String {
    let length = len.clamp(12, 32);
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect::<String>()
        .to_ascii_lowercase()
}
