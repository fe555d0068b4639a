use sha1::{Digest, Sha1};

/// Both vendor schemes sign the same way: lexicographically sort the four
/// parts, concatenate, SHA-1, lowercase hex.
pub(crate) fn sorted_sha1(token: &str, timestamp: &str, nonce: &str, payload: &str) -> String {
    let mut parts = [token, timestamp, nonce, payload];
    parts.sort_unstable();
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}
