//! Cache key derivation.

use sha2::{Digest, Sha256};

/// Row key for a scrape record: hex SHA-256 of the URL exactly as requested.
pub fn record_key(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        assert_eq!(record_key("https://example.com"), record_key("https://example.com"));
    }

    #[test]
    fn test_key_distinguishes_urls() {
        assert_ne!(record_key("https://example.com"), record_key("https://example.com/"));
    }

    #[test]
    fn test_key_format() {
        let key = record_key("https://example.com");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
