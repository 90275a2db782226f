//! # Utilities
//!
//! Short code derivation and short URL composition. Both are pure.

use data_encoding::BASE32HEX;
use sha2::{Digest, Sha256};

// =====================================
// Constants
// =====================================
/// Length of every generated short code.
pub const SHORT_CODE_LENGTH: usize = 8;

/// Scheme used when neither the base address nor the caller supplies one.
pub const DEFAULT_SCHEME: &str = "http";

// =====================================
// Short Code Generation
// =====================================
/// Derive the short code of `original`.
///
/// SHA-256 of the input, base32hex-encoded (RFC 4648 §7), first eight
/// characters. Those are exactly the encoding of the digest's first 5
/// bytes, so no padding is ever produced.
///
/// The same input always yields the same code; a repeated original URL is
/// detected through this collision.
///
/// # Example
/// ```rust
/// use shortener::utils::generate_short_code;
///
/// assert_eq!(generate_short_code("https://example.com"), "20381BAK");
/// ```
#[must_use]
pub fn generate_short_code(original: &str) -> String {
    let digest = Sha256::digest(original.as_bytes());

    BASE32HEX.encode(&digest[..5])
}

// =====================================
// Short URL composition
// =====================================
/// Does `addr` already start with an http(s) scheme?
#[must_use]
pub fn has_scheme(addr: &str) -> bool {
    addr.starts_with("http://") || addr.starts_with("https://")
}

/// Compose an absolute short URL.
///
/// A base address that carries its own scheme is used verbatim and
/// `scheme` is ignored.
///
/// ```rust
/// use shortener::utils::compose_short_url;
///
/// assert_eq!(compose_short_url("localhost:8080", "http", "AB"), "http://localhost:8080/AB");
/// assert_eq!(compose_short_url("https://s.io/", "http", "AB"), "https://s.io/AB");
/// ```
#[must_use]
pub fn compose_short_url(base: &str, scheme: &str, code: &str) -> String {
    let base = base.trim_end_matches('/');

    if has_scheme(base) {
        format!("{}/{}", base, code)
    } else {
        format!("{}://{}/{}", scheme, base, code)
    }
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vectors() {
        assert_eq!(generate_short_code(""), "SEOC8GKO");
        assert_eq!(generate_short_code("https://example.com"), "20381BAK");
        assert_eq!(generate_short_code("https://ya.ru"), "FQ8A9UE3");
    }

    #[test]
    fn test_code_shape() {
        let code = generate_short_code("https://example.com/some/long/path?q=1");
        assert_eq!(code.len(), SHORT_CODE_LENGTH);
        assert!(code
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'V').contains(&b)));
        assert!(!code.contains('='));
    }

    #[test]
    fn test_compose_without_scheme_in_base() {
        assert_eq!(
            compose_short_url("localhost:8080", "https", "20381BAK"),
            "https://localhost:8080/20381BAK"
        );
    }

    #[test]
    fn test_compose_with_scheme_in_base() {
        assert_eq!(
            compose_short_url("http://short.io", "https", "20381BAK"),
            "http://short.io/20381BAK"
        );
    }
}
