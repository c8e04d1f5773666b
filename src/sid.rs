//! Session id generation and validation
//!
//! Session ids are 30 bytes of CSPRNG output, base64url encoded without
//! padding, which always yields a 40 character string over the URL-safe
//! alphabet `[A-Za-z0-9_-]`. Candidates from untrusted input (cookies)
//! are checked against that exact shape before storage is ever touched.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;

/// Length in bytes of the random material behind a session id.
const ID_ENTROPY_BYTES: usize = 30;

/// Length in characters of an encoded session id.
pub const ID_LENGTH: usize = 40;

/// Generate a fresh, cryptographically random session id.
pub fn generate() -> String {
    let mut bytes = [0u8; ID_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Check whether a candidate string may be trusted as a session id.
///
/// True iff the candidate is exactly 40 characters from the URL-safe
/// base64 alphabet. Anything else (wrong length, padding, out-of-alphabet
/// bytes) must be replaced with a freshly generated id by the caller.
pub fn is_valid(candidate: &str) -> bool {
    candidate.len() == ID_LENGTH
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_valid() {
        for _ in 0..100 {
            let id = generate();
            assert_eq!(id.len(), ID_LENGTH);
            assert!(is_valid(&id), "generated id failed validation: {}", id);
        }
    }

    #[test]
    fn generated_ids_are_distinct() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(!is_valid(""));
        assert!(!is_valid("abc"));
        assert!(!is_valid(&"a".repeat(39)));
        assert!(!is_valid(&"a".repeat(41)));
    }

    #[test]
    fn accepts_full_alphabet() {
        assert!(is_valid(&"A".repeat(40)));
        assert!(is_valid(&"z".repeat(40)));
        assert!(is_valid(&"9".repeat(40)));
        assert!(is_valid(&"-".repeat(40)));
        assert!(is_valid(&"_".repeat(40)));
    }

    #[test]
    fn rejects_out_of_alphabet_characters() {
        assert!(!is_valid(&format!("{}+", "a".repeat(39))));
        assert!(!is_valid(&format!("{}/", "a".repeat(39))));
        assert!(!is_valid(&format!("{}=", "a".repeat(39))));
        assert!(!is_valid(&format!("{} ", "a".repeat(39))));
        assert!(!is_valid(&format!("{}\u{e9}", "a".repeat(39))));
    }
}
