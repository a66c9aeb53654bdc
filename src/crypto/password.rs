//! Salted PBKDF2-SHA256 password hashes.
//!
//! Stored form: `pbkdf2_sha256$<iterations>$<salt b64>$<hash b64>`, kept in
//! the `users.password` TEXT column. Rows written by older builds hold the
//! password as plain text; those still verify (in constant time) and are
//! reported as [`Verification::LegacyMatch`] so the caller can rehash them.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::CryptoError;
use crate::config;

pub const HASH_SCHEME: &str = "pbkdf2_sha256";
pub const SALT_LENGTH: usize = 16;
pub const HASH_LENGTH: usize = 32;
/// Stored hashes above this count are refused instead of derived.
pub const MAX_PASSWORD_ITERATIONS: u32 = config::DEFAULT_PASSWORD_ITERATIONS * 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Match,
    /// Matched a plaintext legacy row; it should be rehashed.
    LegacyMatch,
    Mismatch,
}

impl Verification {
    pub fn is_match(self) -> bool {
        !matches!(self, Self::Mismatch)
    }
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let iterations = iterations.clamp(1, MAX_PASSWORD_ITERATIONS);
    let salt = generate_salt();
    let derived = derive(password, &salt, iterations, HASH_LENGTH);
    format!(
        "{HASH_SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(derived.as_slice()),
    )
}

/// Whether a stored credential is in hashed form.
pub fn is_hashed(stored: &str) -> bool {
    stored.starts_with(HASH_SCHEME) && stored[HASH_SCHEME.len()..].starts_with('$')
}

/// Check `password` against a stored credential.
pub fn verify_password(password: &str, stored: &str) -> Result<Verification, CryptoError> {
    if !is_hashed(stored) {
        let matched: bool = password.as_bytes().ct_eq(stored.as_bytes()).into();
        return Ok(if matched {
            Verification::LegacyMatch
        } else {
            Verification::Mismatch
        });
    }

    let parsed = ParsedHash::parse(stored)?;
    let derived = derive(password, &parsed.salt, parsed.iterations, parsed.hash.len());
    let matched: bool = derived.as_slice().ct_eq(parsed.hash.as_slice()).into();
    Ok(if matched {
        Verification::Match
    } else {
        Verification::Mismatch
    })
}

struct ParsedHash {
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

impl ParsedHash {
    fn parse(stored: &str) -> Result<Self, CryptoError> {
        let mut parts = stored.split('$');
        let _scheme = parts.next();
        let iterations = parts
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| (1..=MAX_PASSWORD_ITERATIONS).contains(n))
            .ok_or(CryptoError::MalformedHash("iteration count"))?;
        let salt = parts
            .next()
            .and_then(|s| STANDARD_NO_PAD.decode(s).ok())
            .filter(|s| !s.is_empty())
            .ok_or(CryptoError::MalformedHash("salt"))?;
        let hash = parts
            .next()
            .and_then(|s| STANDARD_NO_PAD.decode(s).ok())
            .filter(|h| !h.is_empty())
            .ok_or(CryptoError::MalformedHash("digest"))?;
        if parts.next().is_some() {
            return Err(CryptoError::MalformedHash("trailing fields"));
        }
        Ok(Self { iterations, salt, hash })
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32, len: usize) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITERATIONS: u32 = 1_000;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("doctor123", ITERATIONS);
        assert!(is_hashed(&stored));
        assert_eq!(verify_password("doctor123", &stored).unwrap(), Verification::Match);
        assert_eq!(verify_password("doctor124", &stored).unwrap(), Verification::Mismatch);
    }

    #[test]
    fn stored_form_has_four_fields() {
        let stored = hash_password("x", ITERATIONS);
        let parts: Vec<&str> = stored.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], HASH_SCHEME);
        assert_eq!(parts[1], "1000");
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = hash_password("patient123", ITERATIONS);
        let b = hash_password("patient123", ITERATIONS);
        assert_ne!(a, b);
        assert!(verify_password("patient123", &a).unwrap().is_match());
        assert!(verify_password("patient123", &b).unwrap().is_match());
    }

    #[test]
    fn verification_uses_stored_iteration_count() {
        let stored = hash_password("secret", 2_000);
        assert_eq!(verify_password("secret", &stored).unwrap(), Verification::Match);
    }

    #[test]
    fn plaintext_rows_are_legacy() {
        assert!(!is_hashed("doctor123"));
        assert_eq!(verify_password("doctor123", "doctor123").unwrap(), Verification::LegacyMatch);
        assert_eq!(verify_password("doctor12", "doctor123").unwrap(), Verification::Mismatch);
        assert_eq!(verify_password("", "doctor123").unwrap(), Verification::Mismatch);
    }

    #[test]
    fn malformed_hash_is_error() {
        for stored in [
            "pbkdf2_sha256$",
            "pbkdf2_sha256$abc$AAAA$AAAA",
            "pbkdf2_sha256$0$AAAA$AAAA",
            "pbkdf2_sha256$4294967295$AAAA$AAAA",
            "pbkdf2_sha256$1000$$AAAA",
            "pbkdf2_sha256$1000$AAAA$",
            "pbkdf2_sha256$1000$AAAA$AAAA$extra",
        ] {
            assert!(verify_password("x", stored).is_err(), "accepted {stored}");
        }
    }

    #[test]
    fn iteration_count_above_cap_is_refused() {
        let over = format!("{HASH_SCHEME}${}$AAAAAAAAAAAAAAAAAAAAAA$AAAA", MAX_PASSWORD_ITERATIONS + 1);
        assert!(matches!(
            verify_password("x", &over),
            Err(CryptoError::MalformedHash("iteration count"))
        ));
    }

    #[test]
    fn zero_iterations_clamped() {
        let stored = hash_password("x", 0);
        assert!(stored.starts_with("pbkdf2_sha256$1$"));
        assert!(verify_password("x", &stored).unwrap().is_match());
    }
}
