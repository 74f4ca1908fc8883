//! Salted password hashing for stored credentials.
//!
//! Stored shape: `sha256$<salt>$<hex-digest>`. Verification never panics on
//! a malformed stored value; anything that does not match the scheme simply
//! fails to verify.

use sha2::{Digest, Sha256};

const SCHEME: &str = "sha256";

/// Hash a password under a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    format!("{SCHEME}${salt}${}", digest(&salt, password))
}

/// Check `candidate` against a stored `sha256$salt$digest` value.
pub fn verify_password(stored: &str, candidate: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(SCHEME), Some(salt), Some(hash)) => digest(salt, candidate) == hash,
        _ => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"$");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
