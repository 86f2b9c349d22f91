//! Password digests stored in the shared document.
//!
//! Two stored formats are understood:
//!
//! ```text
//! sha256$<salt-hex>$<digest-hex>   per-user random salt (written by this crate)
//! <digest-hex>                     64 hex chars, fixed shared salt (legacy)
//! ```
//!
//! The digest is always `sha256(password + salt)` rendered as lowercase hex.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Salt shared by every legacy digest.
pub const FIXED_SALT: &str = "8940c93207a8584b243698fbf60fa394";

const SCHEME: &str = "sha256";
const SALT_BYTES: usize = 16;

/// Hashes `password` with `salt`.
pub fn hash(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hashes `password` with the fixed shared salt.
pub fn hash_default(password: &str) -> String {
    hash(password, FIXED_SALT)
}

/// Produces a storable digest with a fresh random salt.
pub fn hash_for_storage(password: &str) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::rng().fill(&mut salt);
    let salt = hex::encode(salt);
    format!("{}${}${}", SCHEME, salt, hash(password, &salt))
}

/// Checks `password` against a stored digest in either format.
pub fn verify(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(SCHEME), Some(salt), Some(digest)) => constant_time_eq(&hash(password, salt), digest),
        (Some(legacy), None, None) => constant_time_eq(&hash_default(password), legacy),
        _ => false,
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
