//! Secrets for namespace-scoped API keys.
//!
//! A secret is 64 random bytes from the OS generator, encoded as URL-safe
//! base64 without padding. Only its SHA-256 digest and a masked preview are
//! ever persisted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

const SECRET_BYTES: usize = 64;
const PREVIEW_EDGE: usize = 4;

/// A freshly generated secret together with what gets stored for it.
#[derive(Debug, Clone)]
pub struct GeneratedSecret {
    pub secret: String,
    pub hash: String,
    pub preview: String,
}

impl GeneratedSecret {
    #[must_use]
    pub fn new() -> Self {
        let secret = generate_secret();
        Self {
            hash: hash_secret(&secret),
            preview: mask_secret(&secret),
            secret,
        }
    }
}

impl Default for GeneratedSecret {
    fn default() -> Self {
        Self::new()
    }
}

#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Lowercase hex SHA-256 of the secret, used as the lookup key.
#[must_use]
pub fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Keeps the first and last four characters and stars out the rest.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= PREVIEW_EDGE * 2 {
        return "*".repeat(chars.len());
    }

    let head: String = chars[..PREVIEW_EDGE].iter().collect();
    let tail: String = chars[chars.len() - PREVIEW_EDGE..].iter().collect();
    format!(
        "{head}{}{tail}",
        "*".repeat(chars.len() - PREVIEW_EDGE * 2)
    )
}
