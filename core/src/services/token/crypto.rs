//! Randomness and hashing for refresh tokens

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Cryptographically secure byte source
pub trait SecureRandomSource: Send + Sync {
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Operating system CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomSource;

impl SecureRandomSource for OsRandomSource {
    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

/// One-way function from a raw token to its stored form
pub trait TokenHasher: Send + Sync {
    fn hash(&self, raw_token: &str) -> String;
}

/// SHA-256 over the UTF-8 bytes of the raw token, lowercase hex encoded
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256TokenHasher;

impl TokenHasher for Sha256TokenHasher {
    fn hash(&self, raw_token: &str) -> String {
        hex::encode(Sha256::digest(raw_token.as_bytes()))
    }
}

/// Encode random bytes as a raw token: URL-safe base64 without padding
pub fn encode_raw_token(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
