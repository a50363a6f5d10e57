//! API key generation and hashing.

use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};

const KEY_PREFIX: &str = "sk_";
const KEY_LEN: usize = 32;

/// Hex SHA-256 of a raw key. Only this digest is stored and looked up.
pub fn hash_api_key(key: &str) -> String {
    let hash = Sha256::digest(key.as_bytes());
    hex::encode(hash)
}

/// Generates a fresh raw key, `sk_` followed by 32 alphanumerics.
pub fn generate_api_key() -> String {
    let body: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LEN)
        .map(char::from)
        .collect();
    format!("{KEY_PREFIX}{body}")
}
