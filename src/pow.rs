//! Request proof-of-work for mempool routes.
//!
//! A node advertises a difficulty per route. Each request carries a random
//! cache id and a nonce such that `sha3("{nonce}-{id}")` starts with that
//! many zero bytes.

use sha3::{Digest, Sha3_256};
use uuid::Uuid;

use crate::error::{Result, WalletError};

pub const CACHE_ID_HEADER: &str = "x-cache-id";
pub const NONCE_HEADER: &str = "x-nonce";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowHeaders {
    pub cache_id: String,
    pub nonce: u64,
}

pub fn request_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(32);
    id
}

pub fn meets_difficulty(id: &str, nonce: u64, difficulty: usize) -> bool {
    let hash = Sha3_256::digest(format!("{nonce}-{id}").as_bytes());
    hash.iter().take(difficulty).all(|b| *b == 0)
}

pub fn find_nonce(id: &str, difficulty: usize) -> u64 {
    let mut nonce = 0;
    while !meets_difficulty(id, nonce, difficulty) {
        nonce += 1;
    }
    nonce
}

/// Fresh headers for a route of the given difficulty. The search runs on
/// the blocking pool.
pub async fn headers_for(difficulty: usize) -> Result<PowHeaders> {
    let cache_id = request_id();
    if difficulty == 0 {
        return Ok(PowHeaders { cache_id, nonce: 0 });
    }

    let id = cache_id.clone();
    let nonce = tokio::task::spawn_blocking(move || find_nonce(&id, difficulty))
        .await
        .map_err(|e| WalletError::Crypto(format!("nonce search failed: {e}")))?;
    log::debug!("found nonce {nonce} for difficulty {difficulty}");
    Ok(PowHeaders { cache_id, nonce })
}
