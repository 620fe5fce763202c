//! Password hashing
//!
//! bcrypt is deliberately slow, so both directions run on the blocking pool:
//! the request awaits the result without stalling other requests.

use crate::core::error::DeliveryResult;

pub async fn hash_password(password: String, cost: u32) -> DeliveryResult<String> {
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

/// `Ok(false)` on mismatch; a malformed stored hash is also a mismatch
pub async fn verify_password(password: String, hash: String) -> DeliveryResult<bool> {
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    Ok(matches.unwrap_or(false))
}
