// src/nonce.rs
//
// Anti-replay nonces embedded in signed order actions. A nonce is 128 bits of
// randomness rendered as 32 hex characters; it carries no ordering
// information, the exchange's sequencer is the ordering authority.
use rand::RngCore;

const NONCE_BYTES: usize = 16;

/// Generates a fresh order nonce. Collisions are negligible for the action
/// volume of a single wallet.
pub fn generate_order_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    alloy_primitives::hex::encode(bytes)
}
