//! # Transaction-ID Generator
//!
//! Generates the human-auditable transaction id stamped on every sale at
//! creation. Format: a fixed 3-letter prefix, 7 random digits, 4 random
//! uppercase letters and 5 random digits, 19 characters total, e.g.
//! `TXN8304917QKZW55302`.
//!
//! Not cryptographically unbiased; uniqueness is backstopped by a UNIQUE
//! column constraint with a single insert retry in the database layer.

use rand::Rng;

/// Fixed prefix for all transaction ids.
pub const TRANSACTION_ID_PREFIX: &str = "TXN";

/// Total length of a transaction id: 3 + 7 + 4 + 5.
pub const TRANSACTION_ID_LEN: usize = 19;

/// Generates a new transaction id using the thread-local RNG.
pub fn generate_transaction_id() -> String {
    generate_with(&mut rand::thread_rng())
}

/// Generates a transaction id from the supplied RNG (deterministic in tests).
pub fn generate_with<R: Rng>(rng: &mut R) -> String {
    let mut id = String::with_capacity(TRANSACTION_ID_LEN);
    id.push_str(TRANSACTION_ID_PREFIX);
    for _ in 0..7 {
        id.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    for _ in 0..4 {
        id.push(char::from(rng.gen_range(b'A'..=b'Z')));
    }
    for _ in 0..5 {
        id.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    id
}

/// Checks whether a string matches the transaction-id format.
pub fn is_valid_transaction_id(id: &str) -> bool {
    if id.len() != TRANSACTION_ID_LEN || !id.starts_with(TRANSACTION_ID_PREFIX) {
        return false;
    }
    let bytes = id.as_bytes();
    bytes[3..10].iter().all(|b| b.is_ascii_digit())
        && bytes[10..14].iter().all(|b| b.is_ascii_uppercase())
        && bytes[14..19].iter().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_match_format() {
        for _ in 0..500 {
            let id = generate_transaction_id();
            assert_eq!(id.len(), TRANSACTION_ID_LEN);
            assert!(is_valid_transaction_id(&id), "bad id: {id}");
        }
    }

    #[test]
    fn validator_rejects_malformed_ids() {
        assert!(!is_valid_transaction_id(""));
        assert!(!is_valid_transaction_id("TXN123"));
        // Wrong prefix
        assert!(!is_valid_transaction_id("ABC1234567QKZW55302"));
        // Letters where digits belong
        assert!(!is_valid_transaction_id("TXNABCDEFGQKZW55302"));
        // Lowercase letter block
        assert!(!is_valid_transaction_id("TXN8304917qkzw55302"));
        // Too long
        assert!(!is_valid_transaction_id("TXN8304917QKZW553021"));
    }

    #[test]
    fn deterministic_with_seeded_rng() {
        use rand::SeedableRng;
        let mut a = rand::rngs::StdRng::seed_from_u64(7);
        let mut b = rand::rngs::StdRng::seed_from_u64(7);
        assert_eq!(generate_with(&mut a), generate_with(&mut b));
    }
}
