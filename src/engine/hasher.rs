//! Canonical block id computation: SHA-256 over the decimal height
//! concatenated with the sorted transaction ids.
//!
//! This encoding is a wire contract: changing it breaks compatibility with
//! every block id already submitted to a running indexer.

use sha2::{Digest, Sha256};

/// `SHA256(decimal(height) ++ sorted(tx_ids).concat())`, lowercase hex.
pub fn compute_block_id<I, S>(height: u64, tx_ids: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<String> = tx_ids.into_iter().map(|s| s.as_ref().to_string()).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(height.to_string().as_bytes());
    for id in &sorted {
        hasher.update(id.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_hash_is_deterministic() {
        let a = compute_block_id(1, ["tx1"]);
        let b = compute_block_id(1, ["tx1"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn empty_transactions_hashes_just_the_height() {
        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(b"7");
            hex::encode(hasher.finalize())
        };
        assert_eq!(compute_block_id(7, Vec::<String>::new()), expected);
    }

    /// Hashing is invariant under permutation of the transaction ids.
    #[test]
    fn permutation_invariant() {
        let ids = ["tx_b", "tx_a", "tx_c"];
        let mut permuted = ids.to_vec();
        permuted.reverse();
        assert_eq!(compute_block_id(42, ids), compute_block_id(42, permuted));

        let shuffled = ["tx_c", "tx_a", "tx_b"];
        assert_eq!(compute_block_id(42, ids), compute_block_id(42, shuffled));
    }

    #[test]
    fn distinct_heights_produce_distinct_ids() {
        assert_ne!(compute_block_id(1, ["tx1"]), compute_block_id(2, ["tx1"]));
    }
}
