//! Balance service: two read-only queries over the store.
//!
//! `get_balance` is the fast path (the cached `AddressBalance` relation);
//! `compute_balance` is the audit path that sums unspent outputs directly
//! and exists to check the cache against the ledger independently.

use crate::error::StoreError;
use crate::store::ReadStore;

pub async fn get_balance(store: &impl ReadStore, address: &str) -> Result<i64, StoreError> {
    store.get_balance(address).await
}

pub async fn compute_balance(store: &impl ReadStore, address: &str) -> Result<i64, StoreError> {
    store.compute_balance(address).await
}
