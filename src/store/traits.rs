//! The abstract store contract: any backend satisfying these two traits can
//! drive the engine. `ReadStore` is the read-only surface the Validator and
//! Balance service use; `WriteStore` adds the mutating surface the Applier
//! and Rollback engine use.
//!
//! Both are ordinary (non-object-safe) async traits — callers are always
//! generic over a concrete backend, never behind `dyn`, so there is no need
//! to reach for an `async_trait`-style boxing crate.

use crate::error::StoreError;

/// A snapshot of an output's mutable fields, as seen by a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSnapshot {
    pub address: String,
    pub value: i64,
    pub spent: bool,
}

pub trait ReadStore: Send + Sync {
    /// Current maximum block height, or 0 if the store is empty.
    async fn max_height(&self) -> Result<u64, StoreError>;

    async fn lookup_output(&self, tx_id: &str, index: u32) -> Result<Option<OutputSnapshot>, StoreError>;

    /// Cached balance; absence reads as 0.
    async fn get_balance(&self, address: &str) -> Result<i64, StoreError>;

    /// Sum of unspent output values for `address`, computed directly from
    /// the Outputs relation — the audit path that checks the cache above.
    async fn compute_balance(&self, address: &str) -> Result<i64, StoreError>;
}

/// The mutating surface. Every method here is assumed by its callers
/// (`applier`, `rollback`) to run inside one atomic unit of work per
/// `submit_block`/`rollback_to` invocation.
pub trait WriteStore: ReadStore {
    async fn insert_block(&mut self, id: &str, height: u64) -> Result<(), StoreError>;

    async fn insert_transaction(&mut self, id: &str, block_id: &str) -> Result<(), StoreError>;

    async fn insert_output(
        &mut self,
        tx_id: &str,
        index: u32,
        address: &str,
        value: i64,
    ) -> Result<(), StoreError>;

    async fn mark_output_spent(&mut self, tx_id: &str, index: u32) -> Result<(), StoreError>;

    async fn insert_input(
        &mut self,
        tx_id: &str,
        spent_tx_id: &str,
        spent_index: u32,
    ) -> Result<(), StoreError>;

    /// Additive upsert: add `delta` to the address's cached balance, or
    /// insert a new row with `delta` as the initial balance.
    async fn adjust_balance(&mut self, address: &str, delta: i64) -> Result<(), StoreError>;

    /// Deletes every Block (and, by cascade, Transaction/Output/Input row)
    /// with `height > target_height`.
    async fn delete_blocks_above(&mut self, target_height: u64) -> Result<(), StoreError>;

    /// For every surviving Output still flagged `spent` with no surviving
    /// Input referencing it, clears the flag.
    async fn unspend_orphaned_outputs(&mut self) -> Result<(), StoreError>;

    /// Clears AddressBalances and reinserts one row per address with at
    /// least one unspent output, carrying the sum of their values.
    async fn rebuild_balances(&mut self) -> Result<(), StoreError>;
}
