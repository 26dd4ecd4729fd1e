//! In-memory store backend.
//!
//! Exists for two reasons: it lets the engine's tests exercise full
//! submit/rollback cycles without a live Postgres instance, and it is a
//! live demonstration that the engine genuinely depends only on the
//! `ReadStore`/`WriteStore` contract rather than on anything Postgres-
//! specific. Single-writer discipline is enforced the same way the Postgres
//! backend enforces it — one `Mutex` guards the whole operation, and cascade
//! deletes are modelled explicitly via the block/transaction ownership maps
//! below rather than relying on a foreign-key engine.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StoreError;
use crate::store::traits::{OutputSnapshot, ReadStore, WriteStore};

#[derive(Debug, Clone)]
struct OutputRow {
    address: String,
    value: i64,
    spent: bool,
}

#[derive(Debug, Clone)]
struct InputRow {
    owning_tx: String,
    spent_tx: String,
    spent_index: u32,
}

#[derive(Debug, Default)]
struct Inner {
    max_height: u64,
    /// block_id -> height
    block_height: HashMap<String, u64>,
    /// tx_id -> owning block_id
    tx_block: HashMap<String, String>,
    /// (tx_id, output_index) -> row
    outputs: HashMap<(String, u32), OutputRow>,
    inputs: Vec<InputRow>,
    balances: HashMap<String, i64>,
}

impl Inner {
    fn spent_ref_counts(&self) -> HashMap<(String, u32), u32> {
        let mut counts = HashMap::new();
        for input in &self.inputs {
            *counts.entry((input.spent_tx.clone(), input.spent_index)).or_insert(0) += 1;
        }
        counts
    }
}

/// A plain in-memory UTXO store, guarded by a single mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadStore for MemoryStore {
    async fn max_height(&self) -> Result<u64, StoreError> {
        Ok(self.inner.lock().unwrap().max_height)
    }

    async fn lookup_output(&self, tx_id: &str, index: u32) -> Result<Option<OutputSnapshot>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .outputs
            .get(&(tx_id.to_string(), index))
            .map(|row| OutputSnapshot {
                address: row.address.clone(),
                value: row.value,
                spent: row.spent,
            }))
    }

    async fn get_balance(&self, address: &str) -> Result<i64, StoreError> {
        Ok(self.inner.lock().unwrap().balances.get(address).copied().unwrap_or(0))
    }

    async fn compute_balance(&self, address: &str) -> Result<i64, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .outputs
            .values()
            .filter(|o| !o.spent && o.address == address)
            .map(|o| o.value)
            .sum())
    }
}

impl WriteStore for MemoryStore {
    async fn insert_block(&mut self, id: &str, height: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.block_height.insert(id.to_string(), height);
        inner.max_height = height;
        Ok(())
    }

    async fn insert_transaction(&mut self, id: &str, block_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.tx_block.insert(id.to_string(), block_id.to_string());
        Ok(())
    }

    async fn insert_output(
        &mut self,
        tx_id: &str,
        index: u32,
        address: &str,
        value: i64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.outputs.insert(
            (tx_id.to_string(), index),
            OutputRow { address: address.to_string(), value, spent: false },
        );
        Ok(())
    }

    async fn mark_output_spent(&mut self, tx_id: &str, index: u32) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let key = (tx_id.to_string(), index);
        match inner.outputs.get_mut(&key) {
            Some(row) => {
                row.spent = true;
                Ok(())
            }
            None => Err(StoreError::Invariant(format!("mark_output_spent: {}:{} does not exist", tx_id, index))),
        }
    }

    async fn insert_input(
        &mut self,
        tx_id: &str,
        spent_tx_id: &str,
        spent_index: u32,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.inputs.push(InputRow {
            owning_tx: tx_id.to_string(),
            spent_tx: spent_tx_id.to_string(),
            spent_index,
        });
        Ok(())
    }

    async fn adjust_balance(&mut self, address: &str, delta: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        *inner.balances.entry(address.to_string()).or_insert(0) += delta;
        Ok(())
    }

    async fn delete_blocks_above(&mut self, target_height: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.max_height <= target_height {
            return Ok(());
        }

        let doomed_blocks: Vec<String> = inner
            .block_height
            .iter()
            .filter(|(_, &height)| height > target_height)
            .map(|(id, _)| id.clone())
            .collect();
        let doomed_blocks: std::collections::HashSet<String> = doomed_blocks.into_iter().collect();

        let doomed_txs: std::collections::HashSet<String> = inner
            .tx_block
            .iter()
            .filter(|(_, block_id)| doomed_blocks.contains(*block_id))
            .map(|(tx_id, _)| tx_id.clone())
            .collect();

        inner.outputs.retain(|(tx_id, _), _| !doomed_txs.contains(tx_id));
        inner.inputs.retain(|row| !doomed_txs.contains(&row.owning_tx));
        inner.tx_block.retain(|tx_id, _| !doomed_txs.contains(tx_id));
        inner.block_height.retain(|id, _| !doomed_blocks.contains(id));
        inner.max_height = target_height;
        Ok(())
    }

    async fn unspend_orphaned_outputs(&mut self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let refs = inner.spent_ref_counts();
        for (key, row) in inner.outputs.iter_mut() {
            if row.spent && refs.get(key).copied().unwrap_or(0) == 0 {
                row.spent = false;
            }
        }
        Ok(())
    }

    async fn rebuild_balances(&mut self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let mut rebuilt: HashMap<String, i64> = HashMap::new();
        for row in inner.outputs.values() {
            if !row.spent {
                *rebuilt.entry(row.address.clone()).or_insert(0) += row.value;
            }
        }
        inner.balances = rebuilt;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn balance_absence_reads_as_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.get_balance("nobody").await.unwrap(), 0);
        assert_eq!(store.compute_balance("nobody").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn adjust_balance_is_additive_upsert() {
        let mut store = MemoryStore::new();
        store.adjust_balance("addr1", 10).await.unwrap();
        store.adjust_balance("addr1", -4).await.unwrap();
        assert_eq!(store.get_balance("addr1").await.unwrap(), 6);
    }

    #[tokio::test]
    async fn unspend_orphaned_outputs_clears_flag_once_refs_drop() {
        let mut store = MemoryStore::new();
        store.insert_block("b1", 1).await.unwrap();
        store.insert_transaction("tx1", "b1").await.unwrap();
        store.insert_output("tx1", 0, "addr1", 10).await.unwrap();
        store.mark_output_spent("tx1", 0).await.unwrap();
        store.insert_transaction("tx2", "b1").await.unwrap();
        store.insert_input("tx2", "tx1", 0).await.unwrap();

        store.unspend_orphaned_outputs().await.unwrap();
        assert!(store.lookup_output("tx1", 0).await.unwrap().unwrap().spent);

        // rolling back the block that owns tx2 drops its input row, orphaning the spend
        store.delete_blocks_above(0).await.unwrap();
        store.unspend_orphaned_outputs().await.unwrap();
        assert!(!store.lookup_output("tx1", 0).await.unwrap().unwrap().spent);
    }

    #[tokio::test]
    async fn delete_blocks_above_cascades_outputs_and_inputs() {
        let mut store = MemoryStore::new();
        store.insert_block("b1", 1).await.unwrap();
        store.insert_transaction("tx1", "b1").await.unwrap();
        store.insert_output("tx1", 0, "addr1", 10).await.unwrap();

        store.insert_block("b2", 2).await.unwrap();
        store.insert_transaction("tx2", "b2").await.unwrap();
        store.mark_output_spent("tx1", 0).await.unwrap();
        store.insert_input("tx2", "tx1", 0).await.unwrap();
        store.insert_output("tx2", 0, "addr2", 10).await.unwrap();

        store.delete_blocks_above(1).await.unwrap();

        assert_eq!(store.max_height().await.unwrap(), 1);
        assert!(store.lookup_output("tx2", 0).await.unwrap().is_none());
        assert!(store.lookup_output("tx1", 0).await.unwrap().unwrap().spent);
        store.unspend_orphaned_outputs().await.unwrap();
        assert!(!store.lookup_output("tx1", 0).await.unwrap().unwrap().spent);
    }

    #[tokio::test]
    async fn delete_blocks_above_is_noop_when_target_above_current() {
        let mut store = MemoryStore::new();
        store.insert_block("b1", 1).await.unwrap();
        store.delete_blocks_above(5).await.unwrap();
        assert_eq!(store.max_height().await.unwrap(), 1);
    }
}
