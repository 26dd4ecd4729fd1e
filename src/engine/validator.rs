//! Block validation: a pure, read-only function over a candidate block and
//! the current store state. The three check groups (height, economics,
//! hash) run in a fixed order and the first failure aborts — no partial
//! result is ever returned.

use std::collections::HashSet;

use crate::engine::hasher::compute_block_id;
use crate::error::EngineError;
use crate::model::{BlockRequest, ValidatedBlock};
use crate::store::ReadStore;

pub async fn validate(block: BlockRequest, store: &impl ReadStore) -> Result<ValidatedBlock, EngineError> {
    check_height(&block, store).await?;
    check_economics(&block, store).await?;
    check_hash(&block)?;
    Ok(ValidatedBlock(block))
}

async fn check_height(block: &BlockRequest, store: &impl ReadStore) -> Result<(), EngineError> {
    let current = store.max_height().await?;
    let expected = current + 1;
    if block.height != expected {
        return Err(EngineError::InvalidHeight { expected, actual: block.height });
    }
    Ok(())
}

async fn check_economics(block: &BlockRequest, store: &impl ReadStore) -> Result<(), EngineError> {
    let mut spent_in_block: HashSet<(String, u32)> = HashSet::new();

    for tx in &block.transactions {
        let mut input_sum: i64 = 0;
        for input in &tx.inputs {
            let key = (input.tx_id.clone(), input.index);
            if spent_in_block.contains(&key) {
                return Err(EngineError::DoubleSpend { tx_id: input.tx_id.clone(), index: input.index });
            }

            let output = store
                .lookup_output(&input.tx_id, input.index)
                .await?
                .ok_or_else(|| EngineError::NonexistentOutput {
                    tx_id: input.tx_id.clone(),
                    index: input.index,
                })?;
            if output.spent {
                return Err(EngineError::AlreadySpent { tx_id: input.tx_id.clone(), index: input.index });
            }

            spent_in_block.insert(key);
            input_sum += output.value;
        }

        let output_sum: i64 = tx.outputs.iter().map(|o| o.value).sum();
        if !tx.inputs.is_empty() && input_sum != output_sum {
            return Err(EngineError::SumMismatch { input_sum, output_sum });
        }
    }

    Ok(())
}

fn check_hash(block: &BlockRequest) -> Result<(), EngineError> {
    let expected = compute_block_id(block.height, block.transactions.iter().map(|tx| tx.id.as_str()));
    if expected != block.id {
        return Err(EngineError::InvalidBlockId { expected, actual: block.id.clone() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InputRequest, OutputRequest, TransactionRequest};
    use crate::store::memory::MemoryStore;
    use crate::store::WriteStore;

    fn genesis_block() -> BlockRequest {
        let tx = TransactionRequest {
            id: "tx1".to_string(),
            inputs: vec![],
            outputs: vec![OutputRequest { address: "addr1".to_string(), value: 10 }],
        };
        let id = compute_block_id(1, ["tx1"]);
        BlockRequest { id, height: 1, transactions: vec![tx] }
    }

    #[tokio::test]
    async fn accepts_well_formed_genesis() {
        let store = MemoryStore::new();
        let result = validate(genesis_block(), &store).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn rejects_height_gap() {
        let store = MemoryStore::new();
        let mut block = genesis_block();
        block.height = 2;
        block.id = compute_block_id(2, ["tx1"]);
        let err = validate(block, &store).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_HEIGHT");
        assert!(err.to_string().contains("Expected 1"));
    }

    #[tokio::test]
    async fn rejects_mismatched_hash() {
        let store = MemoryStore::new();
        let mut block = genesis_block();
        block.id = "not-the-real-hash".to_string();
        let err = validate(block, &store).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_BLOCK_ID");
    }

    #[tokio::test]
    async fn rejects_double_spend_within_block() {
        let mut store = MemoryStore::new();
        store.insert_block("b0", 1).await.unwrap();
        store.insert_transaction("tx1", "b0").await.unwrap();
        store.insert_output("tx1", 0, "addr1", 10).await.unwrap();

        let tx = TransactionRequest {
            id: "tx2".to_string(),
            inputs: vec![
                InputRequest { tx_id: "tx1".to_string(), index: 0 },
                InputRequest { tx_id: "tx1".to_string(), index: 0 },
            ],
            outputs: vec![OutputRequest { address: "addr2".to_string(), value: 10 }],
        };
        let id = compute_block_id(2, ["tx2"]);
        let block = BlockRequest { id, height: 2, transactions: vec![tx] };

        let err = validate(block, &store).await.unwrap_err();
        assert_eq!(err.code(), "DOUBLE_SPEND");
        assert!(err.to_string().contains("tx1:0"));
    }

    #[tokio::test]
    async fn rejects_nonexistent_output() {
        let mut store = MemoryStore::new();
        store.insert_block("b0", 1).await.unwrap();

        let tx = TransactionRequest {
            id: "tx2".to_string(),
            inputs: vec![InputRequest { tx_id: "ghost".to_string(), index: 0 }],
            outputs: vec![OutputRequest { address: "addr2".to_string(), value: 10 }],
        };
        let id = compute_block_id(2, ["tx2"]);
        let block = BlockRequest { id, height: 2, transactions: vec![tx] };

        let err = validate(block, &store).await.unwrap_err();
        assert_eq!(err.code(), "NONEXISTENT_OUTPUT");
    }

    #[tokio::test]
    async fn rejects_already_spent_output() {
        let mut store = MemoryStore::new();
        store.insert_block("b0", 1).await.unwrap();
        store.insert_transaction("tx1", "b0").await.unwrap();
        store.insert_output("tx1", 0, "addr1", 10).await.unwrap();
        store.mark_output_spent("tx1", 0).await.unwrap();

        let tx = TransactionRequest {
            id: "tx2".to_string(),
            inputs: vec![InputRequest { tx_id: "tx1".to_string(), index: 0 }],
            outputs: vec![OutputRequest { address: "addr2".to_string(), value: 10 }],
        };
        let id = compute_block_id(2, ["tx2"]);
        let block = BlockRequest { id, height: 2, transactions: vec![tx] };

        let err = validate(block, &store).await.unwrap_err();
        assert_eq!(err.code(), "ALREADY_SPENT");
    }

    #[tokio::test]
    async fn rejects_sum_mismatch() {
        let mut store = MemoryStore::new();
        store.insert_block("b0", 1).await.unwrap();
        store.insert_transaction("tx1", "b0").await.unwrap();
        store.insert_output("tx1", 0, "addr1", 10).await.unwrap();

        let tx = TransactionRequest {
            id: "tx2".to_string(),
            inputs: vec![InputRequest { tx_id: "tx1".to_string(), index: 0 }],
            outputs: vec![OutputRequest { address: "addr2".to_string(), value: 8 }],
        };
        let id = compute_block_id(2, ["tx2"]);
        let block = BlockRequest { id, height: 2, transactions: vec![tx] };

        let err = validate(block, &store).await.unwrap_err();
        assert_eq!(err.code(), "SUM_MISMATCH");
        let msg = err.to_string();
        assert!(msg.contains("Inputs: 10"));
        assert!(msg.contains("Outputs: 8"));
    }

    #[tokio::test]
    async fn coinbase_like_transaction_is_exempt_from_conservation() {
        let store = MemoryStore::new();
        let result = validate(genesis_block(), &store).await;
        assert!(result.is_ok(), "zero-input tx must not be sum-checked");
    }
}
