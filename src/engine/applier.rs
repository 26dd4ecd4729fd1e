//! Applier: mutates the store to record a validated block.
//!
//! Every call is assumed to run inside the single transaction the caller
//! (`engine::submit_block`) has already opened; begin/commit are owned by
//! the engine entry points rather than exposed here.

use crate::error::EngineError;
use crate::model::ValidatedBlock;
use crate::store::WriteStore;

pub async fn apply(block: &ValidatedBlock, store: &mut impl WriteStore) -> Result<(), EngineError> {
    store.insert_block(block.id(), block.height()).await?;

    for tx in block.transactions() {
        store.insert_transaction(&tx.id, block.id()).await?;

        for input in &tx.inputs {
            let output = store
                .lookup_output(&input.tx_id, input.index)
                .await?
                .ok_or_else(|| EngineError::NonexistentOutput {
                    tx_id: input.tx_id.clone(),
                    index: input.index,
                })?;

            store.mark_output_spent(&input.tx_id, input.index).await?;
            store.insert_input(&tx.id, &input.tx_id, input.index).await?;
            store.adjust_balance(&output.address, -output.value).await?;
        }

        for (index, output) in tx.outputs.iter().enumerate() {
            store.insert_output(&tx.id, index as u32, &output.address, output.value).await?;
            store.adjust_balance(&output.address, output.value).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::hasher::compute_block_id;
    use crate::model::{BlockRequest, InputRequest, OutputRequest, TransactionRequest};
    use crate::store::memory::MemoryStore;

    fn validated(block: BlockRequest) -> ValidatedBlock {
        ValidatedBlock(block)
    }

    #[tokio::test]
    async fn applies_genesis_and_credits_balance() {
        let mut store = MemoryStore::new();
        let tx = TransactionRequest {
            id: "tx1".to_string(),
            inputs: vec![],
            outputs: vec![OutputRequest { address: "addr1".to_string(), value: 10 }],
        };
        let block = validated(BlockRequest {
            id: compute_block_id(1, ["tx1"]),
            height: 1,
            transactions: vec![tx],
        });

        apply(&block, &mut store).await.unwrap();

        assert_eq!(store.get_balance("addr1").await.unwrap(), 10);
        assert_eq!(store.max_height().await.unwrap(), 1);
        let output = store.lookup_output("tx1", 0).await.unwrap().unwrap();
        assert!(!output.spent);
    }

    #[tokio::test]
    async fn applies_split_spend_and_marks_input_spent() {
        let mut store = MemoryStore::new();
        let genesis = validated(BlockRequest {
            id: compute_block_id(1, ["tx1"]),
            height: 1,
            transactions: vec![TransactionRequest {
                id: "tx1".to_string(),
                inputs: vec![],
                outputs: vec![OutputRequest { address: "addr1".to_string(), value: 10 }],
            }],
        });
        apply(&genesis, &mut store).await.unwrap();

        let split = validated(BlockRequest {
            id: compute_block_id(2, ["tx2"]),
            height: 2,
            transactions: vec![TransactionRequest {
                id: "tx2".to_string(),
                inputs: vec![InputRequest { tx_id: "tx1".to_string(), index: 0 }],
                outputs: vec![
                    OutputRequest { address: "addr2".to_string(), value: 4 },
                    OutputRequest { address: "addr3".to_string(), value: 6 },
                ],
            }],
        });
        apply(&split, &mut store).await.unwrap();

        assert_eq!(store.get_balance("addr1").await.unwrap(), 0);
        assert_eq!(store.get_balance("addr2").await.unwrap(), 4);
        assert_eq!(store.get_balance("addr3").await.unwrap(), 6);
        assert!(store.lookup_output("tx1", 0).await.unwrap().unwrap().spent);
    }
}
