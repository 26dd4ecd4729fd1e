//! Rollback engine: reverts state to a prior height in one transaction.
//! Order matters — cascading the deletes before recomputing spent flags and
//! balances is what makes the three steps compose into a single atomic
//! reversal instead of three independently-observable ones.

use crate::error::EngineError;
use crate::store::WriteStore;

pub async fn rollback_to(target_height: i64, store: &mut impl WriteStore) -> Result<(), EngineError> {
    if target_height < 0 {
        return Err(EngineError::InvalidTarget(target_height));
    }
    let target_height = target_height as u64;

    let current = store.max_height().await?;
    if current == 0 || target_height >= current {
        return Ok(());
    }

    store.delete_blocks_above(target_height).await?;
    store.unspend_orphaned_outputs().await?;
    store.rebuild_balances().await?;
    Ok(())
}
