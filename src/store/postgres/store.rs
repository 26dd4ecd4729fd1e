//! Postgres-backed `ReadStore`/`WriteStore` implementations.
//!
//! Two concrete variants: [`PgReadStore`] wraps a pooled `Client` and
//! auto-commits every call (used by the validator, which never mutates);
//! [`PgTxStore`] wraps a real `tokio_postgres::Transaction` and is the only
//! thing the applier and rollback engine ever see, so every mutation they
//! perform lands in one atomic unit of work.

use tokio_postgres::Transaction;

use crate::error::StoreError;
use crate::store::traits::{OutputSnapshot, ReadStore, WriteStore};

/// Read-only access through a pooled, auto-committing connection.
pub struct PgReadStore<'a> {
    client: &'a tokio_postgres::Client,
}

impl<'a> PgReadStore<'a> {
    pub fn new(client: &'a tokio_postgres::Client) -> Self {
        Self { client }
    }
}

impl<'a> ReadStore for PgReadStore<'a> {
    async fn max_height(&self) -> Result<u64, StoreError> {
        max_height_via(self.client).await
    }

    async fn lookup_output(&self, tx_id: &str, index: u32) -> Result<Option<OutputSnapshot>, StoreError> {
        lookup_output_via(self.client, tx_id, index).await
    }

    async fn get_balance(&self, address: &str) -> Result<i64, StoreError> {
        get_balance_via(self.client, address).await
    }

    async fn compute_balance(&self, address: &str) -> Result<i64, StoreError> {
        compute_balance_via(self.client, address).await
    }
}

/// Mutating access through an in-flight transaction. `into_inner` hands
/// the transaction back to the caller (`engine::submit_block`,
/// `engine::rollback_to`) so it can be committed once every store call for
/// the operation has succeeded.
pub struct PgTxStore<'a> {
    tx: Transaction<'a>,
}

impl<'a> PgTxStore<'a> {
    pub fn new(tx: Transaction<'a>) -> Self {
        Self { tx }
    }

    pub fn into_inner(self) -> Transaction<'a> {
        self.tx
    }
}

impl<'a> ReadStore for PgTxStore<'a> {
    async fn max_height(&self) -> Result<u64, StoreError> {
        max_height_via(&self.tx).await
    }

    async fn lookup_output(&self, tx_id: &str, index: u32) -> Result<Option<OutputSnapshot>, StoreError> {
        lookup_output_via(&self.tx, tx_id, index).await
    }

    async fn get_balance(&self, address: &str) -> Result<i64, StoreError> {
        get_balance_via(&self.tx, address).await
    }

    async fn compute_balance(&self, address: &str) -> Result<i64, StoreError> {
        compute_balance_via(&self.tx, address).await
    }
}

impl<'a> WriteStore for PgTxStore<'a> {
    async fn insert_block(&mut self, id: &str, height: u64) -> Result<(), StoreError> {
        self.tx
            .execute("INSERT INTO blocks (id, height) VALUES ($1, $2)", &[&id, &(height as i64)])
            .await
            .map_err(StoreError::Query)?;
        Ok(())
    }

    async fn insert_transaction(&mut self, id: &str, block_id: &str) -> Result<(), StoreError> {
        self.tx
            .execute("INSERT INTO transactions (id, block_id) VALUES ($1, $2)", &[&id, &block_id])
            .await
            .map_err(StoreError::Query)?;
        Ok(())
    }

    async fn insert_output(
        &mut self,
        tx_id: &str,
        index: u32,
        address: &str,
        value: i64,
    ) -> Result<(), StoreError> {
        self.tx
            .execute(
                "INSERT INTO outputs (transaction_id, output_index, address, value, spent)
                 VALUES ($1, $2, $3, $4, FALSE)",
                &[&tx_id, &(index as i32), &address, &value],
            )
            .await
            .map_err(StoreError::Query)?;
        Ok(())
    }

    async fn mark_output_spent(&mut self, tx_id: &str, index: u32) -> Result<(), StoreError> {
        let rows = self
            .tx
            .execute(
                "UPDATE outputs SET spent = TRUE WHERE transaction_id = $1 AND output_index = $2",
                &[&tx_id, &(index as i32)],
            )
            .await
            .map_err(StoreError::Query)?;
        if rows == 0 {
            return Err(StoreError::Invariant(format!("mark_output_spent: {}:{} does not exist", tx_id, index)));
        }
        Ok(())
    }

    async fn insert_input(
        &mut self,
        tx_id: &str,
        spent_tx_id: &str,
        spent_index: u32,
    ) -> Result<(), StoreError> {
        self.tx
            .execute(
                "INSERT INTO inputs (transaction_id, spent_transaction_id, spent_output_index)
                 VALUES ($1, $2, $3)",
                &[&tx_id, &spent_tx_id, &(spent_index as i32)],
            )
            .await
            .map_err(StoreError::Query)?;
        Ok(())
    }

    async fn adjust_balance(&mut self, address: &str, delta: i64) -> Result<(), StoreError> {
        self.tx
            .execute(
                "INSERT INTO address_balances (address, balance) VALUES ($1, $2)
                 ON CONFLICT (address) DO UPDATE SET balance = address_balances.balance + EXCLUDED.balance",
                &[&address, &delta],
            )
            .await
            .map_err(StoreError::Query)?;
        Ok(())
    }

    async fn delete_blocks_above(&mut self, target_height: u64) -> Result<(), StoreError> {
        self.tx
            .execute("DELETE FROM blocks WHERE height > $1", &[&(target_height as i64)])
            .await
            .map_err(StoreError::Query)?;
        Ok(())
    }

    async fn unspend_orphaned_outputs(&mut self) -> Result<(), StoreError> {
        self.tx
            .execute(
                "UPDATE outputs o SET spent = FALSE
                 WHERE o.spent = TRUE
                   AND NOT EXISTS (
                       SELECT 1 FROM inputs i
                       WHERE i.spent_transaction_id = o.transaction_id
                         AND i.spent_output_index = o.output_index
                   )",
                &[],
            )
            .await
            .map_err(StoreError::Query)?;
        Ok(())
    }

    async fn rebuild_balances(&mut self) -> Result<(), StoreError> {
        self.tx.execute("DELETE FROM address_balances", &[]).await.map_err(StoreError::Query)?;
        self.tx
            .execute(
                "INSERT INTO address_balances (address, balance)
                 SELECT address, SUM(value) FROM outputs WHERE spent = FALSE GROUP BY address",
                &[],
            )
            .await
            .map_err(StoreError::Query)?;
        Ok(())
    }
}

// Shared read-path SQL, generic over `tokio_postgres::Client` and
// `tokio_postgres::Transaction` — both expose the same `query*` methods,
// just not through a common public trait, so the query bodies live once
// here and each wrapper type forwards into them.

async fn max_height_via(
    client: &(impl QueryOne + Sync),
) -> Result<u64, StoreError> {
    let row = client.query_one_row("SELECT COALESCE(MAX(height), 0) FROM blocks", &[]).await?;
    let height: i64 = row.get(0);
    Ok(height as u64)
}

async fn lookup_output_via(
    client: &(impl QueryOne + Sync),
    tx_id: &str,
    index: u32,
) -> Result<Option<OutputSnapshot>, StoreError> {
    let row = client
        .query_opt_row(
            "SELECT address, value, spent FROM outputs WHERE transaction_id = $1 AND output_index = $2",
            &[&tx_id, &(index as i32)],
        )
        .await?;
    Ok(row.map(|row| OutputSnapshot { address: row.get(0), value: row.get(1), spent: row.get(2) }))
}

async fn get_balance_via(client: &(impl QueryOne + Sync), address: &str) -> Result<i64, StoreError> {
    let row = client
        .query_opt_row("SELECT balance FROM address_balances WHERE address = $1", &[&address])
        .await?;
    Ok(row.map(|row| row.get(0)).unwrap_or(0))
}

async fn compute_balance_via(client: &(impl QueryOne + Sync), address: &str) -> Result<i64, StoreError> {
    let row = client
        .query_one_row(
            "SELECT COALESCE(SUM(value), 0) FROM outputs WHERE address = $1 AND spent = FALSE",
            &[&address],
        )
        .await?;
    Ok(row.get(0))
}

/// Bridges `Client`/`Transaction`'s near-identical (but not trait-unified)
/// query methods so the read-path SQL above can be written once.
trait QueryOne {
    async fn query_one_row(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<tokio_postgres::Row, StoreError>;

    async fn query_opt_row(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Option<tokio_postgres::Row>, StoreError>;
}

impl QueryOne for tokio_postgres::Client {
    async fn query_one_row(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<tokio_postgres::Row, StoreError> {
        self.query_one(sql, params).await.map_err(StoreError::Query)
    }

    async fn query_opt_row(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Option<tokio_postgres::Row>, StoreError> {
        self.query_opt(sql, params).await.map_err(StoreError::Query)
    }
}

impl<'a> QueryOne for Transaction<'a> {
    async fn query_one_row(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<tokio_postgres::Row, StoreError> {
        self.query_one(sql, params).await.map_err(StoreError::Query)
    }

    async fn query_opt_row(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Option<tokio_postgres::Row>, StoreError> {
        self.query_opt(sql, params).await.map_err(StoreError::Query)
    }
}
