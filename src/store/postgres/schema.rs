//! Idempotent schema bootstrap: one `batch_execute` of `CREATE TABLE IF NOT
//! EXISTS` / `CREATE INDEX IF NOT EXISTS` statements, run once at startup
//! before the engine serves any request.

use crate::error::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS blocks (
    id          VARCHAR(64) PRIMARY KEY,
    height      BIGINT NOT NULL UNIQUE,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_blocks_height ON blocks (height);

CREATE TABLE IF NOT EXISTS transactions (
    id          VARCHAR(256) PRIMARY KEY,
    block_id    VARCHAR(64) NOT NULL REFERENCES blocks (id) ON DELETE CASCADE,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_transactions_block_id ON transactions (block_id);

CREATE TABLE IF NOT EXISTS outputs (
    transaction_id  VARCHAR(256) NOT NULL REFERENCES transactions (id) ON DELETE CASCADE,
    output_index    INTEGER NOT NULL,
    address         VARCHAR(256) NOT NULL,
    value           BIGINT NOT NULL CHECK (value >= 0),
    spent           BOOLEAN NOT NULL DEFAULT FALSE,
    PRIMARY KEY (transaction_id, output_index)
);
CREATE INDEX IF NOT EXISTS idx_outputs_transaction_id ON outputs (transaction_id);
CREATE INDEX IF NOT EXISTS idx_outputs_address ON outputs (address);
CREATE INDEX IF NOT EXISTS idx_outputs_spent ON outputs (spent);

CREATE TABLE IF NOT EXISTS inputs (
    id                    BIGSERIAL PRIMARY KEY,
    transaction_id        VARCHAR(256) NOT NULL REFERENCES transactions (id) ON DELETE CASCADE,
    spent_transaction_id  VARCHAR(256) NOT NULL,
    spent_output_index    INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_inputs_transaction_id ON inputs (transaction_id);
CREATE INDEX IF NOT EXISTS idx_inputs_spent_output
    ON inputs (spent_transaction_id, spent_output_index);

CREATE TABLE IF NOT EXISTS address_balances (
    address  VARCHAR(256) PRIMARY KEY,
    balance  BIGINT NOT NULL CHECK (balance >= 0)
);
"#;

/// Creates every relation and index in `SCHEMA` if absent. Safe to call on
/// every startup.
pub async fn ensure_schema(client: &tokio_postgres::Client) -> Result<(), StoreError> {
    client
        .batch_execute(SCHEMA)
        .await
        .map_err(StoreError::Query)
}
