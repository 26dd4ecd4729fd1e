//! Wire (JSON) representations of the block submission schema.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockRequest {
    pub id: String,
    pub height: u64,
    pub transactions: Vec<TransactionRequest>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransactionRequest {
    pub id: String,
    #[serde(default)]
    pub inputs: Vec<InputRequest>,
    #[serde(default)]
    pub outputs: Vec<OutputRequest>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputRequest {
    #[serde(rename = "txId")]
    pub tx_id: String,
    pub index: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputRequest {
    pub address: String,
    pub value: i64,
}

/// A block that has passed every check in [`crate::engine::validator`].
/// Only the applier can construct one — callers cannot skip validation.
#[derive(Debug, Clone)]
pub struct ValidatedBlock(pub(crate) BlockRequest);

impl ValidatedBlock {
    pub fn height(&self) -> u64 {
        self.0.height
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn transactions(&self) -> &[TransactionRequest] {
        &self.0.transactions
    }
}
