use crate::provenance::CorrelationId;
use writer_indexer_entity::sea_orm_active_enums::TransactionStatus;

/// Observation of a relay transaction, as written to the `transactions` table.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionRecord {
    pub id: CorrelationId,
    pub chain_id: i64,
    pub block_number: Option<i64>,
    pub hash: Option<String>,
    pub status: TransactionStatus,
    pub function_signature: Option<String>,
    pub args: Option<serde_json::Value>,
}

impl TransactionRecord {
    /// A request accepted by the relay but not yet seen on chain.
    pub fn pending(
        id: CorrelationId,
        chain_id: i64,
        function_signature: Option<String>,
        args: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id,
            chain_id,
            block_number: None,
            hash: None,
            status: TransactionStatus::Pending,
            function_signature,
            args,
        }
    }

    /// A transaction known only from the log that referenced it.
    pub fn observed_on_chain(
        id: CorrelationId,
        chain_id: i64,
        block_number: i64,
        hash: Option<String>,
    ) -> Self {
        Self {
            id,
            chain_id,
            block_number: Some(block_number),
            hash,
            status: TransactionStatus::Confirmed,
            function_signature: None,
            args: None,
        }
    }
}
