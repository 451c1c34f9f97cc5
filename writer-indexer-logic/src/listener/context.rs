use crate::{
    chain::ChainClient,
    database::WriterDatabase,
    error::IndexerError,
    provenance::{CorrelationId, decode_correlation_id},
    relay::{OnChainObservation, Reconciler},
    settings::IndexerSettings,
    types::{EventProvenance, hash_to_string, timestamp_to_datetime},
};
use alloy::rpc::types::Log;
use std::sync::Arc;

/// Dependencies shared by every listener of one indexer.
#[derive(Clone)]
pub struct ListenerContext {
    pub chain: Arc<dyn ChainClient>,
    pub db: WriterDatabase,
    pub reconciler: Arc<Reconciler>,
    pub settings: Arc<IndexerSettings>,
}

impl ListenerContext {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        db: WriterDatabase,
        reconciler: Arc<Reconciler>,
        settings: Arc<IndexerSettings>,
    ) -> Self {
        Self {
            chain,
            db,
            reconciler,
            settings,
        }
    }

    pub async fn provenance(&self, log: &Log) -> Result<EventProvenance, IndexerError> {
        let block_number = log
            .block_number
            .ok_or_else(|| IndexerError::MalformedLog("missing block number".to_string()))?;
        let log_index = log
            .log_index
            .ok_or_else(|| IndexerError::MalformedLog("missing log index".to_string()))?;
        let timestamp = match log.block_timestamp {
            Some(timestamp) => Some(timestamp),
            None => self.chain.get_block_timestamp(block_number).await?,
        };

        Ok(EventProvenance {
            block_number: to_i64(block_number, "block number")?,
            log_index: to_i64(log_index, "log index")?,
            hash: log.transaction_hash.as_ref().map(hash_to_string),
            block_datetime: timestamp.and_then(timestamp_to_datetime),
        })
    }

    /// Looks for a relay correlation id in the call data of the transaction
    /// that emitted `log`. When one is found the reconciled transaction is
    /// stored before the id is returned, so rows referencing it can be written.
    pub async fn resolve_transaction(
        &self,
        log: &Log,
        provenance: &EventProvenance,
    ) -> Result<Option<CorrelationId>, IndexerError> {
        let Some(hash) = log.transaction_hash else {
            return Ok(None);
        };
        let Some(input) = self.chain.get_transaction_input(hash).await? else {
            tracing::warn!(
                tx_hash = %hash,
                "transaction not found on chain, provenance is unknown"
            );
            return Ok(None);
        };
        let Some(correlation_id) = decode_correlation_id(&input) else {
            tracing::debug!(tx_hash = %hash, "transaction was not submitted by the relay");
            return Ok(None);
        };
        tracing::Span::current().record("correlation_id", correlation_id.as_str());

        let observed = OnChainObservation {
            block_number: provenance.block_number,
            hash: provenance.hash.clone(),
        };
        let record = self.reconciler.reconcile(&correlation_id, &observed).await;
        self.db.upsert_transaction(&record).await?;
        Ok(Some(correlation_id))
    }
}

fn to_i64(value: u64, what: &str) -> Result<i64, IndexerError> {
    i64::try_from(value)
        .map_err(|_| IndexerError::MalformedLog(format!("{what} {value} is out of range")))
}
