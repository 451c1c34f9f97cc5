use super::{RelayClient, RelayTransactionRequest};
use crate::{provenance::CorrelationId, types::TransactionRecord};
use std::sync::Arc;
use writer_indexer_entity::sea_orm_active_enums::TransactionStatus;

/// On-chain facts about the transaction that emitted a log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnChainObservation {
    pub block_number: i64,
    pub hash: Option<String>,
}

/// Merges relay metadata into the transaction referenced by an on-chain event.
pub struct Reconciler {
    relay: Option<Arc<dyn RelayClient>>,
    chain_id: i64,
}

impl Reconciler {
    pub fn new(relay: Option<Arc<dyn RelayClient>>, chain_id: i64) -> Self {
        Self { relay, chain_id }
    }

    /// Never fails: when the relay cannot describe the transaction, the
    /// record carries the on-chain fields only.
    pub async fn reconcile(
        &self,
        correlation_id: &CorrelationId,
        observed: &OnChainObservation,
    ) -> TransactionRecord {
        let Some(relay) = &self.relay else {
            return self.on_chain_only(correlation_id, observed);
        };

        match relay.get_transaction_request(correlation_id).await {
            Ok(request) => project(correlation_id.clone(), request, observed),
            Err(err) => {
                tracing::warn!(
                    err = ?err,
                    correlation_id = %correlation_id,
                    block_number = observed.block_number,
                    hash = ?observed.hash,
                    "failed to fetch relay transaction, using on-chain fields only"
                );
                self.on_chain_only(correlation_id, observed)
            }
        }
    }

    fn on_chain_only(
        &self,
        correlation_id: &CorrelationId,
        observed: &OnChainObservation,
    ) -> TransactionRecord {
        TransactionRecord::observed_on_chain(
            correlation_id.clone(),
            self.chain_id,
            observed.block_number,
            observed.hash.clone(),
        )
    }
}

/// The first SUBMITTED or CONFIRMED attempt, in relay order, supplies block and
/// hash. The status is CONFIRMED because the event was seen on chain.
fn project(
    id: CorrelationId,
    request: RelayTransactionRequest,
    observed: &OnChainObservation,
) -> TransactionRecord {
    let attempt = request.transaction_attempts.iter().find(|attempt| {
        matches!(
            attempt.status,
            TransactionStatus::Submitted | TransactionStatus::Confirmed
        )
    });

    TransactionRecord {
        id,
        chain_id: request.chain_id,
        block_number: attempt
            .and_then(|attempt| attempt.block)
            .or(Some(observed.block_number)),
        hash: attempt
            .and_then(|attempt| attempt.hash.as_ref())
            .map(|hash| hash.to_lowercase())
            .or_else(|| observed.hash.clone()),
        status: TransactionStatus::Confirmed,
        function_signature: request.function_signature,
        args: request.decoded_data,
    }
}
