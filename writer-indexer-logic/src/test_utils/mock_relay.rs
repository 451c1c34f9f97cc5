use crate::{
    provenance::CorrelationId,
    relay::{RelayClient, RelayError, RelayTransactionRequest},
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

/// In-memory relay. Unknown correlation ids answer with [`RelayError::NotFound`].
#[derive(Clone, Default)]
pub struct MockRelayClient {
    known: Arc<RwLock<HashMap<CorrelationId, RelayTransactionRequest>>>,
    requests: Arc<RwLock<Vec<CorrelationId>>>,
}

impl MockRelayClient {
    pub fn insert(&self, id: CorrelationId, request: RelayTransactionRequest) {
        self.known.write().insert(id, request);
    }

    /// Correlation ids asked for, in call order.
    pub fn requests(&self) -> Vec<CorrelationId> {
        self.requests.read().clone()
    }
}

#[async_trait]
impl RelayClient for MockRelayClient {
    async fn get_transaction_request(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<RelayTransactionRequest, RelayError> {
        self.requests.write().push(correlation_id.clone());
        self.known
            .read()
            .get(correlation_id)
            .cloned()
            .ok_or_else(|| RelayError::NotFound(correlation_id.to_string()))
    }
}
