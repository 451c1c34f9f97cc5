use super::{ChainClient, ChainError};
use alloy::{
    consensus::Transaction as _,
    network::Ethereum,
    primitives::{Address, B256, Bytes},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{Filter, Log, TransactionRequest},
    transports::http::reqwest::Url,
};
use async_trait::async_trait;

/// [`ChainClient`] backed by an alloy provider.
#[derive(Clone)]
pub struct AlloyChainClient {
    provider: DynProvider<Ethereum>,
}

impl AlloyChainClient {
    pub fn new(provider: DynProvider<Ethereum>) -> Self {
        Self { provider }
    }

    pub fn connect_http(url: Url) -> Self {
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Self::new(provider)
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn get_block_number(&self) -> Result<u64, ChainError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainError> {
        Ok(self.provider.get_logs(filter).await?)
    }

    async fn get_transaction_input(&self, hash: B256) -> Result<Option<Bytes>, ChainError> {
        let tx = self.provider.get_transaction_by_hash(hash).await?;
        Ok(tx.map(|tx| tx.input().clone()))
    }

    async fn get_block_timestamp(&self, block_number: u64) -> Result<Option<u64>, ChainError> {
        let block = self
            .provider
            .get_block_by_number(block_number.into())
            .await?;
        Ok(block.map(|block| block.header.timestamp))
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainError> {
        let request = TransactionRequest::default().to(to).input(input.into());
        Ok(self.provider.call(request).await?)
    }
}
