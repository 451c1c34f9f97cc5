pub mod abi;
mod alloy_client;
mod error;

pub use alloy_client::AlloyChainClient;
pub use error::ChainError;

use alloy::{
    primitives::{Address, B256, Bytes},
    rpc::types::{Filter, Log},
};
use async_trait::async_trait;

/// Read-only access to the chain. A single instance is shared by all listeners.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_block_number(&self) -> Result<u64, ChainError>;

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainError>;

    /// Call data of the transaction, `None` if the node does not know the hash.
    async fn get_transaction_input(&self, hash: B256) -> Result<Option<Bytes>, ChainError>;

    async fn get_block_timestamp(&self, block_number: u64) -> Result<Option<u64>, ChainError>;

    /// `eth_call` against the latest block.
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainError>;
}
