use crate::chain::{ChainClient, ChainError, abi::IWriterStorage};
use alloy::{
    primitives::{Address, B256, Bytes, U256},
    rpc::types::{Filter, Log},
    sol_types::{SolCall, SolValue},
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

/// Deterministic chain for tests. Clones share state, so a test can keep a
/// handle and mutate the chain while listeners read from it.
#[derive(Clone, Default)]
pub struct MockChainClient {
    state: Arc<RwLock<MockChainState>>,
}

#[derive(Default)]
struct MockChainState {
    block_number: u64,
    logs: Vec<Log>,
    transactions: HashMap<B256, Bytes>,
    timestamps: HashMap<u64, u64>,
    calls: HashMap<(Address, Bytes), Bytes>,
    max_logs_per_query: Option<usize>,
    log_failures: VecDeque<ChainError>,
    block_number_failures: usize,
    log_queries: Vec<(u64, u64)>,
}

impl MockChainClient {
    pub fn new(block_number: u64) -> Self {
        let client = Self::default();
        client.set_block_number(block_number);
        client
    }

    pub fn set_block_number(&self, block_number: u64) {
        self.state.write().block_number = block_number;
    }

    pub fn push_log(&self, log: Log) {
        self.state.write().logs.push(log);
    }

    pub fn set_transaction_input(&self, hash: B256, input: Bytes) {
        self.state.write().transactions.insert(hash, input);
    }

    pub fn set_block_timestamp(&self, block_number: u64, timestamp: u64) {
        self.state.write().timestamps.insert(block_number, timestamp);
    }

    /// Answer for `getEntry(id)` on `storage`.
    pub fn set_entry(&self, storage: Address, id: u64, entry: IWriterStorage::Entry) {
        let input = IWriterStorage::getEntryCall { id: U256::from(id) }.abi_encode();
        self.state
            .write()
            .calls
            .insert((storage, input.into()), entry.abi_encode().into());
    }

    /// Queries matching more logs than this fail with [`ChainError::LimitExceeded`].
    pub fn set_max_logs_per_query(&self, max: usize) {
        self.state.write().max_logs_per_query = Some(max);
    }

    /// The next `get_logs` calls fail with these errors, in order.
    pub fn fail_next_log_queries(&self, errors: impl IntoIterator<Item = ChainError>) {
        self.state.write().log_failures.extend(errors);
    }

    pub fn fail_next_block_number_queries(&self, count: usize) {
        self.state.write().block_number_failures = count;
    }

    /// Inclusive block ranges of every `get_logs` call, including failed ones.
    pub fn log_queries(&self) -> Vec<(u64, u64)> {
        self.state.read().log_queries.clone()
    }

    pub fn clear_log_queries(&self) {
        self.state.write().log_queries.clear();
    }
}

fn log_matches(filter: &Filter, log: &Log, from: u64, to: u64) -> bool {
    let in_range = log
        .block_number
        .is_some_and(|block| (from..=to).contains(&block));
    let topic_matches = match log.topics().first() {
        Some(topic0) => filter.topics[0].matches(topic0),
        None => filter.topics[0].is_empty(),
    };
    in_range && filter.address.matches(&log.address()) && topic_matches
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn get_block_number(&self) -> Result<u64, ChainError> {
        let mut state = self.state.write();
        if state.block_number_failures > 0 {
            state.block_number_failures -= 1;
            return Err(ChainError::Transport("mock block number failure".to_string()));
        }
        Ok(state.block_number)
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainError> {
        let mut state = self.state.write();
        let from = filter.get_from_block().unwrap_or(0);
        let to = filter.get_to_block().unwrap_or(state.block_number);
        state.log_queries.push((from, to));

        if let Some(err) = state.log_failures.pop_front() {
            return Err(err);
        }

        let mut logs: Vec<Log> = state
            .logs
            .iter()
            .filter(|log| log_matches(filter, log, from, to))
            .cloned()
            .collect();
        logs.sort_by_key(|log| (log.block_number, log.log_index));

        if let Some(max) = state.max_logs_per_query
            && logs.len() > max
        {
            return Err(ChainError::LimitExceeded(format!(
                "query returned more than {max} results"
            )));
        }
        Ok(logs)
    }

    async fn get_transaction_input(&self, hash: B256) -> Result<Option<Bytes>, ChainError> {
        Ok(self.state.read().transactions.get(&hash).cloned())
    }

    async fn get_block_timestamp(&self, block_number: u64) -> Result<Option<u64>, ChainError> {
        Ok(self.state.read().timestamps.get(&block_number).copied())
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainError> {
        self.state
            .read()
            .calls
            .get(&(to, input))
            .cloned()
            .ok_or_else(|| {
                ChainError::Transport(format!("execution reverted: no call stub for {to}"))
            })
    }
}
