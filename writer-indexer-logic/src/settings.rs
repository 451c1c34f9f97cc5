use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct IndexerSettings {
    /// Chain id recorded for transactions the relay could not describe.
    pub chain_id: i64,
    pub factory_address: Address,
    #[serde(default)]
    pub factory_start_block: u64,
    #[serde(default)]
    pub fetcher: LogFetcherSettings,
    #[serde(default = "default_handler_retry_delays")]
    #[serde_as(as = "Vec<serde_with::DurationSeconds<u64>>")]
    pub handler_retry_delays: Vec<Duration>,
    #[serde(default = "default_restart_delay")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub restart_delay: Duration,
}

impl IndexerSettings {
    pub fn new(chain_id: i64, factory_address: Address) -> Self {
        Self {
            chain_id,
            factory_address,
            factory_start_block: 0,
            fetcher: Default::default(),
            handler_retry_delays: default_handler_retry_delays(),
            restart_delay: default_restart_delay(),
        }
    }
}

fn default_handler_retry_delays() -> Vec<Duration> {
    [5, 20, 120].into_iter().map(Duration::from_secs).collect()
}

fn default_restart_delay() -> Duration {
    Duration::from_secs(10)
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LogFetcherSettings {
    /// Upper bound of blocks per `eth_getLogs` query.
    pub window_size: u64,
    /// The window is never shrunk below this size on provider limit errors.
    pub min_window_size: u64,
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub poll_interval: Duration,
    #[serde_as(as = "Vec<serde_with::DurationSeconds<u64>>")]
    pub retry_delays: Vec<Duration>,
}

impl Default for LogFetcherSettings {
    fn default() -> Self {
        Self {
            window_size: 3000,
            min_window_size: 1,
            poll_interval: Duration::from_secs(5),
            retry_delays: [1, 5, 20].into_iter().map(Duration::from_secs).collect(),
        }
    }
}
