pub mod entry;
pub mod transaction;
pub mod writer;

use alloy::primitives::{Address, B256};
use chrono::NaiveDateTime;

pub use entry::{EntryRecord, EntryTransition};
pub use transaction::TransactionRecord;
pub use writer::WriterRecord;

/// Where an event was observed on chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventProvenance {
    pub block_number: i64,
    pub log_index: i64,
    pub hash: Option<String>,
    pub block_datetime: Option<NaiveDateTime>,
}

impl EventProvenance {
    pub fn position(&self) -> (i64, i64) {
        (self.block_number, self.log_index)
    }
}

pub fn address_to_string(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

pub fn hash_to_string(hash: &B256) -> String {
    format!("0x{}", hex::encode(hash))
}

pub fn timestamp_to_datetime(timestamp: u64) -> Option<NaiveDateTime> {
    let seconds = i64::try_from(timestamp).ok()?;
    chrono::DateTime::from_timestamp(seconds, 0).map(|datetime| datetime.naive_utc())
}
