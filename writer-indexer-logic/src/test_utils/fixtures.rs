use crate::chain::abi::{IWriterFactory, IWriterStorage};
use alloy::{
    primitives::{Address, B256, Bytes, U256},
    rpc::types::Log,
    sol_types::SolEvent,
};

pub const FACTORY: Address = Address::repeat_byte(0xfa);
pub const WRITER: Address = Address::repeat_byte(0xaa);
pub const STORAGE: Address = Address::repeat_byte(0xbb);
pub const ADMIN: Address = Address::repeat_byte(0xcc);
pub const AUTHOR: Address = Address::repeat_byte(0xdd);

/// Call data the relay would submit: an abi call with the correlation token appended.
pub fn relay_call_data(compact_id: &str) -> Bytes {
    let mut data = vec![0x12, 0x34, 0x56, 0x78];
    data.extend_from_slice(&[0u8; 64]);
    data.extend_from_slice(format!("syn{compact_id}").as_bytes());
    data.into()
}

pub fn plain_call_data() -> Bytes {
    let mut data = vec![0x12, 0x34, 0x56, 0x78];
    data.extend_from_slice(&[0u8; 64]);
    data.into()
}

pub fn tx_hash(seed: u8) -> B256 {
    B256::repeat_byte(seed)
}

pub fn to_rpc_log(
    address: Address,
    data: alloy::primitives::LogData,
    block_number: u64,
    log_index: u64,
    tx_hash: B256,
) -> Log {
    Log {
        inner: alloy::primitives::Log { address, data },
        block_hash: Some(B256::with_last_byte(block_number as u8)),
        block_number: Some(block_number),
        block_timestamp: Some(1_700_000_000 + block_number),
        transaction_hash: Some(tx_hash),
        transaction_index: Some(0),
        log_index: Some(log_index),
        removed: false,
    }
}

pub fn writer_created_log(
    writer: Address,
    storage: Address,
    title: &str,
    block_number: u64,
    tx_hash: B256,
) -> Log {
    let event = IWriterFactory::WriterCreated {
        writerAddress: writer,
        storeAddress: storage,
        admin: ADMIN,
        title: title.to_string(),
        managers: vec![ADMIN, AUTHOR],
    };
    to_rpc_log(FACTORY, event.encode_log_data(), block_number, 0, tx_hash)
}

#[derive(Clone, Copy, Debug)]
pub enum EntryEvent {
    Created,
    Updated,
    Removed,
}

pub fn entry_log(
    kind: EntryEvent,
    storage: Address,
    id: u64,
    block_number: u64,
    log_index: u64,
    tx_hash: B256,
) -> Log {
    let id = U256::from(id);
    let data = match kind {
        EntryEvent::Created => {
            IWriterStorage::EntryCreated { id, author: AUTHOR }.encode_log_data()
        }
        EntryEvent::Updated => {
            IWriterStorage::EntryUpdated { id, author: AUTHOR }.encode_log_data()
        }
        EntryEvent::Removed => {
            IWriterStorage::EntryRemoved { id, author: AUTHOR }.encode_log_data()
        }
    };
    to_rpc_log(storage, data, block_number, log_index, tx_hash)
}

pub fn stored_entry(content: &str, exists: bool) -> IWriterStorage::Entry {
    IWriterStorage::Entry {
        createdAtBlock: U256::from(1),
        updatedAtBlock: U256::from(1),
        exists,
        author: AUTHOR,
        content: content.to_string(),
    }
}
