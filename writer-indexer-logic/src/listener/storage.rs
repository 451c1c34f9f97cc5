use super::{ListenerContext, LogHandler};
use crate::{
    chain::abi::IWriterStorage,
    content::{self, NormalizedContent},
    error::IndexerError,
    provenance::CorrelationId,
    types::{EntryRecord, EntryTransition, EventProvenance, address_to_string},
};
use alloy::{
    primitives::{Address, U256},
    rpc::types::{Filter, Log},
    sol_types::{SolCall, SolEvent, SolValue},
};
use async_trait::async_trait;

/// Indexes the entry lifecycle of one writer storage contract.
pub struct StorageHandler {
    ctx: ListenerContext,
    address: Address,
}

impl StorageHandler {
    pub fn new(ctx: ListenerContext, address: Address) -> Self {
        Self { ctx, address }
    }

    async fn read_entry(&self, id: U256) -> Result<IWriterStorage::Entry, IndexerError> {
        let input = IWriterStorage::getEntryCall { id }.abi_encode();
        let output = self.ctx.chain.call(self.address, input.into()).await?;
        Ok(IWriterStorage::Entry::abi_decode(&output)?)
    }

    async fn written_entry(
        &self,
        id: U256,
        on_chain_id: i64,
        transition: EntryTransition,
        provenance: EventProvenance,
        transaction_id: Option<CorrelationId>,
    ) -> Result<EntryRecord, IndexerError> {
        let entry = self.read_entry(id).await?;
        let storage_address = address_to_string(&self.address);
        if !entry.exists {
            tracing::debug!(on_chain_id, "entry no longer exists on chain");
            return Ok(EntryRecord {
                transition,
                ..EntryRecord::removed(on_chain_id, storage_address, provenance, transaction_id)
            });
        }

        let normalized = content::normalize(&entry.content).unwrap_or_else(|err| {
            tracing::warn!(
                err = %err,
                on_chain_id,
                "failed to decode entry content, storing raw value only"
            );
            NormalizedContent::default()
        });
        Ok(EntryRecord {
            on_chain_id,
            storage_address,
            transition,
            provenance,
            transaction_id,
            exists: true,
            raw: Some(entry.content),
            content: normalized.content,
            version: normalized.version,
            author: Some(address_to_string(&entry.author)),
        })
    }
}

#[async_trait]
impl LogHandler for StorageHandler {
    fn name(&self) -> &'static str {
        "storage"
    }

    fn address(&self) -> Address {
        self.address
    }

    fn filter(&self) -> Filter {
        Filter::new().address(self.address).event_signature(vec![
            IWriterStorage::EntryCreated::SIGNATURE_HASH,
            IWriterStorage::EntryUpdated::SIGNATURE_HASH,
            IWriterStorage::EntryRemoved::SIGNATURE_HASH,
        ])
    }

    async fn handle_log(&self, log: &Log) -> Result<(), IndexerError> {
        let topic0 = log
            .topics()
            .first()
            .copied()
            .ok_or_else(|| IndexerError::MalformedLog("log without topics".to_string()))?;
        let (transition, id) = if topic0 == IWriterStorage::EntryCreated::SIGNATURE_HASH {
            let event = log.log_decode::<IWriterStorage::EntryCreated>()?.inner.data;
            (EntryTransition::Created, event.id)
        } else if topic0 == IWriterStorage::EntryUpdated::SIGNATURE_HASH {
            let event = log.log_decode::<IWriterStorage::EntryUpdated>()?.inner.data;
            (EntryTransition::Updated, event.id)
        } else if topic0 == IWriterStorage::EntryRemoved::SIGNATURE_HASH {
            let event = log.log_decode::<IWriterStorage::EntryRemoved>()?.inner.data;
            (EntryTransition::Removed, event.id)
        } else {
            return Err(IndexerError::MalformedLog(format!("unexpected event {topic0}")));
        };
        let on_chain_id = on_chain_id(id)?;

        let provenance = self.ctx.provenance(log).await?;
        let transaction_id = self.ctx.resolve_transaction(log, &provenance).await?;
        let record = match transition {
            EntryTransition::Removed => EntryRecord::removed(
                on_chain_id,
                address_to_string(&self.address),
                provenance,
                transaction_id,
            ),
            EntryTransition::Created | EntryTransition::Updated => {
                self.written_entry(id, on_chain_id, transition, provenance, transaction_id)
                    .await?
            }
        };

        let stored = self.ctx.db.upsert_entry(&record).await?;
        tracing::info!(
            on_chain_id,
            transition = transition.as_str(),
            exists = stored.exists,
            "entry indexed"
        );
        Ok(())
    }
}

fn on_chain_id(id: U256) -> Result<i64, IndexerError> {
    if id > U256::from(i64::MAX) {
        return Err(IndexerError::MalformedLog(format!(
            "entry id {id} does not fit into i64"
        )));
    }
    Ok(id.as_limbs()[0] as i64)
}
