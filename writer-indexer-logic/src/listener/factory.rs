use super::{ListenerContext, ListenerRegistry, LogHandler};
use crate::{
    chain::abi::IWriterFactory,
    error::IndexerError,
    types::{WriterRecord, address_to_string},
};
use alloy::{
    primitives::Address,
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
};
use async_trait::async_trait;

/// Indexes `WriterCreated` events and starts a storage listener for every new writer.
pub struct FactoryHandler {
    ctx: ListenerContext,
    registry: ListenerRegistry,
}

impl FactoryHandler {
    pub fn new(ctx: ListenerContext, registry: ListenerRegistry) -> Self {
        Self { ctx, registry }
    }
}

#[async_trait]
impl LogHandler for FactoryHandler {
    fn name(&self) -> &'static str {
        "factory"
    }

    fn address(&self) -> Address {
        self.ctx.settings.factory_address
    }

    fn filter(&self) -> Filter {
        Filter::new()
            .address(self.address())
            .event_signature(IWriterFactory::WriterCreated::SIGNATURE_HASH)
    }

    async fn handle_log(&self, log: &Log) -> Result<(), IndexerError> {
        let event = log.log_decode::<IWriterFactory::WriterCreated>()?.inner.data;
        let created_at_block = log
            .block_number
            .ok_or_else(|| IndexerError::MalformedLog("missing block number".to_string()))?;
        let provenance = self.ctx.provenance(log).await?;
        let transaction_id = self.ctx.resolve_transaction(log, &provenance).await?;

        let record = WriterRecord {
            address: address_to_string(&event.writerAddress),
            storage_address: address_to_string(&event.storeAddress),
            title: event.title,
            admin: address_to_string(&event.admin),
            managers: event.managers.iter().map(address_to_string).collect(),
            provenance,
            transaction_id,
        };
        self.ctx.db.upsert_writer(&record).await?;
        tracing::info!(
            writer = %record.address,
            storage = %record.storage_address,
            block_number = created_at_block,
            "writer indexed"
        );

        self.registry
            .spawn_storage_listener(event.storeAddress, created_at_block);
        Ok(())
    }
}
