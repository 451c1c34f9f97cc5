use super::{FactoryHandler, Listener, ListenerContext, ListenerRegistry};
use crate::{
    chain::ChainClient,
    database::WriterDatabase,
    error::StoreError,
    relay::{Reconciler, RelayClient},
    settings::IndexerSettings,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Indexer {
    ctx: ListenerContext,
}

impl Indexer {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        db: WriterDatabase,
        relay: Option<Arc<dyn RelayClient>>,
        settings: IndexerSettings,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(relay, settings.chain_id));
        Self {
            ctx: ListenerContext::new(chain, db, reconciler, Arc::new(settings)),
        }
    }

    /// Restores storage listeners of every known writer before the factory
    /// listener starts, so no writer created while offline is missed.
    pub async fn start(self) -> Result<IndexerHandle, StoreError> {
        let shutdown = CancellationToken::new();
        let registry = ListenerRegistry::new(self.ctx.clone(), shutdown.clone());

        let restored = registry.bootstrap().await?;
        tracing::info!(restored, "restored storage listeners");

        let factory = Listener::new(
            FactoryHandler::new(self.ctx.clone(), registry.clone()),
            self.ctx.clone(),
            self.ctx.settings.factory_start_block,
            shutdown.child_token(),
        );
        let factory = tokio::spawn(factory.run());
        tracing::info!(
            factory = %self.ctx.settings.factory_address,
            start_block = self.ctx.settings.factory_start_block,
            "indexer started"
        );

        Ok(IndexerHandle {
            registry,
            shutdown,
            factory,
        })
    }
}

pub struct IndexerHandle {
    registry: ListenerRegistry,
    shutdown: CancellationToken,
    factory: JoinHandle<()>,
}

impl IndexerHandle {
    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    /// Cancels every listener and waits until in-flight batches are stored.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(err) = self.factory.await {
            tracing::error!(err = %err, "factory listener task failed");
        }
        self.registry.shutdown().await;
        tracing::info!("indexer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        content::compress,
        provenance::CorrelationId,
        settings::LogFetcherSettings,
        test_utils::{
            fixtures::{
                EntryEvent, FACTORY, STORAGE, WRITER, entry_log, relay_call_data, stored_entry,
                tx_hash, writer_created_log,
            },
            init_memory_db,
            mock_chain::MockChainClient,
            mock_relay::MockRelayClient,
        },
        types::{EventProvenance, WriterRecord, address_to_string},
    };
    use alloy::primitives::Address;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use writer_indexer_entity::sea_orm_active_enums::TransactionStatus;

    const TOKEN: &str = "0f8fad5bd9cb469fa16570867728950e";

    fn settings() -> IndexerSettings {
        let mut settings = IndexerSettings::new(84532, FACTORY);
        settings.fetcher = LogFetcherSettings {
            window_size: 50,
            min_window_size: 1,
            poll_interval: Duration::from_millis(10),
            retry_delays: vec![Duration::ZERO],
        };
        settings.handler_retry_delays = vec![Duration::from_millis(5)];
        settings.restart_delay = Duration::from_millis(10);
        settings
    }

    async fn eventually<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        tokio::time::timeout(Duration::from_secs(10), async {
            while !check().await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("indexer did not reach the expected state in time");
    }

    #[tokio::test]
    async fn indexes_writer_and_its_entries() {
        let chain = MockChainClient::new(200);
        chain.push_log(writer_created_log(WRITER, STORAGE, "t", 120, tx_hash(1)));
        chain.set_transaction_input(tx_hash(1), relay_call_data(TOKEN));
        chain.push_log(entry_log(EntryEvent::Created, STORAGE, 1, 130, 0, tx_hash(2)));
        chain.set_entry(STORAGE, 1, stored_entry(&compress("hello").unwrap(), true));
        let db = init_memory_db().await;
        let relay = MockRelayClient::default();

        let handle = Indexer::new(
            Arc::new(chain.clone()),
            db.clone(),
            Some(Arc::new(relay.clone())),
            settings(),
        )
        .start()
        .await
        .unwrap();

        let storage = address_to_string(&STORAGE);
        let (db_ref, storage_ref) = (&db, storage.as_str());
        eventually(move || async move {
            db_ref.get_entry(storage_ref, 1).await.unwrap().is_some()
        })
        .await;

        let writer = db.get_writer(&address_to_string(&WRITER)).await.unwrap().unwrap();
        let id = CorrelationId::parse(TOKEN).unwrap();
        assert_eq!(writer.transaction_id.as_deref(), Some(id.as_str()));
        let transaction = db.get_transaction(id.as_str()).await.unwrap().unwrap();
        assert_eq!(transaction.status, TransactionStatus::Confirmed);
        assert_eq!(transaction.chain_id, 84532);
        assert_eq!(relay.requests(), vec![id]);
        assert!(handle.registry().is_active(STORAGE));

        let entry = db.get_entry(&storage, 1).await.unwrap().unwrap();
        assert_eq!(entry.content.as_deref(), Some("hello"));

        // a new entry after the backfill reaches the live listener
        chain.push_log(entry_log(EntryEvent::Removed, STORAGE, 1, 205, 0, tx_hash(3)));
        chain.set_block_number(210);
        eventually(move || async move {
            !db_ref.get_entry(storage_ref, 1).await.unwrap().unwrap().exists
        })
        .await;

        handle.shutdown().await;
        let checkpoint = db.get_checkpoint(&storage).await.unwrap().unwrap();
        assert!(checkpoint.block_number >= 205, "{checkpoint:?}");
    }

    #[tokio::test]
    async fn known_writers_are_listened_before_factory_events() {
        let chain = MockChainClient::new(50);
        let db = init_memory_db().await;
        let storage = Address::repeat_byte(0x42);
        db.upsert_writer(&WriterRecord {
            address: address_to_string(&Address::repeat_byte(0x41)),
            storage_address: address_to_string(&storage),
            title: "restored".to_string(),
            admin: address_to_string(&Address::repeat_byte(0xcc)),
            managers: vec![],
            provenance: EventProvenance {
                block_number: 10,
                log_index: 0,
                hash: None,
                block_datetime: None,
            },
            transaction_id: None,
        })
        .await
        .unwrap();

        let handle = Indexer::new(Arc::new(chain.clone()), db, None, settings())
            .start()
            .await
            .unwrap();

        assert_eq!(handle.registry().active_addresses(), vec![storage]);
        handle.shutdown().await;
    }
}
