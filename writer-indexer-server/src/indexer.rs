use crate::Settings;
use anyhow::Context;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use url::Url;
use writer_indexer_logic::{
    Indexer, IndexerHandle, WriterDatabase,
    chain::{AlloyChainClient, ChainClient},
    relay::{HttpRelayClient, RelayClient},
};

pub async fn start_indexer(
    settings: &Settings,
    db_connection: DatabaseConnection,
) -> Result<IndexerHandle, anyhow::Error> {
    let chain: Arc<dyn ChainClient> = Arc::new(connect_chain(settings.rpc_url.clone()));
    let relay = HttpRelayClient::from_settings(&settings.relay)
        .context("invalid relay settings")?
        .map(|client| Arc::new(client) as Arc<dyn RelayClient>);
    if relay.is_none() {
        tracing::warn!("relay is disabled, transactions will carry on-chain fields only");
    }

    let db = WriterDatabase::new(Arc::new(db_connection));
    let indexer = Indexer::new(chain, db, relay, settings.indexer.clone());
    let handle = indexer
        .start()
        .await
        .context("failed to restore storage listeners")?;

    tracing::info!(
        storage_listeners = handle.registry().active_addresses().len(),
        "writer indexer is running"
    );
    Ok(handle)
}

fn connect_chain(rpc_url: Url) -> AlloyChainClient {
    tracing::info!(rpc_url = %rpc_url, "connecting to chain");
    AlloyChainClient::connect_http(rpc_url)
}
