use blockscout_service_launcher::{
    database::DatabaseSettings,
    launcher::ConfigSettings,
    tracing::{JaegerSettings, TracingSettings},
};
use serde::{Deserialize, Serialize};
use url::Url;
use writer_indexer_logic::{IndexerSettings, relay::RelaySettings};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// JSON-RPC endpoint of the chain the writer factory is deployed on.
    pub rpc_url: Url,
    pub indexer: IndexerSettings,
    #[serde(default)]
    pub relay: RelaySettings,
    pub database: DatabaseSettings,

    #[serde(default)]
    pub tracing: TracingSettings,
    #[serde(default)]
    pub jaeger: JaegerSettings,
}

impl ConfigSettings for Settings {
    const SERVICE_NAME: &'static str = "WRITER_INDEXER";
}
