use anyhow::Context;
use blockscout_service_launcher::{database, launcher::ConfigSettings};
use migration::Migrator;
use tokio::signal::unix::{SignalKind, signal};
use writer_indexer_server::{Settings, start_indexer};

const SERVICE_NAME: &str = "writer_indexer";

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let settings = Settings::build().context("failed to read config")?;

    blockscout_service_launcher::tracing::init_logs(
        SERVICE_NAME,
        &settings.tracing,
        &settings.jaeger,
    )?;

    let db_connection = database::initialize_postgres::<Migrator>(&settings.database).await?;
    let handle = start_indexer(&settings, db_connection).await?;

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl-c")?;
            tracing::warn!("interrupted, shutting down");
        }
        _ = terminate.recv() => {
            tracing::warn!("got terminate signal, shutting down");
        }
    }

    handle.shutdown().await;
    Ok(())
}
