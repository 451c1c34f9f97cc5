use crate::database::WriterDatabase;
use blockscout_service_launcher::test_database::TestDbGuard;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DbBackend, EntityTrait, Schema, sea_query::Index,
};
use std::sync::Arc;
use writer_indexer_entity::{entries, listener_checkpoints, transactions, writers};

pub mod fixtures;
pub mod mock_chain;
pub mod mock_relay;

pub async fn init_db(name: &str) -> TestDbGuard {
    TestDbGuard::new::<migration::Migrator>(name).await
}

/// Fresh in-memory SQLite store with the schema derived from the entities.
pub async fn init_memory_db() -> WriterDatabase {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();

    let backend = db.get_database_backend();
    let schema = Schema::new(DbBackend::Sqlite);
    create_table(&db, &schema, transactions::Entity).await;
    create_table(&db, &schema, writers::Entity).await;
    create_table(&db, &schema, entries::Entity).await;
    create_table(&db, &schema, listener_checkpoints::Entity).await;

    let entry_key = Index::create()
        .name("entries_on_chain_id_storage_address_key")
        .table(entries::Entity)
        .col(entries::Column::OnChainId)
        .col(entries::Column::StorageAddress)
        .unique()
        .to_owned();
    db.execute(backend.build(&entry_key)).await.unwrap();

    WriterDatabase::new(Arc::new(db))
}

async fn create_table<E: EntityTrait>(
    db: &sea_orm::DatabaseConnection,
    schema: &Schema,
    entity: E,
) {
    let statement = schema.create_table_from_entity(entity);
    db.execute(db.get_database_backend().build(&statement))
        .await
        .unwrap();
}
