use crate::{
    error::{StoreError, is_unique_violation},
    repository::{checkpoints, entries, transactions, writers},
    types::{EntryRecord, TransactionRecord, WriterRecord},
};
use sea_orm::{DatabaseConnection, DbErr};
use std::{future::Future, sync::Arc};
use writer_indexer_entity::{
    entries as entries_entity, listener_checkpoints, transactions as transactions_entity,
    writers as writers_entity,
};

#[derive(Clone)]
pub struct WriterDatabase {
    pub db: Arc<DatabaseConnection>,
}

impl WriterDatabase {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn upsert_transaction(
        &self,
        record: &TransactionRecord,
    ) -> Result<transactions_entity::Model, StoreError> {
        retry_on_conflict("transaction", record.id.as_str(), || {
            transactions::upsert(&self.db, record)
        })
        .await
    }

    pub async fn upsert_writer(
        &self,
        record: &WriterRecord,
    ) -> Result<writers_entity::Model, StoreError> {
        retry_on_conflict("writer", &record.address, || {
            writers::upsert(&self.db, record)
        })
        .await
    }

    pub async fn upsert_entry(
        &self,
        record: &EntryRecord,
    ) -> Result<entries_entity::Model, StoreError> {
        let key = format!("{}/{}", record.storage_address, record.on_chain_id);
        retry_on_conflict("entry", &key, || entries::upsert(&self.db, record)).await
    }

    pub async fn get_writer(
        &self,
        address: &str,
    ) -> Result<Option<writers_entity::Model>, StoreError> {
        Ok(writers::find_by_address(self.db.as_ref(), address).await?)
    }

    pub async fn get_writer_by_storage(
        &self,
        storage_address: &str,
    ) -> Result<Option<writers_entity::Model>, StoreError> {
        Ok(writers::find_by_storage_address(self.db.as_ref(), storage_address).await?)
    }

    pub async fn list_writers_by_admin(
        &self,
        admin: &str,
    ) -> Result<Vec<writers_entity::Model>, StoreError> {
        Ok(writers::list_by_admin(self.db.as_ref(), admin).await?)
    }

    pub async fn list_writers(&self) -> Result<Vec<writers_entity::Model>, StoreError> {
        match writers::list_all(self.db.as_ref()).await {
            Ok(writers) => Ok(writers),
            Err(err) => {
                tracing::error!(err = ?err, "failed to fetch writers");
                Err(err.into())
            }
        }
    }

    pub async fn get_entry(
        &self,
        storage_address: &str,
        on_chain_id: i64,
    ) -> Result<Option<entries_entity::Model>, StoreError> {
        Ok(entries::find_by_key(self.db.as_ref(), storage_address, on_chain_id).await?)
    }

    pub async fn list_entries(
        &self,
        storage_address: &str,
    ) -> Result<Vec<entries_entity::Model>, StoreError> {
        Ok(entries::list_by_storage(self.db.as_ref(), storage_address).await?)
    }

    pub async fn get_transaction(
        &self,
        id: &str,
    ) -> Result<Option<transactions_entity::Model>, StoreError> {
        Ok(transactions::find_by_id(self.db.as_ref(), id).await?)
    }

    pub async fn get_checkpoint(
        &self,
        address: &str,
    ) -> Result<Option<listener_checkpoints::Model>, StoreError> {
        Ok(checkpoints::find(self.db.as_ref(), address).await?)
    }

    pub async fn save_checkpoint(
        &self,
        address: &str,
        block_number: u64,
    ) -> Result<listener_checkpoints::Model, StoreError> {
        let block_number = i64::try_from(block_number).unwrap_or(i64::MAX);
        Ok(checkpoints::save(&self.db, address, block_number).await?)
    }
}

/// Runs an upsert, retrying once if a concurrent writer inserted the same key
/// between our lookup and insert. A second violation means two aggregates map
/// to one key.
async fn retry_on_conflict<T, F, Fut>(
    entity: &'static str,
    key: &str,
    mut upsert: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    match upsert().await {
        Ok(model) => return Ok(model),
        Err(err) if is_unique_violation(&err) => {
            tracing::debug!(entity, key, err = ?err, "unique violation on upsert, retrying");
        }
        Err(err) => return Err(err.into()),
    }

    match upsert().await {
        Ok(model) => Ok(model),
        Err(err) if is_unique_violation(&err) => {
            tracing::error!(
                entity,
                key,
                err = ?err,
                "unique key conflict persisted after retry, aggregates collide"
            );
            Err(StoreError::Conflict {
                entity,
                key: key.to_string(),
                source: err,
            })
        }
        Err(err) => Err(err.into()),
    }
}
