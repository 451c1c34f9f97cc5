use super::{coalesce, now};
use crate::types::WriterRecord;
use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use writer_indexer_entity::writers::{Column, Entity, Model};

pub async fn upsert(db: &DatabaseConnection, record: &WriterRecord) -> Result<Model, DbErr> {
    let txn = db.begin().await?;
    let existing = Entity::find_by_id(record.address.as_str())
        .lock_exclusive()
        .one(&txn)
        .await?;
    let now = now();
    let model = match existing {
        Some(existing) => match merge(existing, record, now) {
            Merge::Unchanged(model) => model,
            Merge::Updated(model) => {
                model
                    .into_active_model()
                    .reset_all()
                    .update(&txn)
                    .await?
            }
        },
        None => {
            new_model(record, now)
                .into_active_model()
                .reset_all()
                .insert(&txn)
                .await?
        }
    };
    txn.commit().await?;
    Ok(model)
}

pub async fn find_by_address<C: ConnectionTrait>(
    db: &C,
    address: &str,
) -> Result<Option<Model>, DbErr> {
    Entity::find_by_id(address).one(db).await
}

pub async fn find_by_storage_address<C: ConnectionTrait>(
    db: &C,
    storage_address: &str,
) -> Result<Option<Model>, DbErr> {
    Entity::find()
        .filter(Column::StorageAddress.eq(storage_address))
        .one(db)
        .await
}

pub async fn list_by_admin<C: ConnectionTrait>(db: &C, admin: &str) -> Result<Vec<Model>, DbErr> {
    Entity::find()
        .filter(Column::Admin.eq(admin))
        .order_by_asc(Column::CreatedAtBlock)
        .order_by_asc(Column::Address)
        .all(db)
        .await
}

pub async fn list_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, DbErr> {
    Entity::find()
        .order_by_asc(Column::CreatedAtBlock)
        .order_by_asc(Column::Address)
        .all(db)
        .await
}

#[derive(Debug, PartialEq)]
pub enum Merge {
    Unchanged(Model),
    Updated(Model),
}

fn new_model(record: &WriterRecord, now: NaiveDateTime) -> Model {
    Model {
        address: record.address.clone(),
        storage_address: record.storage_address.clone(),
        title: record.title.clone(),
        admin: record.admin.clone(),
        managers: managers_json(&record.managers),
        created_at_hash: record.provenance.hash.clone(),
        created_at_block: Some(record.provenance.block_number),
        created_at_block_datetime: record.provenance.block_datetime,
        transaction_id: record.transaction_id.as_ref().map(|id| id.to_string()),
        created_at: now,
        updated_at: now,
    }
}

/// A writer is created exactly once on chain, so an observation from an
/// earlier block than the stored one is stale and ignored.
pub fn merge(existing: Model, record: &WriterRecord, now: NaiveDateTime) -> Merge {
    if let Some(stored) = existing.created_at_block
        && record.provenance.block_number < stored
    {
        return Merge::Unchanged(existing);
    }

    let mut model = existing;
    model.storage_address.clone_from(&record.storage_address);
    model.title.clone_from(&record.title);
    model.admin.clone_from(&record.admin);
    model.managers = managers_json(&record.managers);
    model.created_at_block = Some(record.provenance.block_number);
    coalesce(&mut model.created_at_hash, &record.provenance.hash);
    coalesce(
        &mut model.created_at_block_datetime,
        &record.provenance.block_datetime,
    );
    coalesce(
        &mut model.transaction_id,
        &record.transaction_id.as_ref().map(|id| id.to_string()),
    );
    model.updated_at = now;
    Merge::Updated(model)
}

fn managers_json(managers: &[String]) -> serde_json::Value {
    serde_json::Value::from(managers.to_vec())
}
