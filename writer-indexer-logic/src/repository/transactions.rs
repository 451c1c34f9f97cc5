use super::{coalesce, now};
use crate::types::TransactionRecord;
use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QuerySelect, TransactionTrait,
};
use writer_indexer_entity::{
    sea_orm_active_enums::TransactionStatus,
    transactions::{Entity, Model},
};

pub async fn upsert(db: &DatabaseConnection, record: &TransactionRecord) -> Result<Model, DbErr> {
    let txn = db.begin().await?;
    let existing = Entity::find_by_id(record.id.as_str())
        .lock_exclusive()
        .one(&txn)
        .await?;
    let now = now();
    let model = match existing {
        Some(existing) => {
            merge(existing, record, now)
                .into_active_model()
                .reset_all()
                .update(&txn)
                .await?
        }
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

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: &str) -> Result<Option<Model>, DbErr> {
    Entity::find_by_id(id).one(db).await
}

fn new_model(record: &TransactionRecord, now: NaiveDateTime) -> Model {
    Model {
        id: record.id.to_string(),
        chain_id: record.chain_id,
        block_number: record.block_number,
        hash: record.hash.clone(),
        status: record.status,
        function_signature: record.function_signature.clone(),
        args: record.args.clone(),
        created_at: now,
        updated_at: now,
    }
}

/// Applies a new observation of the transaction. A confirmed transaction is
/// never downgraded and its inclusion block never moves backward.
pub fn merge(existing: Model, record: &TransactionRecord, now: NaiveDateTime) -> Model {
    let mut model = existing;
    model.chain_id = record.chain_id;

    let moves_backward = matches!(
        (model.block_number, record.block_number),
        (Some(stored), Some(incoming)) if incoming < stored
    );
    if !moves_backward {
        coalesce(&mut model.block_number, &record.block_number);
        coalesce(&mut model.hash, &record.hash);
    }

    let downgrades = model.status == TransactionStatus::Confirmed
        && record.status != TransactionStatus::Confirmed;
    if !downgrades {
        model.status = record.status;
    }

    coalesce(&mut model.function_signature, &record.function_signature);
    coalesce(&mut model.args, &record.args);
    model.updated_at = now;
    model
}
