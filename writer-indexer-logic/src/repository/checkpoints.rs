use super::now;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QuerySelect, TransactionTrait,
};
use writer_indexer_entity::listener_checkpoints::{ActiveModel, Entity, Model};

pub async fn find<C: ConnectionTrait>(db: &C, address: &str) -> Result<Option<Model>, DbErr> {
    Entity::find_by_id(address).one(db).await
}

/// Moves the checkpoint forward. A lower block than the stored one is ignored.
pub async fn save(
    db: &DatabaseConnection,
    address: &str,
    block_number: i64,
) -> Result<Model, DbErr> {
    let txn = db.begin().await?;
    let existing = Entity::find_by_id(address)
        .lock_exclusive()
        .one(&txn)
        .await?;
    let now = now();
    let model = match existing {
        Some(existing) if existing.block_number >= block_number => existing,
        Some(existing) => {
            let mut active: ActiveModel = existing.into();
            active.block_number = Set(block_number);
            active.updated_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            ActiveModel {
                address: Set(address.to_string()),
                block_number: Set(block_number),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?
        }
    };
    txn.commit().await?;
    Ok(model)
}
