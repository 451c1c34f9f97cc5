use super::{coalesce, fill, now};
use crate::types::{EntryRecord, EntryTransition};
use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbErr, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use writer_indexer_entity::entries::{Column, Entity, Model};

pub async fn upsert(db: &DatabaseConnection, record: &EntryRecord) -> Result<Model, DbErr> {
    let txn = db.begin().await?;
    let existing = find_existing(&txn, record).await?;
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
            let mut active = new_model(record, now).into_active_model().reset_all();
            active.id = NotSet;
            active.insert(&txn).await?
        }
    };
    txn.commit().await?;
    Ok(model)
}

/// The row that already recorded this transition's transaction wins over the
/// composite key, so a replayed event lands on the row it wrote before.
async fn find_existing<C: ConnectionTrait>(
    db: &C,
    record: &EntryRecord,
) -> Result<Option<Model>, DbErr> {
    if let Some(transaction_id) = &record.transaction_id {
        let by_transaction = Entity::find()
            .filter(transaction_column(record.transition).eq(transaction_id.as_str()))
            .lock_exclusive()
            .one(db)
            .await?;
        if by_transaction.is_some() {
            return Ok(by_transaction);
        }
    }

    Entity::find()
        .filter(Column::OnChainId.eq(record.on_chain_id))
        .filter(Column::StorageAddress.eq(record.storage_address.as_str()))
        .lock_exclusive()
        .one(db)
        .await
}

pub async fn find_by_key<C: ConnectionTrait>(
    db: &C,
    storage_address: &str,
    on_chain_id: i64,
) -> Result<Option<Model>, DbErr> {
    Entity::find()
        .filter(Column::OnChainId.eq(on_chain_id))
        .filter(Column::StorageAddress.eq(storage_address))
        .one(db)
        .await
}

/// Entries that still exist on chain, by on-chain id.
pub async fn list_by_storage<C: ConnectionTrait>(
    db: &C,
    storage_address: &str,
) -> Result<Vec<Model>, DbErr> {
    Entity::find()
        .filter(Column::StorageAddress.eq(storage_address))
        .filter(Column::Exists.eq(true))
        .order_by_asc(Column::OnChainId)
        .all(db)
        .await
}

fn transaction_column(transition: EntryTransition) -> Column {
    match transition {
        EntryTransition::Created => Column::CreatedAtTransactionId,
        EntryTransition::Updated => Column::UpdatedAtTransactionId,
        EntryTransition::Removed => Column::DeletedAtTransactionId,
    }
}

fn new_model(record: &EntryRecord, now: NaiveDateTime) -> Model {
    let mut model = Model {
        id: 0,
        exists: false,
        on_chain_id: record.on_chain_id,
        storage_address: record.storage_address.clone(),
        raw: None,
        content: None,
        version: None,
        author: None,
        created_at_hash: None,
        created_at_block: None,
        created_at_block_datetime: None,
        created_at_transaction_id: None,
        updated_at_hash: None,
        updated_at_block: None,
        updated_at_block_datetime: None,
        updated_at_transaction_id: None,
        deleted_at_hash: None,
        deleted_at_block: None,
        deleted_at_block_datetime: None,
        deleted_at_transaction_id: None,
        last_event_block: None,
        last_event_log_index: None,
        created_at: now,
        updated_at: now,
    };
    apply(&mut model, record);
    model
}

/// Content follows the latest Created or Updated event by
/// `(block_number, log_index)`. Transition fields follow the latest event of
/// that transition, and an older event only fills what is still missing.
pub fn merge(existing: Model, record: &EntryRecord, now: NaiveDateTime) -> Model {
    let mut model = existing;
    apply(&mut model, record);
    model.updated_at = now;
    model
}

fn apply(model: &mut Model, record: &EntryRecord) {
    if record.transition != EntryTransition::Removed {
        let position = record.provenance.position();
        if model
            .last_event_position()
            .is_none_or(|stored| position >= stored)
        {
            write_content(model, record);
            model.exists = record.exists;
            model.last_event_block = Some(position.0);
            model.last_event_log_index = Some(position.1);
        }
    }
    write_transition(model, record);

    // a removal in the same block as the latest write wins
    if let Some(deleted) = model.deleted_at_block
        && model
            .last_event_block
            .is_none_or(|written| deleted >= written)
    {
        model.exists = false;
    }
}

/// `content` and `version` are derived from `raw`, so the three are replaced
/// together. A record without `raw` carries no content at all.
fn write_content(model: &mut Model, record: &EntryRecord) {
    if record.raw.is_some() {
        model.raw.clone_from(&record.raw);
        model.content.clone_from(&record.content);
        model.version.clone_from(&record.version);
    }
    coalesce(&mut model.author, &record.author);
}

fn write_transition(model: &mut Model, record: &EntryRecord) {
    let incoming = TransitionValues::from_record(record);
    let slot = TransitionSlot::of(model, record.transition);
    let newer = slot
        .block
        .is_none_or(|stored| record.provenance.block_number >= stored);

    overwrite_or_fill(newer, slot.hash, &incoming.hash);
    overwrite_or_fill(newer, slot.block, &incoming.block);
    overwrite_or_fill(newer, slot.block_datetime, &incoming.block_datetime);
    overwrite_or_fill(newer, slot.transaction_id, &incoming.transaction_id);
}

fn overwrite_or_fill<T: Clone>(newer: bool, target: &mut Option<T>, incoming: &Option<T>) {
    if newer {
        coalesce(target, incoming)
    } else {
        fill(target, incoming)
    }
}

struct TransitionSlot<'a> {
    hash: &'a mut Option<String>,
    block: &'a mut Option<i64>,
    block_datetime: &'a mut Option<NaiveDateTime>,
    transaction_id: &'a mut Option<String>,
}

impl<'a> TransitionSlot<'a> {
    fn of(model: &'a mut Model, transition: EntryTransition) -> Self {
        match transition {
            EntryTransition::Created => Self {
                hash: &mut model.created_at_hash,
                block: &mut model.created_at_block,
                block_datetime: &mut model.created_at_block_datetime,
                transaction_id: &mut model.created_at_transaction_id,
            },
            EntryTransition::Updated => Self {
                hash: &mut model.updated_at_hash,
                block: &mut model.updated_at_block,
                block_datetime: &mut model.updated_at_block_datetime,
                transaction_id: &mut model.updated_at_transaction_id,
            },
            EntryTransition::Removed => Self {
                hash: &mut model.deleted_at_hash,
                block: &mut model.deleted_at_block,
                block_datetime: &mut model.deleted_at_block_datetime,
                transaction_id: &mut model.deleted_at_transaction_id,
            },
        }
    }
}

struct TransitionValues {
    hash: Option<String>,
    block: Option<i64>,
    block_datetime: Option<NaiveDateTime>,
    transaction_id: Option<String>,
}

impl TransitionValues {
    fn from_record(record: &EntryRecord) -> Self {
        Self {
            hash: record.provenance.hash.clone(),
            block: Some(record.provenance.block_number),
            block_datetime: record.provenance.block_datetime,
            transaction_id: record.transaction_id.as_ref().map(|id| id.to_string()),
        }
    }
}
