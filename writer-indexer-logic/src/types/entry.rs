use super::EventProvenance;
use crate::provenance::CorrelationId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryTransition {
    Created,
    Updated,
    Removed,
}

impl EntryTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryTransition::Created => "created",
            EntryTransition::Updated => "updated",
            EntryTransition::Removed => "removed",
        }
    }
}

/// One lifecycle event of an entry together with the entry state read from
/// chain when the event was handled. Removals carry no content.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryRecord {
    pub on_chain_id: i64,
    pub storage_address: String,
    pub transition: EntryTransition,
    pub provenance: EventProvenance,
    pub transaction_id: Option<CorrelationId>,
    pub exists: bool,
    pub raw: Option<String>,
    pub content: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
}

impl EntryRecord {
    pub fn removed(
        on_chain_id: i64,
        storage_address: String,
        provenance: EventProvenance,
        transaction_id: Option<CorrelationId>,
    ) -> Self {
        Self {
            on_chain_id,
            storage_address,
            transition: EntryTransition::Removed,
            provenance,
            transaction_id,
            exists: false,
            raw: None,
            content: None,
            version: None,
            author: None,
        }
    }
}
