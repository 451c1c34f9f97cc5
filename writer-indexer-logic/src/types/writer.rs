use super::EventProvenance;
use crate::provenance::CorrelationId;

#[derive(Clone, Debug, PartialEq)]
pub struct WriterRecord {
    pub address: String,
    pub storage_address: String,
    pub title: String,
    pub admin: String,
    pub managers: Vec<String>,
    pub provenance: EventProvenance,
    pub transaction_id: Option<CorrelationId>,
}
