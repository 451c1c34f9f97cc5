use crate::chain::ChainError;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("db error: {0}")]
    Db(#[from] DbErr),
    /// Two different aggregates resolved to the same unique key. The natural-key
    /// lookup should make this impossible, so it is never retried further.
    #[error("unique key conflict on {entity} {key}: {source}")]
    Conflict {
        entity: &'static str,
        key: String,
        #[source]
        source: DbErr,
    },
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("abi decode error: {0}")]
    Abi(#[from] alloy::sol_types::Error),
    #[error("malformed log: {0}")]
    MalformedLog(String),
}

impl IndexerError {
    /// Whether handling the same log again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            IndexerError::Chain(_) => true,
            IndexerError::Store(StoreError::Db(_)) => true,
            IndexerError::Store(StoreError::Conflict { .. })
            | IndexerError::Abi(_)
            | IndexerError::MalformedLog(_) => false,
        }
    }
}

impl From<DbErr> for IndexerError {
    fn from(err: DbErr) -> Self {
        IndexerError::Store(StoreError::Db(err))
    }
}
