pub mod chain;
pub mod content;
mod database;
mod error;
mod listener;
pub mod log_fetcher;
pub mod provenance;
pub mod relay;
mod repository;
pub mod settings;
#[cfg(test)]
pub mod test_utils;
pub mod types;

pub use database::*;
pub use error::{IndexerError, StoreError};
pub use listener::*;
pub use settings::{IndexerSettings, LogFetcherSettings};
