mod context;
mod factory;
mod indexer;
mod registry;
mod runner;
mod storage;

pub use context::ListenerContext;
pub use factory::FactoryHandler;
pub use indexer::{Indexer, IndexerHandle};
pub use registry::ListenerRegistry;
pub use runner::{Listener, LogHandler};
pub use storage::StorageHandler;
