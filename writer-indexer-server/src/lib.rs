mod indexer;
mod settings;

pub use indexer::start_indexer;
pub use settings::Settings;
