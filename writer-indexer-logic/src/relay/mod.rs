mod client;
mod reconciler;
pub mod settings;

pub use client::{
    HttpRelayClient, RelayClient, RelayError, RelayTransactionAttempt, RelayTransactionRequest,
};
pub use reconciler::{OnChainObservation, Reconciler};
pub use settings::RelaySettings;
