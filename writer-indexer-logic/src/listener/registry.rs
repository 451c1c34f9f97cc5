use super::{Listener, ListenerContext, StorageHandler};
use crate::error::StoreError;
use alloy::primitives::Address;
use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct RegisteredListener {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct RegistryInner {
    ctx: ListenerContext,
    listeners: DashMap<Address, RegisteredListener>,
    shutdown: CancellationToken,
}

/// Storage listeners currently running, keyed by storage contract address.
#[derive(Clone)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

impl ListenerRegistry {
    /// Every spawned listener is cancelled together with `shutdown`.
    pub fn new(ctx: ListenerContext, shutdown: CancellationToken) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                ctx,
                listeners: DashMap::new(),
                shutdown,
            }),
        }
    }

    /// Returns `false` if a listener for `address` is already registered.
    pub fn spawn_storage_listener(&self, address: Address, start_block: u64) -> bool {
        match self.inner.listeners.entry(address) {
            Entry::Occupied(_) => {
                tracing::debug!(address = %address, "storage listener already running");
                false
            }
            Entry::Vacant(vacant) => {
                let cancel = self.inner.shutdown.child_token();
                let ctx = self.inner.ctx.clone();
                let listener = Listener::new(
                    StorageHandler::new(ctx.clone(), address),
                    ctx,
                    start_block,
                    cancel.clone(),
                );
                let handle = tokio::spawn(listener.run());
                vacant.insert(RegisteredListener { cancel, handle });
                tracing::info!(address = %address, start_block, "spawned storage listener");
                true
            }
        }
    }

    /// Stops the listener for `address` and waits for its in-flight batch.
    pub async fn cancel(&self, address: Address) -> bool {
        let Some((_, listener)) = self.inner.listeners.remove(&address) else {
            return false;
        };
        stop(address, listener).await;
        true
    }

    /// Starts a storage listener for every writer in the store.
    pub async fn bootstrap(&self) -> Result<usize, StoreError> {
        let writers = self.inner.ctx.db.list_writers().await?;
        let mut spawned = 0;
        for writer in writers {
            let address = match writer.storage_address.parse::<Address>() {
                Ok(address) => address,
                Err(err) => {
                    tracing::error!(
                        err = %err,
                        writer = %writer.address,
                        storage = %writer.storage_address,
                        "invalid storage address in store, skipping"
                    );
                    continue;
                }
            };
            if self.spawn_storage_listener(address, writer.validated_created_at_block()) {
                spawned += 1;
            }
        }
        Ok(spawned)
    }

    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let addresses = self.active_addresses();
        for address in addresses {
            if let Some((_, listener)) = self.inner.listeners.remove(&address) {
                stop(address, listener).await;
            }
        }
    }

    pub fn is_active(&self, address: Address) -> bool {
        self.inner
            .listeners
            .get(&address)
            .is_some_and(|listener| !listener.handle.is_finished())
    }

    pub fn active_addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self
            .inner
            .listeners
            .iter()
            .map(|listener| *listener.key())
            .collect();
        addresses.sort();
        addresses
    }
}

async fn stop(address: Address, listener: RegisteredListener) {
    listener.cancel.cancel();
    if let Err(err) = listener.handle.await {
        tracing::error!(err = %err, address = %address, "storage listener task failed");
    }
}
