use crate::{
    chain::{ChainClient, ChainError},
    settings::LogFetcherSettings,
};
use alloy::rpc::types::{Filter, Log};
use futures::Stream;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Logs of one inclusive block window.
#[derive(Clone, Debug)]
pub struct LogBatch {
    pub from_block: u64,
    pub to_block: u64,
    pub logs: Vec<Log>,
}

/// Position of a windowed walk over one inclusive block range.
struct Windows {
    next_from: u64,
    to_block: u64,
    window: u64,
    min_window: u64,
    max_window: u64,
    done: bool,
}

/// Walks block ranges in bounded windows so no single `eth_getLogs` call
/// exceeds what the provider is willing to serve.
#[derive(Clone)]
pub struct LogFetcher {
    client: Arc<dyn ChainClient>,
    settings: LogFetcherSettings,
    cancel: CancellationToken,
}

impl LogFetcher {
    pub fn new(client: Arc<dyn ChainClient>, settings: LogFetcherSettings) -> Self {
        Self::with_cancellation(client, settings, CancellationToken::new())
    }

    /// Backfill stops between windows and the watch stream ends once `cancel` fires.
    pub fn with_cancellation(
        client: Arc<dyn ChainClient>,
        settings: LogFetcherSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            settings,
            cancel,
        }
    }

    pub async fn latest_block(&self) -> Result<u64, ChainError> {
        with_retries(&self.settings.retry_delays, "latest block number", || {
            self.client.get_block_number()
        })
        .await
    }

    /// Walks `[from_block, head]` and returns the head it walked to.
    pub async fn fetch_history<F, Fut>(
        &self,
        from_block: u64,
        filter: &Filter,
        on_logs: F,
    ) -> Result<u64, ChainError>
    where
        F: FnMut(LogBatch) -> Fut,
        Fut: Future<Output = ()>,
    {
        let head = self.latest_block().await?;
        self.fetch_range(from_block, head, filter, on_logs).await?;
        Ok(head)
    }

    /// `on_logs` is awaited for every window with at least one log, before
    /// the next window is requested.
    pub async fn fetch_range<F, Fut>(
        &self,
        from_block: u64,
        to_block: u64,
        filter: &Filter,
        mut on_logs: F,
    ) -> Result<(), ChainError>
    where
        F: FnMut(LogBatch) -> Fut,
        Fut: Future<Output = ()>,
    {
        if from_block > to_block {
            tracing::debug!(from_block, to_block, "empty block range, nothing to fetch");
            return Ok(());
        }

        let mut windows = self.windows(from_block, to_block);
        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!(from_block = windows.next_from, to_block, "log fetch cancelled");
                return Ok(());
            }
            match self.next_window(&mut windows, filter).await {
                None => return Ok(()),
                Some(Ok(batch)) => {
                    if !batch.logs.is_empty() {
                        on_logs(batch).await;
                    }
                }
                Some(Err(err)) => return Err(err),
            }
        }
    }

    /// Polls the head and yields the logs of every new block range, one batch
    /// per non-empty window. The cursor moves past a window once it was
    /// fetched, so a failed window is retried from its start on the next tick.
    pub fn watch(&self, from_block: u64, filter: Filter) -> impl Stream<Item = LogBatch> + '_ {
        async_stream::stream! {
            let mut next_block = from_block;
            'poll: loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = sleep(self.settings.poll_interval) => {}
                }

                let head = match self.client.get_block_number().await {
                    Ok(head) => head,
                    Err(err) => {
                        tracing::warn!(err = %err, "failed to poll latest block number");
                        continue;
                    }
                };
                if head < next_block {
                    continue;
                }

                let mut windows = self.windows(next_block, head);
                loop {
                    if self.cancel.is_cancelled() {
                        break 'poll;
                    }
                    match self.next_window(&mut windows, &filter).await {
                        None => break,
                        Some(Ok(batch)) => {
                            next_block = batch.to_block + 1;
                            if !batch.logs.is_empty() {
                                yield batch;
                            }
                        }
                        Some(Err(err)) => {
                            tracing::warn!(
                                from_block = next_block,
                                to_block = head,
                                err = %err,
                                "failed to fetch new logs, retrying on next tick"
                            );
                            break;
                        }
                    }
                }
            }
        }
    }

    fn windows(&self, from_block: u64, to_block: u64) -> Windows {
        let max_window = self.settings.window_size.max(1);
        Windows {
            next_from: from_block,
            to_block,
            window: max_window,
            min_window: self.settings.min_window_size.clamp(1, max_window),
            max_window,
            done: from_block > to_block,
        }
    }

    /// Fetches the next window of `windows`. A `LimitExceeded` halves the window
    /// and retries the same start block, a success doubles it back.
    async fn next_window(
        &self,
        windows: &mut Windows,
        filter: &Filter,
    ) -> Option<Result<LogBatch, ChainError>> {
        if windows.done {
            return None;
        }
        loop {
            let from = windows.next_from;
            let to = from.saturating_add(windows.window - 1).min(windows.to_block);
            match self.get_logs(from, to, filter).await {
                Ok(logs) => {
                    if to >= windows.to_block {
                        windows.done = true;
                    } else {
                        windows.next_from = to + 1;
                    }
                    windows.window = windows.window.saturating_mul(2).min(windows.max_window);
                    return Some(Ok(LogBatch {
                        from_block: from,
                        to_block: to,
                        logs,
                    }));
                }
                Err(err) if err.is_limit_exceeded() && windows.window > windows.min_window => {
                    let shrunk = (windows.window / 2).max(windows.min_window);
                    tracing::warn!(
                        from_block = from,
                        to_block = to,
                        window = windows.window,
                        shrunk,
                        err = %err,
                        "provider limit exceeded, shrinking window"
                    );
                    windows.window = shrunk;
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }

    async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
        filter: &Filter,
    ) -> Result<Vec<Log>, ChainError> {
        let filter = filter.clone().from_block(from_block).to_block(to_block);
        let logs = with_retries(&self.settings.retry_delays, "logs", || {
            self.client.get_logs(&filter)
        })
        .await?;
        tracing::debug!(from_block, to_block, count = logs.len(), "fetched logs");
        Ok(logs)
    }
}

/// Retries transient failures with the given delays. Provider limit errors are
/// returned at once since the same request would fail again.
async fn with_retries<T, F, Fut>(
    delays: &[Duration],
    what: &'static str,
    mut request: F,
) -> Result<T, ChainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ChainError>>,
{
    let mut delays = delays.iter();
    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_limit_exceeded() => return Err(err),
            Err(err) => match delays.next() {
                Some(delay) => {
                    tracing::warn!(err = %err, ?delay, "failed to fetch {what}, retrying");
                    sleep(*delay).await;
                }
                None => return Err(err),
            },
        }
    }
}
