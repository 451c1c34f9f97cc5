use super::ListenerContext;
use crate::{
    error::IndexerError,
    log_fetcher::{LogBatch, LogFetcher},
    types::address_to_string,
};
use alloy::{
    primitives::Address,
    rpc::types::{Filter, Log},
};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, instrument};

/// Contract specific part of a listener.
#[async_trait]
pub trait LogHandler: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn address(&self) -> Address;

    fn filter(&self) -> Filter;

    async fn handle_log(&self, log: &Log) -> Result<(), IndexerError>;
}

/// Backfills history of one contract and then follows its new logs until cancelled.
pub struct Listener<H> {
    handler: H,
    ctx: ListenerContext,
    start_block: u64,
    cancel: CancellationToken,
}

impl<H: LogHandler> Listener<H> {
    pub fn new(
        handler: H,
        ctx: ListenerContext,
        start_block: u64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            handler,
            ctx,
            start_block,
            cancel,
        }
    }

    #[instrument(
        name = "listener",
        skip_all,
        level = "info",
        fields(listener = self.handler.name(), address = %self.handler.address())
    )]
    pub async fn run(self) {
        let address = address_to_string(&self.handler.address());
        let fetcher = LogFetcher::with_cancellation(
            self.ctx.chain.clone(),
            self.ctx.settings.fetcher.clone(),
            self.cancel.clone(),
        );
        let Some(head) = self.wait_for_head(&fetcher).await else {
            tracing::info!("listener cancelled before start");
            return;
        };
        let start_block = self.resume_block(&address).await;
        tracing::info!(start_block, head, "starting listener");

        let filter = self.handler.filter();
        let backfill_done = AtomicBool::new(false);
        let watch_cursor = AtomicU64::new(0);
        let progress = Progress::new();

        let next_from = AtomicU64::new(start_block);
        let backfill = async {
            let this = &self;
            let checkpoint_address = address.as_str();
            let next_from = &next_from;
            let progress = &progress;
            loop {
                let result = fetcher
                    .fetch_range(
                        next_from.load(Ordering::Acquire),
                        head,
                        &filter,
                        move |batch| async move {
                            let outcome = this.process_batch(&batch).await;
                            if outcome.interrupted {
                                return;
                            }
                            progress.record(&outcome);
                            next_from.store(batch.to_block + 1, Ordering::Release);
                            this.save_checkpoint(checkpoint_address, progress, batch.to_block)
                                .await;
                        },
                    )
                    .await;
                match result {
                    Ok(()) => break,
                    Err(err) => {
                        tracing::error!(
                            err = %err,
                            from_block = next_from.load(Ordering::Acquire),
                            to_block = head,
                            "backfill failed, restarting from last processed window"
                        );
                        if !self.pause().await {
                            return;
                        }
                    }
                }
            }
            if self.cancel.is_cancelled() {
                return;
            }
            backfill_done.store(true, Ordering::Release);
            let cursor = head.max(watch_cursor.load(Ordering::Acquire));
            self.save_checkpoint(&address, progress, cursor).await;
            tracing::info!(head, "backfill finished");
        };

        let watch = async {
            let stream = fetcher.watch(head + 1, filter.clone());
            tokio::pin!(stream);
            loop {
                let batch = tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    batch = stream.next() => match batch {
                        Some(batch) => batch,
                        None => break,
                    },
                };
                let outcome = self.process_batch(&batch).await;
                if outcome.interrupted {
                    break;
                }
                progress.record(&outcome);
                watch_cursor.fetch_max(batch.to_block, Ordering::AcqRel);
                if backfill_done.load(Ordering::Acquire) {
                    self.save_checkpoint(&address, &progress, batch.to_block).await;
                }
            }
        };

        tokio::join!(backfill, watch);
        tracing::info!("listener stopped");
    }

    async fn wait_for_head(&self, fetcher: &LogFetcher) -> Option<u64> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            match fetcher.latest_block().await {
                Ok(head) => return Some(head),
                Err(err) => {
                    tracing::error!(err = %err, "failed to read latest block, restarting listener");
                    if !self.pause().await {
                        return None;
                    }
                }
            }
        }
    }

    async fn resume_block(&self, address: &str) -> u64 {
        match self.ctx.db.get_checkpoint(address).await {
            Ok(Some(checkpoint)) => self
                .start_block
                .max(checkpoint.validated_block_number().saturating_add(1)),
            Ok(None) => self.start_block,
            Err(err) => {
                tracing::warn!(
                    err = %err,
                    "failed to read checkpoint, starting from configured block"
                );
                self.start_block
            }
        }
    }

    /// Sleeps for the restart delay. Returns `false` if cancelled meanwhile.
    async fn pause(&self) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = sleep(self.ctx.settings.restart_delay) => true,
        }
    }

    async fn process_batch(&self, batch: &LogBatch) -> BatchOutcome {
        tracing::debug!(
            from_block = batch.from_block,
            to_block = batch.to_block,
            count = batch.logs.len(),
            "processing logs"
        );
        let mut outcome = BatchOutcome::default();
        for log in &batch.logs {
            match self.handle_with_retries(log).await {
                LogOutcome::Handled | LogOutcome::Skipped => {}
                LogOutcome::Failed => {
                    let block = log.block_number.unwrap_or(batch.from_block);
                    outcome.first_failed_block = Some(
                        outcome
                            .first_failed_block
                            .map_or(block, |failed| failed.min(block)),
                    );
                }
                LogOutcome::Cancelled => {
                    outcome.interrupted = true;
                    break;
                }
            }
        }
        outcome
    }

    async fn handle_with_retries(&self, log: &Log) -> LogOutcome {
        let span = tracing::info_span!(
            "handle_log",
            block_number = log.block_number,
            log_index = log.log_index,
            tx_hash = ?log.transaction_hash,
            correlation_id = tracing::field::Empty,
        );
        async {
            let mut backoff = self.ctx.settings.handler_retry_delays.iter();
            loop {
                let err = match self.handler.handle_log(log).await {
                    Ok(()) => return LogOutcome::Handled,
                    Err(err) => err,
                };
                if !err.is_retryable() {
                    tracing::error!(err = %err, "log handler failed, skipping");
                    return LogOutcome::Skipped;
                }
                let Some(delay) = backoff.next() else {
                    tracing::error!(
                        err = %err,
                        "log handler failed, retries exhausted, will retry after restart"
                    );
                    return LogOutcome::Failed;
                };
                tracing::error!(err = %err, ?delay, "log handler failed, retrying");
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        tracing::warn!("listener cancelled while retrying log");
                        return LogOutcome::Cancelled;
                    }
                    _ = sleep(*delay) => {}
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn save_checkpoint(&self, address: &str, progress: &Progress, processed_to: u64) {
        let Some(block_number) = progress.checkpoint(processed_to) else {
            tracing::debug!(processed_to, "first block still has unhandled logs, no checkpoint");
            return;
        };
        if block_number < processed_to {
            tracing::warn!(
                block_number,
                processed_to,
                "checkpoint held back before a log with exhausted retries"
            );
        }
        if let Err(err) = self.ctx.db.save_checkpoint(address, block_number).await {
            tracing::warn!(err = %err, block_number, "failed to save checkpoint");
        }
    }
}

enum LogOutcome {
    Handled,
    /// Handling can never succeed, the log is dropped.
    Skipped,
    /// Retries ran out on a transient error.
    Failed,
    Cancelled,
}

#[derive(Debug, Default)]
struct BatchOutcome {
    /// Cancelled before every log of the batch was handled.
    interrupted: bool,
    first_failed_block: Option<u64>,
}

/// Keeps checkpoints below the lowest block whose logs ran out of retries in
/// this run, so a restart handles them again.
struct Progress {
    lowest_failed_block: AtomicU64,
}

impl Progress {
    fn new() -> Self {
        Self {
            lowest_failed_block: AtomicU64::new(u64::MAX),
        }
    }

    fn record(&self, outcome: &BatchOutcome) {
        if let Some(block) = outcome.first_failed_block {
            self.lowest_failed_block.fetch_min(block, Ordering::AcqRel);
        }
    }

    fn checkpoint(&self, processed_to: u64) -> Option<u64> {
        match self.lowest_failed_block.load(Ordering::Acquire) {
            u64::MAX => Some(processed_to),
            failed => failed.checked_sub(1).map(|block| block.min(processed_to)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::StoreError,
        relay::Reconciler,
        settings::{IndexerSettings, LogFetcherSettings},
        test_utils::{
            fixtures::{EntryEvent, STORAGE, entry_log, tx_hash},
            init_memory_db,
            mock_chain::MockChainClient,
        },
    };
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use sea_orm::DbErr;
    use std::{collections::HashMap, sync::Arc, time::Duration};

    /// Records handled log positions and fails the configured blocks a number of times.
    #[derive(Clone, Default)]
    struct RecordingHandler {
        handled: Arc<Mutex<Vec<u64>>>,
        attempts: Arc<Mutex<HashMap<u64, usize>>>,
        retryable_failures: Arc<Mutex<HashMap<u64, usize>>>,
        fatal_blocks: Arc<Mutex<Vec<u64>>>,
    }

    #[async_trait]
    impl LogHandler for RecordingHandler {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn address(&self) -> Address {
            STORAGE
        }

        fn filter(&self) -> Filter {
            Filter::new().address(STORAGE)
        }

        async fn handle_log(&self, log: &Log) -> Result<(), IndexerError> {
            let block = log.block_number.unwrap_or_default();
            *self.attempts.lock().entry(block).or_default() += 1;
            if self.fatal_blocks.lock().contains(&block) {
                return Err(IndexerError::MalformedLog("broken".to_string()));
            }
            if let Some(left) = self.retryable_failures.lock().get_mut(&block)
                && *left > 0
            {
                *left -= 1;
                return Err(StoreError::Db(DbErr::Custom("flaky".to_string())).into());
            }
            self.handled.lock().push(block);
            Ok(())
        }
    }

    fn settings() -> IndexerSettings {
        let mut settings = IndexerSettings::new(1, Address::ZERO);
        settings.fetcher = LogFetcherSettings {
            window_size: 10,
            min_window_size: 1,
            poll_interval: Duration::from_millis(10),
            retry_delays: vec![],
        };
        settings.handler_retry_delays = vec![Duration::ZERO, Duration::ZERO];
        settings.restart_delay = Duration::from_millis(10);
        settings
    }

    async fn context(chain: &MockChainClient) -> ListenerContext {
        context_with(chain, settings()).await
    }

    async fn context_with(chain: &MockChainClient, settings: IndexerSettings) -> ListenerContext {
        ListenerContext::new(
            Arc::new(chain.clone()),
            init_memory_db().await,
            Arc::new(Reconciler::new(None, 1)),
            Arc::new(settings),
        )
    }

    fn log_at(block: u64) -> Log {
        entry_log(EntryEvent::Created, STORAGE, block, block, 0, tx_hash(1))
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition was not reached in time");
    }

    #[tokio::test]
    async fn backfills_then_follows_new_blocks() {
        let chain = MockChainClient::new(30);
        for block in [3, 15, 30] {
            chain.push_log(log_at(block));
        }
        let ctx = context(&chain).await;
        let handler = RecordingHandler::default();
        let cancel = CancellationToken::new();
        let listener = Listener::new(handler.clone(), ctx.clone(), 0, cancel.clone());
        let task = tokio::spawn(listener.run());

        wait_until(|| handler.handled.lock().len() == 3).await;
        chain.push_log(log_at(34));
        chain.set_block_number(35);
        wait_until(|| handler.handled.lock().len() == 4).await;

        cancel.cancel();
        task.await.unwrap();

        assert_eq!(*handler.handled.lock(), vec![3, 15, 30, 34]);
        let checkpoint = ctx
            .db
            .get_checkpoint(&address_to_string(&STORAGE))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.block_number, 35);
    }

    #[tokio::test]
    async fn failing_logs_are_retried_or_skipped() {
        let chain = MockChainClient::new(20);
        for block in [5, 10, 15] {
            chain.push_log(log_at(block));
        }
        let ctx = context(&chain).await;
        let handler = RecordingHandler::default();
        handler.retryable_failures.lock().insert(5, 2);
        handler.retryable_failures.lock().insert(10, 5);
        handler.fatal_blocks.lock().push(15);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Listener::new(handler.clone(), ctx, 0, cancel.clone()).run());

        wait_until(|| handler.attempts.lock().get(&15).is_some()).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(*handler.handled.lock(), vec![5]);
        let attempts = handler.attempts.lock().clone();
        assert_eq!(attempts[&5], 3);
        assert_eq!(attempts[&10], 3);
        assert_eq!(attempts[&15], 1);
    }

    #[tokio::test]
    async fn resumes_after_checkpoint() {
        let chain = MockChainClient::new(40);
        for block in [5, 25, 38] {
            chain.push_log(log_at(block));
        }
        let ctx = context(&chain).await;
        ctx.db
            .save_checkpoint(&address_to_string(&STORAGE), 20)
            .await
            .unwrap();
        let handler = RecordingHandler::default();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Listener::new(handler.clone(), ctx, 0, cancel.clone()).run());

        wait_until(|| handler.handled.lock().len() == 2).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(*handler.handled.lock(), vec![25, 38]);
        assert_eq!(chain.log_queries().first(), Some(&(21, 30)));
    }

    #[tokio::test]
    async fn head_read_is_retried() {
        let chain = MockChainClient::new(10);
        chain.push_log(log_at(7));
        chain.fail_next_block_number_queries(2);
        let ctx = context(&chain).await;
        let handler = RecordingHandler::default();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Listener::new(handler.clone(), ctx, 0, cancel.clone()).run());

        wait_until(|| handler.handled.lock().len() == 1).await;
        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn cancel_during_retry_does_not_checkpoint_batch() {
        let chain = MockChainClient::new(20);
        chain.push_log(log_at(5));
        let mut settings = settings();
        settings.handler_retry_delays = vec![Duration::from_secs(60)];
        let ctx = context_with(&chain, settings).await;
        let handler = RecordingHandler::default();
        handler.retryable_failures.lock().insert(5, usize::MAX);
        let cancel = CancellationToken::new();
        let task =
            tokio::spawn(Listener::new(handler.clone(), ctx.clone(), 0, cancel.clone()).run());

        wait_until(|| handler.attempts.lock().get(&5) == Some(&1)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        assert!(handler.handled.lock().is_empty());
        let checkpoint = ctx
            .db
            .get_checkpoint(&address_to_string(&STORAGE))
            .await
            .unwrap();
        assert_eq!(checkpoint, None);
    }

    #[tokio::test]
    async fn exhausted_retries_hold_checkpoint_until_restart() {
        let chain = MockChainClient::new(20);
        chain.push_log(log_at(5));
        chain.push_log(log_at(15));
        let ctx = context(&chain).await;
        let address = address_to_string(&STORAGE);
        let failing = RecordingHandler::default();
        failing.retryable_failures.lock().insert(5, usize::MAX);
        let cancel = CancellationToken::new();
        let task =
            tokio::spawn(Listener::new(failing.clone(), ctx.clone(), 0, cancel.clone()).run());

        wait_until(|| failing.handled.lock().contains(&15)).await;
        let checkpoint = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(checkpoint) = ctx.db.get_checkpoint(&address).await.unwrap() {
                    return checkpoint;
                }
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(failing.attempts.lock()[&5], 3);
        assert_eq!(checkpoint.block_number, 4);
        let stored = ctx.db.get_checkpoint(&address).await.unwrap().unwrap();
        assert_eq!(stored.block_number, 4);

        chain.clear_log_queries();
        let recovered = RecordingHandler::default();
        let cancel = CancellationToken::new();
        let task =
            tokio::spawn(Listener::new(recovered.clone(), ctx.clone(), 0, cancel.clone()).run());
        wait_until(|| recovered.handled.lock().len() == 2).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(*recovered.handled.lock(), vec![5, 15]);
        assert_eq!(chain.log_queries().first(), Some(&(5, 14)));
    }
}
