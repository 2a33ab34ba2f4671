//! Fixed-interval account polling with a single latest-snapshot output.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anchor_lang::prelude::Pubkey;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::codec::AccountRecord;
use crate::errors::PollError;
use crate::ledger::AccountSource;

const MIN_PERIOD: Duration = Duration::from_millis(100);

/// An immutable decoded copy of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    pub address: Pubkey,
    /// Successful fetches so far, starting at 1
    pub sequence: u64,
    pub fetched_at: SystemTime,
    pub record: T,
}

/// What subscribers observe. `latest` only ever holds a fully decoded snapshot.
#[derive(Debug)]
pub struct PollState<T> {
    pub latest: Option<Arc<Snapshot<T>>>,
    /// Cleared by the next successful tick
    pub last_error: Option<PollError>,
    pub ticks: u64,
    pub failures: u64,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            latest: None,
            last_error: None,
            ticks: 0,
            failures: 0,
        }
    }
}

impl<T> Clone for PollState<T> {
    fn clone(&self) -> Self {
        Self {
            latest: self.latest.clone(),
            last_error: self.last_error.clone(),
            ticks: self.ticks,
            failures: self.failures,
        }
    }
}

/// Background task refreshing one account. Dropping it aborts the task.
#[derive(Debug)]
pub struct SyncPoller<T> {
    receiver: watch::Receiver<PollState<T>>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl<T> SyncPoller<T>
where
    T: AccountRecord + Send + Sync + 'static,
{
    /// Starts polling `address` every `period`; the first fetch runs immediately.
    /// Must be called inside a tokio runtime.
    pub fn spawn<L>(ledger: Arc<L>, address: Pubkey, period: Duration) -> Self
    where
        L: AccountSource + 'static,
    {
        let (sender, receiver) = watch::channel(PollState::default());
        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run(ledger, address, period, sender, shutdown_rx));
        info!(%address, period_secs = period.as_secs(), "poller started");
        Self {
            receiver,
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState<T>> {
        self.receiver.clone()
    }

    pub fn latest(&self) -> Option<Arc<Snapshot<T>>> {
        self.receiver.borrow().latest.clone()
    }

    pub fn state(&self) -> PollState<T> {
        self.receiver.borrow().clone()
    }

    /// Stops the task and waits for it. No update is published after this returns.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(%err, "poller task ended abnormally");
            }
        }
    }
}

impl<T> Drop for SyncPoller<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn fetch<T, L>(ledger: &L, address: &Pubkey) -> Result<T, PollError>
where
    T: AccountRecord,
    L: AccountSource,
{
    let data = ledger.get_account_bytes(address).await?;
    Ok(T::decode(&data)?)
}

async fn run<T, L>(
    ledger: Arc<L>,
    address: Pubkey,
    period: Duration,
    sender: watch::Sender<PollState<T>>,
    mut shutdown: oneshot::Receiver<()>,
) where
    T: AccountRecord + Send + Sync + 'static,
    L: AccountSource + 'static,
{
    let mut ticker = interval(period.max(MIN_PERIOD));
    // A slow fetch swallows the ticks it overlapped instead of queueing them.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sequence = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            outcome = fetch::<T, L>(ledger.as_ref(), &address) => outcome,
        };

        match outcome {
            Ok(record) => {
                sequence += 1;
                let snapshot = Arc::new(Snapshot {
                    address,
                    sequence,
                    fetched_at: SystemTime::now(),
                    record,
                });
                sender.send_modify(|state| {
                    state.ticks += 1;
                    state.latest = Some(snapshot);
                    state.last_error = None;
                });
                debug!(%address, sequence, "snapshot installed");
            }
            Err(err) => {
                warn!(%address, error = %err, "poll tick failed, keeping previous snapshot");
                sender.send_modify(|state| {
                    state.ticks += 1;
                    state.failures += 1;
                    state.last_error = Some(err);
                });
            }
        }
    }
    info!(%address, "poller stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::errors::{DecodeError, LedgerError};
    use crate::state::ProposalCounter;

    struct ScriptedSource {
        response: Mutex<Result<Vec<u8>, LedgerError>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(response: Result<Vec<u8>, LedgerError>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(response),
                calls: AtomicUsize::new(0),
            })
        }

        fn set(&self, response: Result<Vec<u8>, LedgerError>) {
            *self.response.lock().unwrap() = response;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AccountSource for ScriptedSource {
        async fn get_account_bytes(&self, _address: &Pubkey) -> Result<Vec<u8>, LedgerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.lock().unwrap().clone()
        }
    }

    fn counter(next_id: u64) -> Vec<u8> {
        ProposalCounter { next_id }.encode().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_keeps_previous_snapshot() {
        let ledger = ScriptedSource::new(Ok(counter(3)));
        let address = Pubkey::new_unique();
        let poller = SyncPoller::<ProposalCounter>::spawn(ledger.clone(), address, Duration::from_secs(5));
        let mut rx = poller.subscribe();

        rx.changed().await.unwrap();
        let first = rx.borrow_and_update().clone();
        let snapshot = first.latest.unwrap();
        assert_eq!(snapshot.record.next_id, 3);
        assert_eq!(snapshot.sequence, 1);
        assert_eq!(snapshot.address, address);

        ledger.set(Err(LedgerError::Transport("connection reset".into())));
        rx.changed().await.unwrap();
        let failed = rx.borrow_and_update().clone();
        assert_eq!(failed.latest.unwrap().record.next_id, 3);
        assert_eq!(
            failed.last_error,
            Some(PollError::Fetch(LedgerError::Transport("connection reset".into())))
        );
        assert_eq!((failed.ticks, failed.failures), (2, 1));

        ledger.set(Ok(vec![0u8; 4]));
        rx.changed().await.unwrap();
        let truncated = rx.borrow_and_update().clone();
        assert!(matches!(
            truncated.last_error,
            Some(PollError::Decode(DecodeError::TooShort { .. }))
        ));
        assert_eq!(truncated.latest.unwrap().sequence, 1);

        ledger.set(Ok(counter(4)));
        rx.changed().await.unwrap();
        let recovered = rx.borrow_and_update().clone();
        assert_eq!(recovered.last_error, None);
        assert_eq!(recovered.latest.unwrap().sequence, 2);
        assert_eq!(poller.latest().unwrap().record.next_id, 4);

        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_updates() {
        let ledger = ScriptedSource::new(Ok(counter(1)));
        let poller = SyncPoller::<ProposalCounter>::spawn(ledger.clone(), Pubkey::new_unique(), Duration::from_secs(5));
        let mut rx = poller.subscribe();
        rx.changed().await.unwrap();
        rx.borrow_and_update();

        poller.stop().await;
        let calls = ledger.calls();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(ledger.calls(), calls);
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_period() {
        let ledger = ScriptedSource::new(Ok(counter(1)));
        let poller = SyncPoller::<ProposalCounter>::spawn(ledger.clone(), Pubkey::new_unique(), Duration::from_secs(5));
        let mut rx = poller.subscribe();
        for _ in 0..3 {
            rx.changed().await.unwrap();
            rx.borrow_and_update();
        }
        assert_eq!(ledger.calls(), 3);
        assert_eq!(poller.state().ticks, 3);
        drop(poller);
    }
}
