use crate::async_error::{ComputationError, StackTrace};
use crate::async_value::{AsyncValue, Recompute};
use crate::into_async_value::{guard, IntoAsyncValue};
use futures_signals::signal::{Mutable, MutableSignalCloned, SignalExt, SignalStream};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Payload types an [`AsyncStore`] can hold.
pub trait Payload: Clone + PartialEq + Send + Sync + 'static {}

impl<T> Payload for T where T: Clone + PartialEq + Send + Sync + 'static {}

#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum StoreError {
    #[error("the store's update queue is closed")]
    Closed,
}

type Reducer<T> = Box<dyn FnOnce(AsyncValue<T>) -> AsyncValue<T> + Send>;
type Action<T> = Box<dyn FnOnce(AsyncValue<T>) + Send>;

/// Holds the current [`AsyncValue`] of one computation and publishes every
/// change to its subscribers.
///
/// All updates go through a single queue processed on a tokio task, so a
/// transition such as "start loading on top of the previous state" is always
/// applied to the state it was computed from. A new state is only published
/// when it differs from the current one.
///
/// Must be created inside a tokio runtime.
pub struct AsyncStore<T: Payload> {
    state: Mutable<AsyncValue<T>>,
    set_state_tx: UnboundedSender<Reducer<T>>,
    with_state_tx: UnboundedSender<Action<T>>,
    generation: Arc<AtomicU64>,
}

impl<T: Payload> AsyncStore<T> {
    pub fn new(initial_state: AsyncValue<T>) -> Self {
        let state = Mutable::new(initial_state);
        let (set_state_tx, set_state_rx) = tokio::sync::mpsc::unbounded_channel::<Reducer<T>>();
        let (with_state_tx, with_state_rx) = tokio::sync::mpsc::unbounded_channel::<Action<T>>();

        let state_clone = state.clone();

        tokio::spawn(async move {
            Self::process_queue(state_clone, set_state_rx, with_state_rx).await;
        });

        AsyncStore {
            state,
            set_state_tx,
            with_state_tx,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    async fn process_queue(
        state: Mutable<AsyncValue<T>>,
        mut set_state_rx: UnboundedReceiver<Reducer<T>>,
        mut with_state_rx: UnboundedReceiver<Action<T>>,
    ) {
        loop {
            tokio::select! {
                biased;
                Some(reducer) = set_state_rx.recv() => {
                    let new_state = reducer(state.get_cloned());
                    state.set_neq(new_state);
                }
                Some(action) = with_state_rx.recv() => {
                    action(state.get_cloned());
                }
                else => break,
            }
        }
    }

    pub fn to_stream(&self) -> SignalStream<MutableSignalCloned<AsyncValue<T>>> {
        self.state.signal_cloned().to_stream()
    }

    pub fn to_signal(&self) -> MutableSignalCloned<AsyncValue<T>> {
        self.state.signal_cloned()
    }

    /// The last published state. Queued updates are not reflected yet.
    pub fn get_state(&self) -> AsyncValue<T> {
        self.state.get_cloned()
    }

    /// The state after every update queued before this call has been applied.
    pub async fn await_state(&self) -> Result<AsyncValue<T>, StoreError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.with_state(|state| {
            let _ = tx.send(state);
        })?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    pub fn set_state<F>(&self, reducer: F) -> Result<(), StoreError>
    where
        F: FnOnce(AsyncValue<T>) -> AsyncValue<T> + Send + 'static,
    {
        self.set_state_tx
            .send(Box::new(reducer))
            .map_err(|_| StoreError::Closed)
    }

    pub fn with_state<F>(&self, action: F) -> Result<(), StoreError>
    where
        F: FnOnce(AsyncValue<T>) + Send + 'static,
    {
        self.with_state_tx
            .send(Box::new(action))
            .map_err(|_| StoreError::Closed)
    }

    /// Replaces the state as is, without merging the previous one.
    pub fn set(&self, value: AsyncValue<T>) -> Result<(), StoreError> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.set_state(move |_| value)
    }

    /// Recomputes on explicit request: while loading, the previous data or
    /// error keeps its shape and is flagged as refreshing.
    pub fn refresh<R, F>(&self, computation: F) -> Result<(), StoreError>
    where
        R: IntoAsyncValue<T> + Send + 'static,
        F: Future<Output = R> + Send + 'static,
    {
        self.execute_core(Recompute::Refresh, computation, None, None)
    }

    /// Recomputes because a dependency changed: while loading, the previous
    /// value and error are carried by a loading state.
    pub fn reload<R, F>(&self, computation: F) -> Result<(), StoreError>
    where
        R: IntoAsyncValue<T> + Send + 'static,
        F: Future<Output = R> + Send + 'static,
    {
        self.execute_core(Recompute::Reload, computation, None, None)
    }

    pub fn execute<R, F>(&self, recompute: Recompute, computation: F) -> Result<(), StoreError>
    where
        R: IntoAsyncValue<T> + Send + 'static,
        F: Future<Output = R> + Send + 'static,
    {
        self.execute_core(recompute, computation, None, None)
    }

    /// Like [`execute`](Self::execute), but publishes a
    /// [`ComputationError::Cancelled`] error as soon as `cancellation_token`
    /// is cancelled.
    pub fn execute_cancellable<R, F, Fut>(
        &self,
        recompute: Recompute,
        cancellation_token: CancellationToken,
        computation: F,
    ) -> Result<(), StoreError>
    where
        R: IntoAsyncValue<T> + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        F: FnOnce(CancellationToken) -> Fut,
    {
        self.execute_core(
            recompute,
            computation(cancellation_token.clone()),
            Some(cancellation_token),
            None,
        )
    }

    /// Like [`execute`](Self::execute), but publishes a
    /// [`ComputationError::Timeout`] error if `computation` does not finish
    /// within `timeout`.
    pub fn execute_with_timeout<R, F>(
        &self,
        recompute: Recompute,
        computation: F,
        timeout: Duration,
    ) -> Result<(), StoreError>
    where
        R: IntoAsyncValue<T> + Send + 'static,
        F: Future<Output = R> + Send + 'static,
    {
        self.execute_core(recompute, computation, None, Some(timeout))
    }

    fn execute_core<R, F>(
        &self,
        recompute: Recompute,
        computation: F,
        cancellation_token: Option<CancellationToken>,
        timeout: Option<Duration>,
    ) -> Result<(), StoreError>
    where
        R: IntoAsyncValue<T> + Send + 'static,
        F: Future<Output = R> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let is_refresh = recompute.is_refresh();

        // The loading state is merged in the queue so it sees the latest state.
        self.set_state(move |previous| {
            debug!(?recompute, generation, "computation started");
            AsyncValue::loading().copy_with_previous(&previous, is_refresh)
        })?;

        let set_state_tx = self.set_state_tx.clone();
        let latest = self.generation.clone();
        tokio::spawn(async move {
            // Yield to allow the loading state to be published before running the computation
            tokio::task::yield_now().await;
            let result = match cancellation_token {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            debug!(generation, "computation cancelled");
                            AsyncValue::fail(ComputationError::Cancelled, StackTrace::capture())
                        }
                        result = Self::run(computation, timeout, generation) => result,
                    }
                }
                None => Self::run(computation, timeout, generation).await,
            };

            let _ = set_state_tx.send(Box::new(move |previous| {
                if latest.load(Ordering::SeqCst) != generation {
                    debug!(generation, "discarding the result of a superseded computation");
                    return previous;
                }
                debug!(
                    generation,
                    has_value = result.has_value(),
                    has_error = result.has_error(),
                    "computation finished"
                );
                result.copy_with_previous(&previous, true)
            }));
        });
        Ok(())
    }

    async fn run<R, F>(computation: F, timeout: Option<Duration>, generation: u64) -> AsyncValue<T>
    where
        R: IntoAsyncValue<T>,
        F: Future<Output = R>,
    {
        match timeout {
            Some(timeout) => match tokio::time::timeout(timeout, guard(computation)).await {
                Ok(result) => result,
                Err(_) => {
                    debug!(generation, ?timeout, "computation timed out");
                    AsyncValue::fail(ComputationError::Timeout, StackTrace::capture())
                }
            },
            None => guard(computation).await,
        }
    }
}
