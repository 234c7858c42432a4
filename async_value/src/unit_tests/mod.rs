use crate::{AsyncStore, AsyncValue, AsyncValueStreamExt, CapturedError, Payload, StackTrace};
use futures::StreamExt;
use thiserror::Error;

// Import test modules
mod async_error_test;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("test failure: {0}")]
pub struct TestFailure(pub &'static str);

pub fn captured(message: &'static str) -> CapturedError {
    CapturedError::new(TestFailure(message), StackTrace::disabled())
}

pub fn failed<T>(captured: &CapturedError) -> AsyncValue<T> {
    let (error, stack_trace) = captured.clone().into_parts();
    AsyncValue::fail(error, stack_trace)
}

/// Waits for queued updates, then collects the store's states until one is no
/// longer loading and returns it.
pub async fn settled<T: Payload>(store: &AsyncStore<T>) -> AsyncValue<T> {
    store.await_state().await.expect("the store is closed");
    let states: Vec<_> = store.to_stream().until_settled().collect().await;
    states
        .last()
        .cloned()
        .expect("the store stream ended without a state")
}
