use crate::async_error::{CapturedError, ComputationError, SharedError, StackTrace};
use crate::async_value::AsyncValue;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::trace;

/// Conversion of a computation's output into an [`AsyncValue`].
pub trait IntoAsyncValue<T> {
    fn into_async_value(self) -> AsyncValue<T>;
}

/// `Ok` becomes data, `Err` becomes an error with a trace captured here.
impl<T, E> IntoAsyncValue<T> for Result<T, E>
where
    E: Into<SharedError>,
{
    fn into_async_value(self) -> AsyncValue<T> {
        match self {
            Ok(value) => AsyncValue::data(value),
            Err(error) => AsyncValue::fail(error, StackTrace::capture()),
        }
    }
}

impl<T> IntoAsyncValue<T> for AsyncValue<T> {
    fn into_async_value(self) -> AsyncValue<T> {
        self
    }
}

impl<T, E> From<Result<T, E>> for AsyncValue<T>
where
    E: Into<SharedError>,
{
    fn from(value: Result<T, E>) -> Self {
        value.into_async_value()
    }
}

/// Runs a fallible computation and folds its outcome into an [`AsyncValue`].
///
/// Errors of any type become [`AsyncValue::Error`] together with a stack
/// trace, and so do panics raised while polling `computation`. The returned
/// future awaits `computation` to completion; cancelling is the caller's
/// business (drop the future).
///
/// ```
/// use async_value::{guard, AsyncValue, SharedError};
///
/// # futures::executor::block_on(async {
/// let ok: AsyncValue<i32> = guard(async { Ok::<_, SharedError>(42) }).await;
/// assert_eq!(ok, AsyncValue::data(42));
///
/// let failed: AsyncValue<i32> = guard(async { Err(SharedError::msg("offline")) }).await;
/// assert!(failed.has_error());
/// # });
/// ```
pub async fn guard<T, R, F>(computation: F) -> AsyncValue<T>
where
    F: Future<Output = R>,
    R: IntoAsyncValue<T>,
{
    match AssertUnwindSafe(computation).catch_unwind().await {
        Ok(output) => {
            let value = output.into_async_value();
            if let AsyncValue::Error(error) = &value {
                trace!(error = %error.error(), "guard captured a failure");
            }
            value
        }
        Err(payload) => {
            let error = ComputationError::from_panic(payload);
            trace!(%error, "guard caught a panic");
            AsyncValue::fail(error, StackTrace::capture())
        }
    }
}

/// Like [`guard`], but only failures accepted by `test` are folded into the
/// value. Rejected failures are handed back as `Err`.
pub async fn guard_with<T, R, F>(
    computation: F,
    test: impl FnOnce(&SharedError) -> bool,
) -> Result<AsyncValue<T>, CapturedError>
where
    F: Future<Output = R>,
    R: IntoAsyncValue<T>,
{
    let value = guard(computation).await;
    match &value {
        AsyncValue::Error(error) if !test(error.error()) => Err(error.captured().clone()),
        _ => Ok(value),
    }
}
