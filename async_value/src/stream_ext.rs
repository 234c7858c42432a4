use crate::async_value::AsyncValue;
use futures_core::stream::Stream;
use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Stream helpers for streams of [`AsyncValue`]s, such as
/// [`AsyncStore::to_stream`](crate::AsyncStore::to_stream).
pub trait AsyncValueStreamExt<T>: Stream<Item = AsyncValue<T>> {
    /// Yields values up to and including the first one that is not loading,
    /// then ends.
    ///
    /// ## Examples
    ///
    /// ```
    /// use async_value::{AsyncValue, AsyncValueStreamExt};
    /// use futures::StreamExt;
    ///
    /// # futures::executor::block_on(async {
    /// let values = futures::stream::iter(vec![
    ///     AsyncValue::loading(),
    ///     AsyncValue::data(1),
    ///     AsyncValue::data(2),
    /// ]);
    /// let seen: Vec<_> = values.until_settled().collect().await;
    /// assert_eq!(seen, vec![AsyncValue::loading(), AsyncValue::data(1)]);
    /// # });
    /// ```
    fn until_settled(self) -> UntilSettled<Self>
    where
        Self: Sized,
    {
        UntilSettled {
            stream: self,
            settled: false,
        }
    }
}

impl<S, T> AsyncValueStreamExt<T> for S where S: Stream<Item = AsyncValue<T>> + ?Sized {}

/// Stream returned by [`AsyncValueStreamExt::until_settled`].
#[pin_project(project = UntilSettledProj)]
#[derive(Debug)]
#[must_use = "Streams do nothing unless polled"]
pub struct UntilSettled<S> {
    #[pin]
    stream: S,
    settled: bool,
}

impl<S, T> Stream for UntilSettled<S>
where
    S: Stream<Item = AsyncValue<T>>,
{
    type Item = AsyncValue<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let UntilSettledProj { stream, settled } = self.project();

        if *settled {
            return Poll::Ready(None);
        }

        match stream.poll_next(cx) {
            Poll::Ready(Some(value)) => {
                if !value.is_loading() {
                    *settled = true;
                }
                Poll::Ready(Some(value))
            }
            Poll::Ready(None) => {
                *settled = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
