#![allow(dead_code)]

use async_value::{AsyncValue, IntoAsyncValue};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FetchError(pub &'static str);

/// A minimal provider: it owns the published value of one computation and
/// counts how often subscribers would have been notified.
pub struct Provider<T> {
    current: AsyncValue<T>,
    notifications: usize,
}

impl<T: Clone + PartialEq> Provider<T> {
    pub fn new() -> Self {
        Provider {
            current: AsyncValue::loading(),
            notifications: 0,
        }
    }

    pub fn current(&self) -> &AsyncValue<T> {
        &self.current
    }

    pub fn notifications(&self) -> usize {
        self.notifications
    }

    /// A recomputation starts: the fresh loading state absorbs the previous one.
    pub fn start(&mut self, is_refresh: bool) {
        let next = AsyncValue::loading().copy_with_previous(&self.current, is_refresh);
        self.publish(next);
    }

    pub fn complete(&mut self, result: impl IntoAsyncValue<T>) {
        let next = result.into_async_value().copy_with_previous(&self.current, true);
        self.publish(next);
    }

    fn publish(&mut self, next: AsyncValue<T>) {
        if next != self.current {
            self.current = next;
            self.notifications += 1;
        }
    }
}
