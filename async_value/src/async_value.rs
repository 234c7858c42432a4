use crate::async_error::{CapturedError, ComputationError, SharedError, StackTrace};
use std::panic::{self, AssertUnwindSafe};

/// The state of an asynchronously produced value.
///
/// Unlike a plain `Result`, the three states may overlap: a value can be
/// loading while the previous payload is still shown, or failed while keeping
/// the last good payload around. The variant says which situation produced
/// the value; the accessors below report the overlapping flags.
///
/// Values are immutable. A new state is derived from the previous one with
/// [`AsyncValue::copy_with_previous`] instead of being edited in place.
///
/// Equality is structural over the variant and all of its fields. Errors and
/// traces compare by identity, see [`SharedError`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AsyncValue<T> {
    Data(AsyncData<T>),
    Loading(AsyncLoading<T>),
    Error(AsyncError<T>),
}

/// Why a value that already carries a result is loading again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recompute {
    /// The recomputation was requested explicitly (refresh, invalidate).
    Refresh,
    /// A watched dependency changed.
    Reload,
}

impl Recompute {
    pub fn is_refresh(&self) -> bool {
        matches!(self, Recompute::Refresh)
    }

    pub fn is_reload(&self) -> bool {
        matches!(self, Recompute::Reload)
    }
}

/// A value is available. It may be refreshing in the background.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AsyncData<T> {
    value: T,
    is_loading: bool,
}

impl<T> AsyncData<T> {
    pub fn new(value: T) -> Self {
        AsyncData {
            value,
            is_loading: false,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Data always wins: the previous state is ignored.
    pub fn copy_with_previous(self, _previous: &AsyncValue<T>, _is_refresh: bool) -> Self {
        self
    }
}

/// A computation is in flight.
///
/// When produced by a dependency-driven reload, the loading state still
/// carries the value and error of the state it replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AsyncLoading<T> {
    value: Option<T>,
    error: Option<CapturedError>,
}

impl<T> AsyncLoading<T> {
    pub fn new() -> Self {
        AsyncLoading {
            value: None,
            error: None,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn error(&self) -> Option<&CapturedError> {
        self.error.as_ref()
    }

    /// Merges a fresh loading state with the state it replaces.
    ///
    /// With `is_refresh` the result keeps the shape of `previous` and is
    /// flagged as loading. Without it the result stays a loading state that
    /// carries the previous value and error verbatim.
    pub fn copy_with_previous(self, previous: &AsyncValue<T>, is_refresh: bool) -> AsyncValue<T>
    where
        T: Clone,
    {
        match (previous, is_refresh) {
            (AsyncValue::Data(data), true) => AsyncValue::Data(AsyncData {
                value: data.value.clone(),
                is_loading: true,
            }),
            (AsyncValue::Error(error), true) => AsyncValue::Error(AsyncError {
                captured: error.captured.clone(),
                value: error.value.clone(),
                is_loading: true,
            }),
            (AsyncValue::Loading(_), true) => AsyncValue::Loading(self),
            (AsyncValue::Data(data), false) => AsyncValue::Loading(AsyncLoading {
                value: Some(data.value.clone()),
                error: None,
            }),
            (AsyncValue::Error(error), false) => AsyncValue::Loading(AsyncLoading {
                value: error.value.clone(),
                error: Some(error.captured.clone()),
            }),
            (AsyncValue::Loading(loading), false) => AsyncValue::Loading(loading.clone()),
        }
    }
}

impl<T> Default for AsyncLoading<T> {
    fn default() -> Self {
        AsyncLoading::new()
    }
}

/// A computation failed. The last good value may be retained.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AsyncError<T> {
    captured: CapturedError,
    value: Option<T>,
    is_loading: bool,
}

impl<T> AsyncError<T> {
    pub fn new(error: impl Into<SharedError>, stack_trace: StackTrace) -> Self {
        AsyncError::from_captured(CapturedError::new(error, stack_trace))
    }

    pub fn from_captured(captured: CapturedError) -> Self {
        AsyncError {
            captured,
            value: None,
            is_loading: false,
        }
    }

    pub fn error(&self) -> &SharedError {
        self.captured.error()
    }

    pub fn stack_trace(&self) -> &StackTrace {
        self.captured.stack_trace()
    }

    pub fn captured(&self) -> &CapturedError {
        &self.captured
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Reads the retained value, re-raising the stored error when there is none.
    pub fn value(&self) -> Result<&T, CapturedError> {
        self.value.as_ref().ok_or_else(|| self.captured.clone())
    }

    pub fn value_or_none(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Keeps this error but takes the value of `previous`, so a stale payload
    /// survives into the failed state.
    pub fn copy_with_previous(self, previous: &AsyncValue<T>, _is_refresh: bool) -> Self
    where
        T: Clone,
    {
        AsyncError {
            captured: self.captured,
            value: previous.value_or_none().cloned(),
            is_loading: self.is_loading,
        }
    }
}

impl<T> AsyncValue<T> {
    pub fn data(value: T) -> Self {
        AsyncValue::Data(AsyncData::new(value))
    }

    pub fn loading() -> Self {
        AsyncValue::Loading(AsyncLoading::new())
    }

    pub fn fail(error: impl Into<SharedError>, stack_trace: StackTrace) -> Self {
        AsyncValue::Error(AsyncError::new(error, stack_trace))
    }

    pub fn is_loading(&self) -> bool {
        match self {
            AsyncValue::Data(data) => data.is_loading,
            AsyncValue::Loading(_) => true,
            AsyncValue::Error(error) => error.is_loading,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value_or_none().is_some()
    }

    pub fn has_error(&self) -> bool {
        self.captured_error().is_some()
    }

    /// Tells apart the two ways a value that already carries a result can be
    /// loading again. `None` for settled values and for first-time loads.
    pub fn recompute(&self) -> Option<Recompute> {
        if !self.has_value() && !self.has_error() {
            return None;
        }
        match self {
            AsyncValue::Loading(_) => Some(Recompute::Reload),
            _ if self.is_loading() => Some(Recompute::Refresh),
            _ => None,
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.recompute() == Some(Recompute::Refresh)
    }

    pub fn is_reloading(&self) -> bool {
        self.recompute() == Some(Recompute::Reload)
    }

    pub fn captured_error(&self) -> Option<&CapturedError> {
        match self {
            AsyncValue::Data(_) => None,
            AsyncValue::Loading(loading) => loading.error.as_ref(),
            AsyncValue::Error(error) => Some(&error.captured),
        }
    }

    pub fn error(&self) -> Option<&SharedError> {
        self.captured_error().map(CapturedError::error)
    }

    pub fn stack_trace(&self) -> Option<&StackTrace> {
        self.captured_error().map(CapturedError::stack_trace)
    }

    /// The current value if there is one. Never fails.
    pub fn value_or_none(&self) -> Option<&T> {
        match self {
            AsyncValue::Data(data) => Some(&data.value),
            AsyncValue::Loading(loading) => loading.value.as_ref(),
            AsyncValue::Error(error) => error.value.as_ref(),
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            AsyncValue::Data(data) => Some(data.value),
            AsyncValue::Loading(loading) => loading.value,
            AsyncValue::Error(error) => error.value,
        }
    }

    /// Reads the value.
    ///
    /// An error without a retained value re-raises the stored error and its
    /// original trace. A loading state without a value reads as `None`.
    pub fn value(&self) -> Result<Option<&T>, CapturedError> {
        match self {
            AsyncValue::Error(error) => error.value().map(Some),
            _ => Ok(self.value_or_none()),
        }
    }

    /// Reads the value, re-raising the stored error if there is no value.
    ///
    /// # Panics
    ///
    /// Panics if there is neither a value nor an error, i.e. on a loading
    /// state with nothing carried over. Callers must check
    /// [`has_value`](Self::has_value) or [`has_error`](Self::has_error) first.
    pub fn require_value(&self) -> Result<&T, CapturedError> {
        if let Some(value) = self.value_or_none() {
            return Ok(value);
        }
        match self.captured_error() {
            Some(captured) => Err(captured.clone()),
            None => missing_value(),
        }
    }

    pub fn as_data(&self) -> Option<&AsyncData<T>> {
        match self {
            AsyncValue::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_loading(&self) -> Option<&AsyncLoading<T>> {
        match self {
            AsyncValue::Loading(loading) => Some(loading),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&AsyncError<T>> {
        match self {
            AsyncValue::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Absorbs what `previous` knew into this freshly constructed value.
    ///
    /// This is the single transition a scheduler applies when it publishes a
    /// new state: call it on a fresh [`AsyncValue::loading`] when a
    /// recomputation starts, with `is_refresh` set when the recomputation was
    /// requested explicitly rather than triggered by a dependency.
    pub fn copy_with_previous(self, previous: &AsyncValue<T>, is_refresh: bool) -> AsyncValue<T>
    where
        T: Clone,
    {
        match self {
            AsyncValue::Data(data) => AsyncValue::Data(data.copy_with_previous(previous, is_refresh)),
            AsyncValue::Loading(loading) => loading.copy_with_previous(previous, is_refresh),
            AsyncValue::Error(error) => {
                AsyncValue::Error(error.copy_with_previous(previous, is_refresh))
            }
        }
    }

    /// Drops everything carried over from previous states.
    ///
    /// Data and errors lose their loading flag and retained value; loading
    /// states become a plain [`AsyncValue::loading`].
    pub fn unwrap_previous(self) -> AsyncValue<T> {
        match self {
            AsyncValue::Data(data) => AsyncValue::data(data.value),
            AsyncValue::Loading(_) => AsyncValue::loading(),
            AsyncValue::Error(error) => AsyncValue::Error(AsyncError::from_captured(error.captured)),
        }
    }

    /// Exhaustive dispatch on the variant. Each callback receives the variant
    /// itself so the overlapping flags stay inspectable.
    pub fn map<R>(
        &self,
        data: impl FnOnce(&AsyncData<T>) -> R,
        error: impl FnOnce(&AsyncError<T>) -> R,
        loading: impl FnOnce(&AsyncLoading<T>) -> R,
    ) -> R {
        match self {
            AsyncValue::Data(value) => data(value),
            AsyncValue::Loading(value) => loading(value),
            AsyncValue::Error(value) => error(value),
        }
    }

    /// Transforms the payload while keeping the loading and error shape.
    ///
    /// A panic inside `f` does not escape: it becomes an error state without a
    /// value.
    pub fn when_data<U>(&self, f: impl FnOnce(&T) -> U) -> AsyncValue<U> {
        self.map_data(|value| {
            panic::catch_unwind(AssertUnwindSafe(|| f(value)))
                .map_err(|payload| CapturedError::capture(ComputationError::from_panic(payload)))
        })
    }

    /// Like [`when_data`](Self::when_data) for a fallible transformation.
    /// An `Err` from `f` becomes an error state without a value.
    pub fn try_when_data<U, E>(&self, f: impl FnOnce(&T) -> Result<U, E>) -> AsyncValue<U>
    where
        E: Into<SharedError>,
    {
        self.map_data(|value| f(value).map_err(CapturedError::capture))
    }

    fn map_data<U>(&self, f: impl FnOnce(&T) -> Result<U, CapturedError>) -> AsyncValue<U> {
        match self {
            AsyncValue::Data(data) => match f(&data.value) {
                Ok(value) => AsyncValue::Data(AsyncData {
                    value,
                    is_loading: data.is_loading,
                }),
                Err(captured) => AsyncValue::Error(AsyncError {
                    captured,
                    value: None,
                    is_loading: data.is_loading,
                }),
            },
            AsyncValue::Loading(_) => AsyncValue::loading(),
            AsyncValue::Error(error) => AsyncValue::Error(AsyncError {
                captured: error.captured.clone(),
                value: None,
                is_loading: error.is_loading,
            }),
        }
    }
}

impl<T> Default for AsyncValue<T> {
    fn default() -> Self {
        AsyncValue::loading()
    }
}

impl<T> From<AsyncData<T>> for AsyncValue<T> {
    fn from(value: AsyncData<T>) -> Self {
        AsyncValue::Data(value)
    }
}

impl<T> From<AsyncLoading<T>> for AsyncValue<T> {
    fn from(value: AsyncLoading<T>) -> Self {
        AsyncValue::Loading(value)
    }
}

impl<T> From<AsyncError<T>> for AsyncValue<T> {
    fn from(value: AsyncError<T>) -> Self {
        AsyncValue::Error(value)
    }
}

pub(crate) fn missing_value() -> ! {
    panic!("tried to read the value of an AsyncValue that has neither a value nor an error")
}
