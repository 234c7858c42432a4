use crate::async_error::{CapturedError, SharedError, StackTrace};
use crate::async_value::{missing_value, AsyncData, AsyncError, AsyncLoading, AsyncValue, Recompute};

/// Controls which branch [`AsyncValue::when_with`] picks for overlapping states.
///
/// The defaults keep showing the previous result during an explicit refresh
/// and show the loading branch when a dependency triggered the reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WhenOptions {
    /// Prefer the carried value or error over `loading` while reloading.
    pub skip_loading_on_reload: bool,
    /// Prefer the carried value or error over `loading` while refreshing.
    pub skip_loading_on_refresh: bool,
    /// Prefer a retained value over `error`.
    pub skip_error: bool,
}

impl Default for WhenOptions {
    fn default() -> Self {
        WhenOptions {
            skip_loading_on_reload: false,
            skip_loading_on_refresh: true,
            skip_error: false,
        }
    }
}

impl WhenOptions {
    pub fn new() -> Self {
        WhenOptions::default()
    }

    pub fn skip_loading_on_reload(mut self, skip: bool) -> Self {
        self.skip_loading_on_reload = skip;
        self
    }

    pub fn skip_loading_on_refresh(mut self, skip: bool) -> Self {
        self.skip_loading_on_refresh = skip;
        self
    }

    pub fn skip_error(mut self, skip: bool) -> Self {
        self.skip_error = skip;
        self
    }
}

/// The branch an [`AsyncValue`] resolves to under a set of [`WhenOptions`].
#[derive(Debug, PartialEq, Eq)]
pub enum Resolved<'a, T> {
    Data(&'a T),
    Error(&'a CapturedError),
    Loading,
}

impl<T> AsyncValue<T> {
    /// Picks the branch a consumer should display.
    ///
    /// # Panics
    ///
    /// Panics if neither the loading nor the error branch applies and there is
    /// no value. The variants' constructors make this unreachable.
    pub fn resolve(&self, options: WhenOptions) -> Resolved<'_, T> {
        if self.is_loading() {
            let skip = match self.recompute() {
                Some(Recompute::Refresh) => options.skip_loading_on_refresh,
                Some(Recompute::Reload) => options.skip_loading_on_reload,
                None => false,
            };
            if !skip {
                return Resolved::Loading;
            }
        }

        if let Some(captured) = self.captured_error() {
            if !self.has_value() || !options.skip_error {
                return Resolved::Error(captured);
            }
        }

        match self.value_or_none() {
            Some(value) => Resolved::Data(value),
            None => missing_value(),
        }
    }

    /// [`when_with`](Self::when_with) using the default [`WhenOptions`].
    pub fn when<R>(
        &self,
        data: impl FnOnce(&T) -> R,
        error: impl FnOnce(&SharedError, &StackTrace) -> R,
        loading: impl FnOnce() -> R,
    ) -> R {
        self.when_with(WhenOptions::default(), data, error, loading)
    }

    /// Calls the callback for the branch chosen by [`resolve`](Self::resolve).
    pub fn when_with<R>(
        &self,
        options: WhenOptions,
        data: impl FnOnce(&T) -> R,
        error: impl FnOnce(&SharedError, &StackTrace) -> R,
        loading: impl FnOnce() -> R,
    ) -> R {
        match self.resolve(options) {
            Resolved::Data(value) => data(value),
            Resolved::Error(captured) => error(captured.error(), captured.stack_trace()),
            Resolved::Loading => loading(),
        }
    }

    /// Starts a `when` dispatch in which every branch is optional.
    ///
    /// ```
    /// use async_value::{AsyncValue, WhenOptions};
    ///
    /// let value = AsyncValue::data(21);
    /// let doubled = value
    ///     .maybe_when(WhenOptions::default())
    ///     .data(|v| v * 2)
    ///     .or_else(|| 0);
    /// assert_eq!(doubled, 42);
    ///
    /// let loading = AsyncValue::<i32>::loading().maybe_when(WhenOptions::default()).data(|v| *v).or_none();
    /// assert_eq!(loading, None);
    /// ```
    pub fn maybe_when<'a, R>(&'a self, options: WhenOptions) -> MaybeWhen<'a, T, R> {
        MaybeWhen {
            value: self,
            options,
            data: None,
            error: None,
            loading: None,
        }
    }

    /// Starts a `map` dispatch in which every branch is optional.
    pub fn maybe_map<'a, R>(&'a self) -> MaybeMap<'a, T, R> {
        MaybeMap {
            value: self,
            data: None,
            error: None,
            loading: None,
        }
    }
}

type DataFn<'a, T, R> = Box<dyn FnOnce(&T) -> R + 'a>;
type ErrorFn<'a, R> = Box<dyn FnOnce(&SharedError, &StackTrace) -> R + 'a>;
type LoadingFn<'a, R> = Box<dyn FnOnce() -> R + 'a>;

/// Builder returned by [`AsyncValue::maybe_when`].
///
/// Finish with [`or_else`](Self::or_else) for a fallback value or with
/// [`or_none`](Self::or_none) to get `None` when the chosen branch is missing.
#[must_use = "the dispatch runs only when finished with `or_else` or `or_none`"]
pub struct MaybeWhen<'a, T, R> {
    value: &'a AsyncValue<T>,
    options: WhenOptions,
    data: Option<DataFn<'a, T, R>>,
    error: Option<ErrorFn<'a, R>>,
    loading: Option<LoadingFn<'a, R>>,
}

impl<'a, T, R> MaybeWhen<'a, T, R> {
    pub fn data(mut self, f: impl FnOnce(&T) -> R + 'a) -> Self {
        self.data = Some(Box::new(f));
        self
    }

    pub fn error(mut self, f: impl FnOnce(&SharedError, &StackTrace) -> R + 'a) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn loading(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.loading = Some(Box::new(f));
        self
    }

    pub fn or_else(self, or_else: impl FnOnce() -> R) -> R {
        self.dispatch().unwrap_or_else(or_else)
    }

    pub fn or_none(self) -> Option<R> {
        self.dispatch()
    }

    fn dispatch(self) -> Option<R> {
        match self.value.resolve(self.options) {
            Resolved::Data(value) => self.data.map(|f| f(value)),
            Resolved::Error(captured) => self
                .error
                .map(|f| f(captured.error(), captured.stack_trace())),
            Resolved::Loading => self.loading.map(|f| f()),
        }
    }
}

type DataVariantFn<'a, T, R> = Box<dyn FnOnce(&AsyncData<T>) -> R + 'a>;
type ErrorVariantFn<'a, T, R> = Box<dyn FnOnce(&AsyncError<T>) -> R + 'a>;
type LoadingVariantFn<'a, T, R> = Box<dyn FnOnce(&AsyncLoading<T>) -> R + 'a>;

/// Builder returned by [`AsyncValue::maybe_map`].
#[must_use = "the dispatch runs only when finished with `or_else` or `or_none`"]
pub struct MaybeMap<'a, T, R> {
    value: &'a AsyncValue<T>,
    data: Option<DataVariantFn<'a, T, R>>,
    error: Option<ErrorVariantFn<'a, T, R>>,
    loading: Option<LoadingVariantFn<'a, T, R>>,
}

impl<'a, T, R> MaybeMap<'a, T, R> {
    pub fn data(mut self, f: impl FnOnce(&AsyncData<T>) -> R + 'a) -> Self {
        self.data = Some(Box::new(f));
        self
    }

    pub fn error(mut self, f: impl FnOnce(&AsyncError<T>) -> R + 'a) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn loading(mut self, f: impl FnOnce(&AsyncLoading<T>) -> R + 'a) -> Self {
        self.loading = Some(Box::new(f));
        self
    }

    pub fn or_else(self, or_else: impl FnOnce() -> R) -> R {
        self.dispatch().unwrap_or_else(or_else)
    }

    pub fn or_none(self) -> Option<R> {
        self.dispatch()
    }

    fn dispatch(self) -> Option<R> {
        match self.value {
            AsyncValue::Data(value) => self.data.map(|f| f(value)),
            AsyncValue::Loading(value) => self.loading.map(|f| f(value)),
            AsyncValue::Error(value) => self.error.map(|f| f(value)),
        }
    }
}
