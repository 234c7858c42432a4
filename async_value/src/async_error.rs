use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

/// A cheaply cloneable handle to an arbitrary error object.
///
/// Any `std::error::Error + Send + Sync + 'static` converts into a `SharedError`,
/// so a failing computation never has to agree on a common error type with the
/// code that consumes its [`AsyncValue`](crate::AsyncValue).
///
/// Two handles are equal only if they point at the same error allocation.
/// Cloning a handle keeps it equal to the original, while constructing a new
/// error from the same message does not.
#[derive(Clone)]
pub struct SharedError {
    inner: Arc<dyn StdError + Send + Sync + 'static>,
}

impl SharedError {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        SharedError {
            inner: Arc::new(error),
        }
    }

    /// Creates an error from a plain message.
    pub fn msg(message: impl fmt::Display) -> Self {
        SharedError::new(ComputationError::Message(message.to_string()))
    }

    pub fn from_boxed(error: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        SharedError {
            inner: Arc::from(error),
        }
    }

    pub fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.inner
    }

    /// Returns the original error if it is of type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    pub fn is<E>(&self) -> bool
    where
        E: StdError + 'static,
    {
        self.inner.is::<E>()
    }

    pub fn ptr_eq(&self, other: &SharedError) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E> From<E> for SharedError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        SharedError::new(error)
    }
}

impl PartialEq for SharedError {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for SharedError {}

impl Hash for SharedError {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as *const ()).hash(state)
    }
}

impl fmt::Debug for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

/// The stack trace paired with a [`SharedError`].
///
/// Capturing follows the `RUST_BACKTRACE` / `RUST_LIB_BACKTRACE` environment
/// variables; when capture is disabled the trace is still present, just empty.
/// Like [`SharedError`], traces compare by identity.
#[derive(Clone)]
pub struct StackTrace {
    inner: Arc<Backtrace>,
}

impl StackTrace {
    pub fn capture() -> Self {
        StackTrace {
            inner: Arc::new(Backtrace::capture()),
        }
    }

    /// Captures a trace regardless of the environment configuration.
    pub fn force_capture() -> Self {
        StackTrace {
            inner: Arc::new(Backtrace::force_capture()),
        }
    }

    pub fn disabled() -> Self {
        StackTrace {
            inner: Arc::new(Backtrace::disabled()),
        }
    }

    pub fn is_captured(&self) -> bool {
        self.inner.status() == BacktraceStatus::Captured
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.inner
    }

    pub fn ptr_eq(&self, other: &StackTrace) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for StackTrace {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for StackTrace {}

impl Hash for StackTrace {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state)
    }
}

impl fmt::Debug for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

/// An error together with the trace recorded where it was caught.
///
/// This is what every read path hands back when it re-raises a stored failure:
/// the same error allocation and the same trace, never a fresh copy.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
#[error("{error}")]
pub struct CapturedError {
    error: SharedError,
    stack_trace: StackTrace,
}

impl CapturedError {
    pub fn new(error: impl Into<SharedError>, stack_trace: StackTrace) -> Self {
        CapturedError {
            error: error.into(),
            stack_trace,
        }
    }

    /// Wraps `error` with a trace captured at the call site.
    pub fn capture(error: impl Into<SharedError>) -> Self {
        CapturedError::new(error, StackTrace::capture())
    }

    pub fn error(&self) -> &SharedError {
        &self.error
    }

    pub fn stack_trace(&self) -> &StackTrace {
        &self.stack_trace
    }

    pub fn into_parts(self) -> (SharedError, StackTrace) {
        (self.error, self.stack_trace)
    }
}

/// Failures raised by this crate on behalf of a computation.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ComputationError {
    /// A general error with a message describing what went wrong.
    #[error("{0}")]
    Message(String),

    /// The computation panicked; holds the panic message when it was a string.
    #[error("computation panicked: {0}")]
    Panicked(String),

    /// The computation was cancelled before completion.
    #[error("Task was cancelled!")]
    Cancelled,

    /// The computation did not finish before its deadline.
    #[error("deadline has elapsed!")]
    Timeout,
}

impl ComputationError {
    pub fn is_message(&self) -> bool {
        matches!(self, ComputationError::Message(_))
    }

    pub fn is_panicked(&self) -> bool {
        matches!(self, ComputationError::Panicked(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ComputationError::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ComputationError::Timeout)
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "Box<dyn Any>".to_string()
        };
        ComputationError::Panicked(message)
    }
}
