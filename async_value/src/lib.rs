mod async_error;
mod async_store;
mod async_value;
mod into_async_value;
mod stream_ext;
mod when;

pub use async_error::*;
pub use async_store::*;
pub use async_value::*;
pub use into_async_value::*;
pub use stream_ext::*;
pub use when::*;

#[cfg(test)]
mod unit_tests;
