//! Remote document store access.

pub mod api;
pub mod enumerator;
pub mod retry;

pub use api::{DocumentApi, HttpDocumentClient};
pub use enumerator::{Enumerator, PageSelection};
pub use retry::{RetryPolicy, retry_with_backoff};
