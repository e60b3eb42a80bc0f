pub mod api;
pub mod config;
pub mod files;
pub mod page;
pub mod retry;

pub use page::group_by_category;
pub use retry::{send_with_retry, HttpError, RetryPolicy};
