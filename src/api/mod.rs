//! Typed HTTP client for the task API

pub mod client;
pub mod error;
pub mod models;
pub mod traits;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use models::{DeleteResponse, EffortLevel, NewTask, Task, TaskStatus, TaskType, TaskUpdate};
pub use traits::TaskApi;

#[cfg(test)]
pub(crate) mod mock;
