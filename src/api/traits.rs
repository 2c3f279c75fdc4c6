//! Trait abstraction for the task API

use super::error::ApiResult;
use super::models::{DeleteResponse, NewTask, Task, TaskUpdate};
use crate::filters::TaskFilters;
use async_trait::async_trait;

/// Every call the client layer makes against the task API.
///
/// `ApiClient` talks HTTP; `MockTaskApi` keeps tasks in memory so the query
/// cache can be exercised without a server.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Fetch root tasks (children nested) matching the filters
    async fn get_tasks(&self, filters: &TaskFilters) -> ApiResult<Vec<Task>>;

    /// Fetch a single task by id
    async fn get_task(&self, task_id: i64) -> ApiResult<Task>;

    async fn create_task(&self, task: &NewTask) -> ApiResult<Task>;

    /// Mark a task done. Recurrence and streak bookkeeping happen server-side.
    async fn complete_task(&self, task_id: i64) -> ApiResult<Task>;

    /// Revert a task to todo
    async fn uncomplete_task(&self, task_id: i64) -> ApiResult<Task>;

    async fn update_task(&self, task_id: i64, updates: &TaskUpdate) -> ApiResult<Task>;

    async fn delete_task(&self, task_id: i64) -> ApiResult<DeleteResponse>;
}
