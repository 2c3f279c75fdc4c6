//! In-memory mock implementation of TaskApi for testing without a real server.

use super::error::{ApiError, ApiResult};
use super::models::{DeleteResponse, NewTask, Task, TaskStatus, TaskUpdate};
use super::traits::TaskApi;
use crate::filters::TaskFilters;
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, Semaphore};

/// In-memory mock implementation of TaskApi.
///
/// Stores root tasks in a `Vec` behind an async `RwLock`. Filtering mirrors
/// the server for the fields it understands; date filters are ignored.
/// Failures can be injected with [`MockTaskApi::fail_next`] and completions
/// can be held back with [`MockTaskApi::gate_completions`].
pub struct MockTaskApi {
    tasks: RwLock<Vec<Task>>,
    next_id: AtomicI64,
    list_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    next_failure: Mutex<Option<u16>>,
    completion_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl MockTaskApi {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
            list_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
            next_failure: Mutex::new(None),
            completion_gate: Mutex::new(None),
        }
    }

    /// Seed the store with tasks created from the given payloads
    pub async fn with_tasks(self, tasks: Vec<NewTask>) -> Self {
        for task in tasks {
            let _ = self.insert(&task).await;
        }
        self
    }

    /// Number of list fetches served so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of detail fetches served so far
    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    /// Make the next call fail with the given HTTP status
    pub async fn fail_next(&self, status: u16) {
        *self.next_failure.lock().await = Some(status);
    }

    /// Hold `complete_task` calls until permits are added to the returned semaphore
    pub async fn gate_completions(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.completion_gate.lock().await = Some(gate.clone());
        gate
    }

    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    async fn take_failure(&self) -> ApiResult<()> {
        match self.next_failure.lock().await.take() {
            Some(status) => Err(ApiError::Status {
                status,
                body: "injected failure".to_string(),
            }),
            None => Ok(()),
        }
    }

    async fn insert(&self, task: &NewTask) -> Task {
        let created = Task {
            id: Some(self.next_id.fetch_add(1, Ordering::SeqCst)),
            title: task.title.clone(),
            description: task.description.clone(),
            task_type: task.task_type,
            status: TaskStatus::Todo,
            scheduled_date: task.scheduled_date,
            effort: task.effort,
            parent_id: task.parent_id,
            deadline: task.deadline,
            recurrence_interval_days: task.recurrence_interval_days,
            current_streak: 0,
            best_streak: 0,
            children: Vec::new(),
            created_at: Some(chrono::Local::now().naive_local()),
            last_completed_at: None,
        };
        self.tasks.write().await.push(created.clone());
        created
    }

    async fn modify<F>(&self, task_id: i64, f: F) -> ApiResult<Task>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == Some(task_id))
            .ok_or_else(not_found)?;
        f(task);
        Ok(task.clone())
    }
}

impl Default for MockTaskApi {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found() -> ApiError {
    ApiError::Status {
        status: 404,
        body: r#"{"detail":"Task not found"}"#.to_string(),
    }
}

fn matches_filters(task: &Task, filters: &TaskFilters) -> bool {
    if let Some(ref status) = filters.status {
        if !status.contains(&task.status) {
            return false;
        }
    }
    if let Some(ref types) = filters.task_types {
        if !types.contains(&task.task_type) {
            return false;
        }
    }
    if let Some(ref efforts) = filters.efforts {
        if !task.effort.is_some_and(|e| efforts.contains(&e)) {
            return false;
        }
    }
    if let Some(ref query) = filters.search_query {
        if !task.title.to_lowercase().contains(&query.to_lowercase()) {
            return false;
        }
    }
    if let Some(has_deadline) = filters.has_deadline {
        if task.deadline.is_some() != has_deadline {
            return false;
        }
    }
    task.parent_id == filters.parent_id
}

#[async_trait]
impl TaskApi for MockTaskApi {
    async fn get_tasks(&self, filters: &TaskFilters) -> ApiResult<Vec<Task>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure().await?;
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .filter(|t| matches_filters(t, filters))
            .cloned()
            .collect())
    }

    async fn get_task(&self, task_id: i64) -> ApiResult<Task> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure().await?;
        let tasks = self.tasks.read().await;
        tasks
            .iter()
            .find(|t| t.id == Some(task_id))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn create_task(&self, task: &NewTask) -> ApiResult<Task> {
        self.take_failure().await?;
        Ok(self.insert(task).await)
    }

    async fn complete_task(&self, task_id: i64) -> ApiResult<Task> {
        let gate = self.completion_gate.lock().await.clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.take_failure().await?;
        self.modify(task_id, |t| {
            t.status = TaskStatus::Done;
            t.last_completed_at = Some(chrono::Local::now().naive_local());
        })
        .await
    }

    async fn uncomplete_task(&self, task_id: i64) -> ApiResult<Task> {
        self.take_failure().await?;
        self.modify(task_id, |t| t.status = TaskStatus::Todo).await
    }

    async fn update_task(&self, task_id: i64, updates: &TaskUpdate) -> ApiResult<Task> {
        self.take_failure().await?;
        let updates = updates.clone();
        self.modify(task_id, move |t| {
            if let Some(title) = updates.title {
                t.title = title;
            }
            if let Some(description) = updates.description {
                t.description = Some(description);
            }
            if let Some(task_type) = updates.task_type {
                t.task_type = task_type;
            }
            if let Some(status) = updates.status {
                t.status = status;
            }
            if updates.scheduled_date.is_some() {
                t.scheduled_date = updates.scheduled_date;
            }
            if updates.effort.is_some() {
                t.effort = updates.effort;
            }
            if updates.parent_id.is_some() {
                t.parent_id = updates.parent_id;
            }
            if updates.deadline.is_some() {
                t.deadline = updates.deadline;
            }
            if updates.recurrence_interval_days.is_some() {
                t.recurrence_interval_days = updates.recurrence_interval_days;
            }
        })
        .await
    }

    async fn delete_task(&self, task_id: i64) -> ApiResult<DeleteResponse> {
        self.take_failure().await?;
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.id != Some(task_id));
        if tasks.len() == before {
            return Err(not_found());
        }
        Ok(DeleteResponse { ok: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{EffortLevel, TaskType};

    async fn seeded() -> MockTaskApi {
        let mut quick = NewTask::new("Take out trash", TaskType::Chore);
        quick.effort = Some(EffortLevel::S);
        MockTaskApi::new()
            .with_tasks(vec![quick, NewTask::new("Read paper", TaskType::Deadline)])
            .await
    }

    #[tokio::test]
    async fn test_get_tasks_filters_by_effort() {
        let api = seeded().await;
        let filters = TaskFilters {
            efforts: Some(vec![EffortLevel::S]),
            ..Default::default()
        };
        let tasks = api.get_tasks(&filters).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Take out trash");
        assert_eq!(api.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let api = seeded().await;
        api.fail_next(500).await;
        let err = api.complete_task(1).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        let task = api.complete_task(1).await.unwrap();
        assert_eq!(task.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_missing_task_is_404() {
        let api = seeded().await;
        assert!(api.get_task(99).await.unwrap_err().is_not_found());
        assert!(api.delete_task(99).await.unwrap_err().is_not_found());
    }
}
