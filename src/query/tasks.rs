//! Task queries and mutations bound to the query cache

use super::cache::{QueryCache, QueryData};
use super::keys::TaskKeys;
use crate::api::error::ApiResult;
use crate::api::models::{DeleteResponse, NewTask, Task, TaskUpdate};
use crate::api::traits::TaskApi;
use crate::filters::TaskFilters;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// How long a fetched list is served from cache before refetching
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

/// Read side: list and detail queries served through the cache
#[derive(Clone)]
pub struct TaskQueries {
    api: Arc<dyn TaskApi>,
    cache: QueryCache,
    stale_time: Duration,
}

impl TaskQueries {
    pub fn new(api: Arc<dyn TaskApi>, cache: QueryCache) -> Self {
        Self {
            api,
            cache,
            stale_time: DEFAULT_STALE_TIME,
        }
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Tasks matching `filters`, cached under `["tasks", "list", filters]`
    pub async fn tasks(&self, filters: &TaskFilters) -> ApiResult<Vec<Task>> {
        let api = self.api.clone();
        let owned = filters.clone();
        self.cache
            .fetch_query(TaskKeys::list(filters), self.stale_time, || async move {
                api.get_tasks(&owned).await
            })
            .await
    }

    /// A single task, cached under `["tasks", "detail", id]`
    pub async fn task(&self, task_id: i64) -> ApiResult<Task> {
        let api = self.api.clone();
        self.cache
            .fetch_query(TaskKeys::detail(task_id), self.stale_time, || async move {
                api.get_task(task_id).await
            })
            .await
    }
}

/// Remove a task, and any nested occurrence of it, from a list
fn without_task(tasks: Vec<Task>, task_id: i64) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|t| t.id != Some(task_id))
        .map(|mut t| {
            t.children = without_task(std::mem::take(&mut t.children), task_id);
            t
        })
        .collect()
}

/// Write side: every mutation refreshes the list caches once it settles
#[derive(Clone)]
pub struct TaskMutations {
    api: Arc<dyn TaskApi>,
    cache: QueryCache,
}

impl TaskMutations {
    pub fn new(api: Arc<dyn TaskApi>, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    pub async fn create(&self, task: &NewTask) -> ApiResult<Task> {
        let created = self.api.create_task(task).await?;
        self.cache.invalidate_queries(&TaskKeys::lists()).await;
        Ok(created)
    }

    /// Mark a task done with an optimistic update.
    ///
    /// The task disappears from every cached list before the request is sent.
    /// If the request fails the lists are restored from a snapshot. Either way
    /// the lists are invalidated afterwards so they are refetched.
    pub async fn complete(&self, task_id: i64) -> ApiResult<Task> {
        let lists = TaskKeys::lists();

        self.cache.cancel_queries(&lists).await;
        let snapshot = self.cache.get_queries_data(&lists).await;
        let updated = self
            .cache
            .set_queries_data(&lists, |data| match data {
                QueryData::Tasks(tasks) => QueryData::Tasks(without_task(tasks, task_id)),
                other => other,
            })
            .await;
        debug!(task_id, lists = updated, "Optimistically removed completed task");

        let result = self.api.complete_task(task_id).await;

        if let Err(ref e) = result {
            warn!(task_id, error = %e, "Completing task failed, rolling back");
            self.cache.restore(snapshot).await;
        } else {
            self.cache.invalidate_queries(&TaskKeys::detail(task_id)).await;
        }
        self.cache.invalidate_queries(&lists).await;

        result
    }

    pub async fn uncomplete(&self, task_id: i64) -> ApiResult<Task> {
        let task = self.api.uncomplete_task(task_id).await?;
        self.cache.invalidate_queries(&TaskKeys::lists()).await;
        self.cache.invalidate_queries(&TaskKeys::detail(task_id)).await;
        Ok(task)
    }

    pub async fn update(&self, task_id: i64, updates: &TaskUpdate) -> ApiResult<Task> {
        let task = self.api.update_task(task_id, updates).await?;
        self.cache.invalidate_queries(&TaskKeys::lists()).await;
        self.cache.invalidate_queries(&TaskKeys::detail(task_id)).await;
        Ok(task)
    }

    pub async fn delete(&self, task_id: i64) -> ApiResult<DeleteResponse> {
        let resp = self.api.delete_task(task_id).await?;
        self.cache.invalidate_queries(&TaskKeys::lists()).await;
        self.cache.remove_queries(&TaskKeys::detail(task_id)).await;
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTaskApi;
    use crate::api::models::{EffortLevel, TaskStatus, TaskType};

    async fn setup() -> (Arc<MockTaskApi>, QueryCache, TaskQueries, TaskMutations) {
        let mut quick = NewTask::new("Dishes", TaskType::Chore);
        quick.effort = Some(EffortLevel::S);
        let api = Arc::new(
            MockTaskApi::new()
                .with_tasks(vec![
                    quick,
                    NewTask::new("Run", TaskType::Streak),
                    NewTask::new("Essay", TaskType::Deadline),
                ])
                .await,
        );
        let cache = QueryCache::new();
        let dyn_api: Arc<dyn TaskApi> = api.clone();
        let queries = TaskQueries::new(dyn_api.clone(), cache.clone());
        let mutations = TaskMutations::new(dyn_api, cache.clone());
        (api, cache, queries, mutations)
    }

    fn ids(tasks: &[Task]) -> Vec<i64> {
        tasks.iter().filter_map(|t| t.id).collect()
    }

    async fn cached_ids(cache: &QueryCache, filters: &TaskFilters) -> Vec<i64> {
        match cache.get_query_data(&TaskKeys::list(filters)).await {
            Some(QueryData::Tasks(tasks)) => ids(&tasks),
            other => panic!("expected cached list, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_query_served_from_cache() {
        let (api, _cache, queries, _) = setup().await;
        let filters = TaskFilters::default();

        assert_eq!(ids(&queries.tasks(&filters).await.unwrap()), vec![1, 2, 3]);
        assert_eq!(ids(&queries.tasks(&filters).await.unwrap()), vec![1, 2, 3]);
        assert_eq!(api.list_calls(), 1);

        // Different filters are a different cache entry
        let quick = TaskFilters {
            efforts: Some(vec![EffortLevel::S]),
            ..Default::default()
        };
        assert_eq!(ids(&queries.tasks(&quick).await.unwrap()), vec![1]);
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_create_invalidates_lists() {
        let (api, _cache, queries, mutations) = setup().await;
        let filters = TaskFilters::default();
        queries.tasks(&filters).await.unwrap();

        let created = mutations
            .create(&NewTask::new("Laundry", TaskType::Chore))
            .await
            .unwrap();
        assert_eq!(created.id, Some(4));

        let tasks = queries.tasks(&filters).await.unwrap();
        assert_eq!(ids(&tasks), vec![1, 2, 3, 4]);
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_complete_removes_task_before_request_resolves() {
        let (api, cache, queries, mutations) = setup().await;
        let all = TaskFilters::default();
        let todo = TaskFilters {
            status: Some(vec![TaskStatus::Todo]),
            ..Default::default()
        };
        queries.tasks(&all).await.unwrap();
        queries.tasks(&todo).await.unwrap();

        let gate = api.gate_completions().await;
        let pending = tokio::spawn({
            let mutations = mutations.clone();
            async move { mutations.complete(2).await }
        });

        // Wait until the optimistic update has been applied
        let mut rx = cache.subscribe();
        while cached_ids(&cache, &all).await.contains(&2) {
            let _ = rx.recv().await;
        }
        assert_eq!(cached_ids(&cache, &all).await, vec![1, 3]);
        assert_eq!(cached_ids(&cache, &todo).await, vec![1, 3]);

        gate.add_permits(1);
        let done = pending.await.unwrap().unwrap();
        assert_eq!(done.status, TaskStatus::Done);

        // Settled: lists are stale and refetched on next read
        let stale = Duration::from_secs(30);
        assert!(cache.is_stale(&TaskKeys::list(&all), stale).await);
        let calls = api.list_calls();
        assert_eq!(ids(&queries.tasks(&todo).await.unwrap()), vec![1, 3]);
        assert_eq!(api.list_calls(), calls + 1);
    }

    #[tokio::test]
    async fn test_complete_failure_rolls_back_snapshot() {
        let (api, cache, queries, mutations) = setup().await;
        let all = TaskFilters::default();
        queries.tasks(&all).await.unwrap();

        api.fail_next(500).await;
        let err = mutations.complete(1).await.unwrap_err();
        assert_eq!(err.status(), Some(500));

        assert_eq!(cached_ids(&cache, &all).await, vec![1, 2, 3]);
        assert!(
            cache
                .is_stale(&TaskKeys::list(&all), Duration::from_secs(30))
                .await
        );
        let unchanged = api.snapshot().await;
        assert!(unchanged.iter().all(|t| t.status == TaskStatus::Todo));
    }

    #[test]
    fn test_complete_prunes_nested_children() {
        let mut parent = Task {
            id: Some(10),
            title: "Project".to_string(),
            description: None,
            task_type: TaskType::Deadline,
            status: TaskStatus::Todo,
            scheduled_date: None,
            effort: None,
            parent_id: None,
            deadline: None,
            recurrence_interval_days: None,
            current_streak: 0,
            best_streak: 0,
            children: vec![],
            created_at: None,
            last_completed_at: None,
        };
        let mut child = parent.clone();
        child.id = Some(11);
        child.parent_id = Some(10);
        parent.children.push(child);

        let pruned = without_task(vec![parent], 11);
        assert_eq!(pruned.len(), 1);
        assert!(pruned[0].children.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_uncomplete_refresh_detail() {
        let (api, _cache, queries, mutations) = setup().await;
        assert_eq!(queries.task(3).await.unwrap().title, "Essay");

        mutations
            .update(
                3,
                &TaskUpdate {
                    title: Some("Essay v2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(queries.task(3).await.unwrap().title, "Essay v2");

        mutations.complete(3).await.unwrap();
        mutations.uncomplete(3).await.unwrap();
        assert_eq!(queries.task(3).await.unwrap().status, TaskStatus::Todo);
        assert_eq!(api.detail_calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_mutation_does_not_invalidate() {
        let (api, cache, queries, mutations) = setup().await;
        let all = TaskFilters::default();
        queries.tasks(&all).await.unwrap();

        api.fail_next(422).await;
        assert!(mutations.delete(2).await.is_err());
        assert!(
            !cache
                .is_stale(&TaskKeys::list(&all), Duration::from_secs(30))
                .await
        );
    }

    #[tokio::test]
    async fn test_delete_removes_detail_and_invalidates_lists() {
        let (_api, cache, queries, mutations) = setup().await;
        queries.task(2).await.unwrap();
        queries.tasks(&TaskFilters::default()).await.unwrap();

        assert!(mutations.delete(2).await.unwrap().ok);
        assert!(cache.get_query_data(&TaskKeys::detail(2)).await.is_none());
        assert_eq!(
            ids(&queries.tasks(&TaskFilters::default()).await.unwrap()),
            vec![1, 3]
        );
    }
}
