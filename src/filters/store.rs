//! Reactive holder for the current task filters

use super::{DateRange, TaskFilters};
use crate::api::models::{EffortLevel, TaskStatus, TaskType};
use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::debug;

/// Holds the current [`TaskFilters`] and publishes every change through a
/// `tokio::sync::watch` channel.
///
/// A second channel carries the derived "any filter active" flag, only
/// notifying when the flag actually flips.
#[derive(Debug, Clone)]
pub struct FilterStore {
    filters: watch::Sender<TaskFilters>,
    active: watch::Sender<bool>,
}

/// Add `value` if absent, remove it if present. An emptied list is `None`.
fn toggle<T: PartialEq>(current: Option<Vec<T>>, value: T) -> Option<Vec<T>> {
    let mut values = current.unwrap_or_default();
    if let Some(pos) = values.iter().position(|v| *v == value) {
        values.remove(pos);
    } else {
        values.push(value);
    }
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// Drop repeated values, keeping first occurrences. An empty list is `None`.
fn distinct<T: PartialEq>(values: Vec<T>) -> Option<Vec<T>> {
    let mut unique = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    if unique.is_empty() {
        None
    } else {
        Some(unique)
    }
}

impl FilterStore {
    pub fn new() -> Self {
        Self::with_filters(TaskFilters::default())
    }

    pub fn with_filters(filters: TaskFilters) -> Self {
        let active = filters.is_active();
        let (filters, _) = watch::channel(filters);
        let (active, _) = watch::channel(active);
        Self { filters, active }
    }

    /// Receiver that observes every filter change
    pub fn subscribe(&self) -> watch::Receiver<TaskFilters> {
        self.filters.subscribe()
    }

    /// Receiver of the derived "any filter active" flag
    pub fn watch_active(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }

    /// Snapshot of the current filters
    pub fn current(&self) -> TaskFilters {
        self.filters.borrow().clone()
    }

    pub fn has_active_filters(&self) -> bool {
        *self.active.borrow()
    }

    /// Apply an arbitrary change to the filters
    pub fn set_filter<F>(&self, f: F)
    where
        F: FnOnce(&mut TaskFilters),
    {
        self.filters.send_modify(f);
        self.sync_active();
    }

    /// Replace all filters at once
    pub fn set_filters(&self, filters: TaskFilters) {
        self.filters.send_replace(filters);
        self.sync_active();
    }

    /// Back to the defaults (nothing filtered)
    pub fn reset(&self) {
        self.set_filters(TaskFilters::default());
    }

    pub fn toggle_status(&self, status: TaskStatus) {
        self.set_filter(|f| f.status = toggle(f.status.take(), status));
    }

    pub fn toggle_task_type(&self, task_type: TaskType) {
        self.set_filter(|f| f.task_types = toggle(f.task_types.take(), task_type));
    }

    pub fn toggle_effort(&self, effort: EffortLevel) {
        self.set_filter(|f| f.efforts = toggle(f.efforts.take(), effort));
    }

    pub fn set_statuses(&self, statuses: Vec<TaskStatus>) {
        self.set_filter(|f| f.status = distinct(statuses));
    }

    pub fn set_task_types(&self, task_types: Vec<TaskType>) {
        self.set_filter(|f| f.task_types = distinct(task_types));
    }

    pub fn set_efforts(&self, efforts: Vec<EffortLevel>) {
        self.set_filter(|f| f.efforts = distinct(efforts));
    }

    /// Set the scheduled-date window; cleared when both ends are absent
    pub fn set_date_range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.set_filter(|f| {
            f.date_range = if start.is_some() || end.is_some() {
                Some(DateRange { start, end })
            } else {
                None
            };
        });
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.set_filter(|f| f.search_query = if query.is_empty() { None } else { Some(query) });
    }

    pub fn set_has_deadline(&self, has_deadline: Option<bool>) {
        self.set_filter(|f| f.has_deadline = has_deadline);
    }

    pub fn set_parent_id(&self, parent_id: Option<i64>) {
        self.set_filter(|f| f.parent_id = parent_id);
    }

    /// Quick filter: tasks scheduled today. Clears overdue and the date range.
    pub fn show_only_today(&self) {
        self.set_filter(|f| {
            f.only_today = true;
            f.only_overdue = false;
            f.date_range = None;
        });
    }

    /// Quick filter: overdue tasks. Clears today and the date range.
    pub fn show_only_overdue(&self) {
        self.set_filter(|f| {
            f.only_overdue = true;
            f.only_today = false;
            f.date_range = None;
        });
    }

    /// Drop the quick filters and the date range, keep everything else
    pub fn show_all(&self) {
        self.set_filter(|f| {
            f.only_today = false;
            f.only_overdue = false;
            f.date_range = None;
        });
    }

    fn sync_active(&self) {
        let active = self.filters.borrow().is_active();
        self.active.send_if_modified(|current| {
            if *current == active {
                false
            } else {
                *current = active;
                true
            }
        });
        debug!(active, "Task filters updated");
    }
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new()
    }
}
