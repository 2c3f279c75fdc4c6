//! Task list filters and their query-string form
//!
//! [`TaskFilters`] is the value the list view is driven by; [`FilterStore`]
//! holds the current one and notifies subscribers when it changes.

mod store;

pub use store::FilterStore;

use crate::api::models::{EffortLevel, TaskStatus, TaskType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Inclusive scheduled-date window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_set(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

/// Which tasks to display.
///
/// Absence is `None`, never an empty list: togglers collapse an emptied list
/// back to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskFilters {
    pub status: Option<Vec<TaskStatus>>,
    pub task_types: Option<Vec<TaskType>>,
    pub date_range: Option<DateRange>,
    pub only_today: bool,
    pub only_overdue: bool,
    pub search_query: Option<String>,
    pub efforts: Option<Vec<EffortLevel>>,
    pub has_deadline: Option<bool>,
    /// Restrict to subtasks of this task
    pub parent_id: Option<i64>,
}

fn non_empty<T>(values: &Option<Vec<T>>) -> Option<&[T]> {
    values.as_deref().filter(|v| !v.is_empty())
}

impl TaskFilters {
    /// True when any filter narrows the list
    pub fn is_active(&self) -> bool {
        non_empty(&self.status).is_some()
            || non_empty(&self.task_types).is_some()
            || self.only_today
            || self.only_overdue
            || self.date_range.is_some_and(|r| r.is_set())
            || self.search_query.as_deref().is_some_and(|q| !q.is_empty())
            || non_empty(&self.efforts).is_some()
            || self.has_deadline.is_some()
            || self.parent_id.is_some()
    }

    /// Same filters with empty values collapsed to `None`.
    ///
    /// Two filter values that serialize to the same query string normalise
    /// to the same value.
    pub fn normalized(&self) -> TaskFilters {
        TaskFilters {
            status: non_empty(&self.status).map(<[_]>::to_vec),
            task_types: non_empty(&self.task_types).map(<[_]>::to_vec),
            date_range: self.date_range.filter(DateRange::is_set),
            only_today: self.only_today,
            only_overdue: self.only_overdue,
            search_query: self.search_query.clone().filter(|q| !q.is_empty()),
            efforts: non_empty(&self.efforts).map(<[_]>::to_vec),
            has_deadline: self.has_deadline,
            parent_id: self.parent_id,
        }
    }

    /// Serialize to URL query parameters for the list request.
    ///
    /// Returns `""` when nothing is set, otherwise `?` followed by
    /// form-urlencoded pairs in a fixed order. List values repeat the key.
    pub fn to_query_params(&self) -> String {
        let mut params = form_urlencoded::Serializer::new(String::new());

        for status in non_empty(&self.status).unwrap_or_default() {
            params.append_pair("status", status.as_str());
        }
        for task_type in non_empty(&self.task_types).unwrap_or_default() {
            params.append_pair("task_type", task_type.as_str());
        }
        if self.only_today {
            params.append_pair("only_today", "true");
        }
        if self.only_overdue {
            params.append_pair("only_overdue", "true");
        }
        if let Some(range) = self.date_range {
            if let Some(start) = range.start {
                params.append_pair("start_date", &start.format("%Y-%m-%d").to_string());
            }
            if let Some(end) = range.end {
                params.append_pair("end_date", &end.format("%Y-%m-%d").to_string());
            }
        }
        if let Some(query) = self.search_query.as_deref().filter(|q| !q.is_empty()) {
            params.append_pair("search", query);
        }
        for effort in non_empty(&self.efforts).unwrap_or_default() {
            params.append_pair("effort", effort.as_str());
        }
        if let Some(has_deadline) = self.has_deadline {
            params.append_pair("has_deadline", if has_deadline { "true" } else { "false" });
        }
        if let Some(parent_id) = self.parent_id {
            params.append_pair("parent_id", &parent_id.to_string());
        }

        let query = params.finish();
        if query.is_empty() {
            query
        } else {
            format!("?{}", query)
        }
    }
}
