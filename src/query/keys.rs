//! Structured cache keys for task queries

use crate::filters::TaskFilters;
use std::fmt;

/// One element of a [`QueryKey`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySegment {
    Name(&'static str),
    Filters(TaskFilters),
    Id(i64),
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Name(name) => f.write_str(name),
            KeySegment::Filters(filters) => write!(f, "{{{}}}", filters.to_query_params()),
            KeySegment::Id(id) => write!(f, "{}", id),
        }
    }
}

/// Hierarchical cache key. A key matches a filter when the filter's segments
/// are a prefix of its own, so `["tasks", "list"]` targets every list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    /// True when `prefix` is a (non-strict) prefix of this key
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    fn child(&self, segment: KeySegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", segment)?;
        }
        f.write_str("]")
    }
}

/// Key factory for task queries
pub struct TaskKeys;

impl TaskKeys {
    /// `["tasks"]`
    pub fn all() -> QueryKey {
        QueryKey(vec![KeySegment::Name("tasks")])
    }

    /// `["tasks", "list"]`
    pub fn lists() -> QueryKey {
        Self::all().child(KeySegment::Name("list"))
    }

    /// `["tasks", "list", filters]`; every filter combination gets its own entry.
    /// Empty lists and an empty search key the same as absent ones.
    pub fn list(filters: &TaskFilters) -> QueryKey {
        Self::lists().child(KeySegment::Filters(filters.normalized()))
    }

    /// `["tasks", "detail"]`
    pub fn details() -> QueryKey {
        Self::all().child(KeySegment::Name("detail"))
    }

    /// `["tasks", "detail", id]`
    pub fn detail(id: i64) -> QueryKey {
        Self::details().child(KeySegment::Id(id))
    }
}
