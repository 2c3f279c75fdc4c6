//! Query cache and the task queries/mutations built on it

pub mod cache;
pub mod keys;
pub mod tasks;

pub use cache::{CacheEvent, QueryCache, QueryData, QueryValue, DEFAULT_GC_TIME};
pub use keys::{KeySegment, QueryKey, TaskKeys};
pub use tasks::{TaskMutations, TaskQueries, DEFAULT_STALE_TIME};
