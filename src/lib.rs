//! Timely client
//!
//! Client-side data layer for the Timely task planner:
//! - Typed HTTP client for the task REST API
//! - Filter store that serializes to list query parameters
//! - Reactive query cache with optimistic task completion

pub mod api;
pub mod filters;
pub mod query;

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use api::{ApiClient, Task, TaskApi};
use filters::FilterStore;
use query::{QueryCache, TaskMutations, TaskQueries};

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub api: ApiYamlConfig,
    pub cache: CacheYamlConfig,
}

/// API connection section. The bearer token is deliberately absent: it only
/// comes from the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiYamlConfig {
    pub base_url: String,
    pub base_path: String,
    pub timeout_secs: u64,
}

impl Default for ApiYamlConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            base_path: "/timely/api".into(),
            timeout_secs: 30,
        }
    }
}

/// Query cache section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheYamlConfig {
    pub stale_time_secs: u64,
    /// Unwritten entries are dropped after this long
    pub gc_time_secs: u64,
}

impl Default for CacheYamlConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: query::DEFAULT_STALE_TIME.as_secs(),
            gc_time_secs: query::DEFAULT_GC_TIME.as_secs(),
        }
    }
}

// ============================================================================
// Runtime config (what the client actually uses)
// ============================================================================

/// Connection settings for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub base_path: String,
    /// Sent as `Authorization: Bearer <token>` when present
    pub token: Option<String>,
    pub timeout_secs: u64,
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub stale_time: Duration,
    pub gc_time: Duration,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration from environment variables and `config.yaml` in CWD
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        let base_url = std::env::var("TIMELY_API_URL").unwrap_or(yaml.api.base_url);
        if base_url.trim().is_empty() {
            anyhow::bail!("API base URL must not be empty");
        }

        Ok(Self {
            api: ApiConfig {
                base_url,
                base_path: std::env::var("TIMELY_API_BASE_PATH").unwrap_or(yaml.api.base_path),
                token: std::env::var("TIMELY_API_TOKEN")
                    .ok()
                    .filter(|t| !t.is_empty()),
                timeout_secs: env_parse("TIMELY_API_TIMEOUT_SECS")
                    .unwrap_or(yaml.api.timeout_secs),
            },
            stale_time: Duration::from_secs(
                env_parse("TIMELY_STALE_TIME_SECS").unwrap_or(yaml.cache.stale_time_secs),
            ),
            gc_time: Duration::from_secs(
                env_parse("TIMELY_GC_TIME_SECS").unwrap_or(yaml.cache.gc_time_secs),
            ),
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

/// Shared client state: API, cache, current filters and the bindings between them
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn TaskApi>,
    pub cache: QueryCache,
    pub filters: FilterStore,
    pub queries: TaskQueries,
    pub mutations: TaskMutations,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create state backed by the HTTP client
    pub fn new(config: Config) -> Result<Self> {
        let api = Arc::new(ApiClient::new(&config.api)?);
        Ok(Self::with_api(api, config))
    }

    /// Create state over any [`TaskApi`] implementation
    pub fn with_api(api: Arc<dyn TaskApi>, config: Config) -> Self {
        let cache = QueryCache::new().with_gc_time(config.gc_time);
        let queries =
            TaskQueries::new(api.clone(), cache.clone()).with_stale_time(config.stale_time);
        let mutations = TaskMutations::new(api.clone(), cache.clone());
        Self {
            api,
            cache,
            filters: FilterStore::new(),
            queries,
            mutations,
            config: Arc::new(config),
        }
    }

    /// Tasks matching the current filters
    pub async fn visible_tasks(&self) -> api::ApiResult<Vec<Task>> {
        self.queries.tasks(&self.filters.current()).await
    }
}

// ============================================================================
// Tests
// ============================================================================
