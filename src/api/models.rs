//! Task models and request DTOs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of task tracked by the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Deadline,
    Chore,
    Streak,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Deadline => "deadline",
            TaskType::Chore => "chore",
            TaskType::Streak => "streak",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deadline" => Ok(TaskType::Deadline),
            "chore" => Ok(TaskType::Chore),
            "streak" => Ok(TaskType::Streak),
            other => Err(format!(
                "unknown task type '{}' (expected deadline, chore or streak)",
                other
            )),
        }
    }
}

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("unknown status '{}' (expected todo or done)", other)),
        }
    }
}

/// T-shirt sized effort estimate
///
/// - `S`: under 15 minutes
/// - `M`: about an hour
/// - `L`: two to three hours
/// - `XL`: too big, needs breaking down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffortLevel {
    S,
    M,
    L,
    XL,
}

impl EffortLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffortLevel::S => "S",
            EffortLevel::M => "M",
            EffortLevel::L => "L",
            EffortLevel::XL => "XL",
        }
    }
}

impl fmt::Display for EffortLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EffortLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "S" => Ok(EffortLevel::S),
            "M" => Ok(EffortLevel::M),
            "L" => Ok(EffortLevel::L),
            "XL" => Ok(EffortLevel::XL),
            other => Err(format!("unknown effort '{}' (expected S, M, L or XL)", other)),
        }
    }
}

/// A task as returned by the API, with nested children populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Absent only for tasks that have not been persisted yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub task_type: TaskType,
    #[serde(default)]
    pub status: TaskStatus,

    /// The "do date"
    #[serde(default)]
    pub scheduled_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub effort: Option<EffortLevel>,

    // Deadlines
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub deadline: Option<NaiveDateTime>,

    // Chores
    #[serde(default)]
    pub recurrence_interval_days: Option<u32>,

    // Streaks
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub best_streak: u32,

    #[serde(default)]
    pub children: Vec<Task>,

    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub last_completed_at: Option<NaiveDateTime>,
}

/// Request to create a new task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<EffortLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    /// Required by the server for root deadline tasks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_interval_days: Option<u32>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            title: title.into(),
            task_type,
            description: None,
            scheduled_date: None,
            effort: None,
            parent_id: None,
            deadline: None,
            recurrence_interval_days: None,
        }
    }
}

/// Partial update of a task; only fields that are set are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<EffortLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_interval_days: Option<u32>,
}

impl TaskUpdate {
    /// True when no field would be sent
    pub fn is_empty(&self) -> bool {
        self == &TaskUpdate::default()
    }
}

/// Response of a delete call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub ok: bool,
}
