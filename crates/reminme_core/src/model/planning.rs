//! Habits and project tasks.
//!
//! # Invariants
//! - A habit has at most one check per calendar date.
//! - Subtasks share the project of their parent task.

use super::{
    clean_optional, require_text, validate_optional_date, RecordId, UserId, ValidationError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitCadence {
    #[default]
    Daily,
    Weekly,
}

impl HabitCadence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: RecordId,
    pub user_id: UserId,
    pub title: String,
    pub cadence: HabitCadence,
    pub archived: bool,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HabitDraft {
    pub title: String,
    pub cadence: HabitCadence,
    pub archived: bool,
}

impl HabitDraft {
    pub fn cleaned(self) -> Result<Self, ValidationError> {
        require_text("title", &self.title)?;
        Ok(Self {
            title: self.title.trim().to_string(),
            cadence: self.cadence,
            archived: self.archived,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitCheck {
    pub id: RecordId,
    pub habit_id: RecordId,
    pub check_date: String,
    pub created_at: i64,
}

/// Result of toggling a habit check for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitCheckToggle {
    pub habit_id: RecordId,
    pub check_date: String,
    /// Whether the date is checked after the toggle.
    pub checked: bool,
}

/// Habit with derived progress for the requested day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitProgress {
    #[serde(flatten)]
    pub habit: Habit,
    pub checked_today: bool,
    pub streak: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTask {
    pub id: RecordId,
    pub user_id: UserId,
    pub project: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub parent_task_id: Option<RecordId>,
    pub due_date: Option<String>,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskDraft {
    pub project: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub parent_task_id: Option<RecordId>,
    pub due_date: Option<String>,
}

impl TaskDraft {
    pub fn cleaned(self) -> Result<Self, ValidationError> {
        require_text("project", &self.project)?;
        require_text("title", &self.title)?;
        let due_date = clean_optional(self.due_date);
        validate_optional_date("due_date", due_date.as_deref())?;
        Ok(Self {
            project: self.project.trim().to_string(),
            title: self.title.trim().to_string(),
            description: clean_optional(self.description),
            status: self.status,
            priority: self.priority,
            parent_task_id: self.parent_task_id,
            due_date,
        })
    }
}

/// Partial update for a task. An empty `due_date` string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<String>,
    pub position: Option<i64>,
}

impl TaskPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = self.title.as_deref() {
            require_text("title", title)?;
        }
        match self.due_date.as_deref().map(str::trim) {
            Some("") | None => Ok(()),
            Some(value) => validate_optional_date("due_date", Some(value)),
        }
    }
}

/// Child task generated by a breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubtaskDraft {
    pub title: String,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{TaskDraft, TaskPatch, TaskStatus};

    #[test]
    fn task_draft_requires_project_and_title() {
        let draft = TaskDraft {
            title: "Write docs".to_string(),
            ..TaskDraft::default()
        };
        assert_eq!(draft.cleaned().unwrap_err().field, "project");
    }

    #[test]
    fn task_patch_rejects_bad_due_date() {
        let patch = TaskPatch {
            due_date: Some("tomorrow".to_string()),
            ..TaskPatch::default()
        };
        assert_eq!(patch.validate().unwrap_err().field, "due_date");
    }

    #[test]
    fn task_status_round_trips_wire_names() {
        for status in [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
    }
}
