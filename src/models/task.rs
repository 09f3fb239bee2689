use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::api::{coerce, Schema};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub task_type: TaskType,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub recurrence_pattern: String,
    pub completed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[sqlx(rename = "one-time")]
    #[serde(rename = "one-time")]
    OneTime,
    Periodic,
}

impl Default for TaskType {
    fn default() -> Self {
        Self::OneTime
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Cancelled,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(()),
        }
    }
}

/// `completed_at` after a status change from `previous` to `next`: stamped on
/// entering `completed`, cleared on `pending`, otherwise left as it was.
pub fn completion_stamp(
    previous: TaskStatus,
    stamped: Option<NaiveDateTime>,
    next: TaskStatus,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    match next {
        TaskStatus::Pending => None,
        TaskStatus::Completed if previous != TaskStatus::Completed => Some(now),
        _ => stamped,
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct TaskWithCategory {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: Task,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_id")]
    pub category_id: Option<i64>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub task_type: Option<TaskType>,
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "coerce::opt_time")]
    pub due_time: Option<NaiveTime>,
    pub priority: Option<TaskPriority>,
    pub recurrence_pattern: Option<String>,
}

impl Schema for CreateTaskRequest {
    const REQUIRED: &'static [&'static str] = &["title"];
}

/// Partial update: provided fields are merged over the stored row. The
/// nullable columns take `Some(None)` to clear them.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "coerce::clearable_id")]
    pub category_id: Option<Option<i64>>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub task_type: Option<TaskType>,
    #[serde(default, deserialize_with = "coerce::clearable_date")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "coerce::clearable_time")]
    pub due_time: Option<Option<NaiveTime>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub recurrence_pattern: Option<String>,
}

impl Schema for UpdateTaskRequest {
    const REQUIRED: &'static [&'static str] = &[];
}

impl UpdateTaskRequest {
    /// Stored row with the provided fields applied and `completed_at`
    /// following the status transition.
    pub fn merge_into(self, existing: Task, now: NaiveDateTime) -> Task {
        let status = self.status.unwrap_or(existing.status);
        let completed_at = completion_stamp(existing.status, existing.completed_at, status, now);

        Task {
            title: self.title.unwrap_or(existing.title),
            description: self.description.unwrap_or(existing.description),
            category_id: self.category_id.unwrap_or(existing.category_id),
            icon: self.icon.unwrap_or(existing.icon),
            color: self.color.unwrap_or(existing.color),
            task_type: self.task_type.unwrap_or(existing.task_type),
            due_date: self.due_date.unwrap_or(existing.due_date),
            due_time: self.due_time.unwrap_or(existing.due_time),
            priority: self.priority.unwrap_or(existing.priority),
            recurrence_pattern: self.recurrence_pattern.unwrap_or(existing.recurrence_pattern),
            status,
            completed_at,
            ..existing
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub status: Option<String>,
    pub today: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn task(status: TaskStatus, completed_at: Option<NaiveDateTime>) -> Task {
        Task {
            id: 1,
            user_id: 1,
            category_id: Some(3),
            title: "Write report".into(),
            description: "quarterly".into(),
            icon: "task".into(),
            color: "#FF4081".into(),
            task_type: TaskType::OneTime,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 20),
            due_time: None,
            priority: TaskPriority::High,
            status,
            recurrence_pattern: String::new(),
            completed_at,
            created_at: at(8),
        }
    }

    #[test]
    fn test_stamp_on_entering_completed() {
        let stamp = completion_stamp(TaskStatus::Pending, None, TaskStatus::Completed, at(10));
        assert_eq!(stamp, Some(at(10)));
    }

    #[test]
    fn test_stamp_kept_when_already_completed() {
        let stamp =
            completion_stamp(TaskStatus::Completed, Some(at(9)), TaskStatus::Completed, at(10));
        assert_eq!(stamp, Some(at(9)));
    }

    #[test]
    fn test_stamp_cleared_on_pending_and_kept_on_cancel() {
        assert_eq!(
            completion_stamp(TaskStatus::Completed, Some(at(9)), TaskStatus::Pending, at(10)),
            None
        );
        assert_eq!(
            completion_stamp(TaskStatus::Completed, Some(at(9)), TaskStatus::Cancelled, at(10)),
            Some(at(9))
        );
    }

    #[test]
    fn test_merge_keeps_omitted_fields() {
        let update = UpdateTaskRequest {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        let merged = update.merge_into(task(TaskStatus::Pending, None), at(11));
        assert_eq!(merged.title, "Write report");
        assert_eq!(merged.description, "quarterly");
        assert_eq!(merged.category_id, Some(3));
        assert_eq!(merged.priority, TaskPriority::High);
        assert_eq!(merged.status, TaskStatus::Completed);
        assert_eq!(merged.completed_at, Some(at(11)));
    }

    #[test]
    fn test_merge_clears_nullable_fields_sent_empty() {
        let update: UpdateTaskRequest = serde_json::from_value(serde_json::json!({
            "due_date": null,
            "category_id": ""
        }))
        .unwrap();
        let merged = update.merge_into(task(TaskStatus::Pending, None), at(11));
        assert_eq!(merged.due_date, None);
        assert_eq!(merged.category_id, None);
        assert_eq!(merged.title, "Write report");
    }

    #[test]
    fn test_task_type_wire_names() {
        assert_eq!(serde_json::to_value(TaskType::OneTime).unwrap(), "one-time");
        let parsed: TaskType = serde_json::from_value(serde_json::json!("periodic")).unwrap();
        assert_eq!(parsed, TaskType::Periodic);
        assert_eq!("cancelled".parse::<TaskStatus>(), Ok(TaskStatus::Cancelled));
    }
}
