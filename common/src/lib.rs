// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of application roles.
///
/// Historic rows may carry lowercase spellings (`admin`, `employee`, ...),
/// so parsing accepts both forms while the canonical spelling is what we
/// write back. Admin checks must go through [`Role::is_admin`]; nothing
/// else in the codebase compares role strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Role {
    #[serde(alias = "admin")]
    Administrator,
    #[serde(alias = "manager")]
    Manager,
    #[default]
    #[serde(alias = "employee")]
    Employee,
    #[serde(alias = "volunteer")]
    Volunteer,
}

impl Role {
    /// The one admin predicate. `Administrator` is the only privileged role.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Administrator)
    }

    /// Canonical spelling, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::Manager => "Manager",
            Role::Employee => "Employee",
            Role::Volunteer => "Volunteer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Administrator" | "admin" => Ok(Role::Administrator),
            "Manager" | "manager" => Ok(Role::Manager),
            "Employee" | "employee" => Ok(Role::Employee),
            "Volunteer" | "volunteer" => Ok(Role::Volunteer),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ParseRoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// An application user profile.
///
/// The id equals the authentication principal's id once the profile is
/// reconciled; there is exactly one profile per principal. Users are never
/// hard-deleted here, only deactivated via `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(json)]
    pub services: Vec<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display data for a user embedded in a joined row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A user as offered in the assignee candidate list.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DirectoryUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

/// Task status. Every direct transition between any two statuses is legal,
/// including re-opening a completed or cancelled task; there is no terminal
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
pub enum TaskStatus {
    #[default]
    Todo,
    #[serde(rename = "In Progress")]
    #[sqlx(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Represents a task within the system.
///
/// `assigned_to` is the user responsible for the work, `assigned_by` the
/// user who created/delegated it; the two may be the same user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: String,
    pub assigned_by: String,
    // NaiveDate/NaiveTime because due dates are wall-calendar values
    // without a timezone.
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub category: Option<String>,
    pub is_personal: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task joined with the display data of its assignee and assigner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWithUsers {
    #[serde(flatten)]
    pub task: Task,
    pub assigned_to_user: UserSummary,
    pub assigned_by_user: UserSummary,
}

impl std::ops::Deref for TaskWithUsers {
    type Target = Task;
    fn deref(&self) -> &Self::Target {
        &self.task
    }
}

/// Structure used to receive task creation data from the API.
/// It's a good practice to separate database models (`Task`)
/// from API models (`CreateTaskPayload`), as they may have different fields.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTaskPayload {
    pub title: String,
    pub description: Option<String>,
    /// Ignored for non-admin callers, who are always self-assigned.
    pub assigned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    pub category: Option<String>,
    #[serde(default)]
    pub is_personal: bool,
}

/// Full-edit payload, mirroring the task form: every field is sent, absent
/// optional fields clear the stored value.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTaskPayload {
    pub title: String,
    pub description: Option<String>,
    /// Honored only when the caller is an administrator; silently dropped
    /// otherwise.
    pub assigned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub category: Option<String>,
    #[serde(default)]
    pub is_personal: bool,
}

/// Single-field status transition, the one edit an assignee may make on a
/// task they did not create.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: TaskStatus,
}

/// An append-only comment on a task. Comments are immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,
    pub user_id: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCommentPayload {
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_both_spellings() {
        assert_eq!("Administrator".parse::<Role>().unwrap(), Role::Administrator);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Administrator);
        assert_eq!("employee".parse::<Role>().unwrap(), Role::Employee);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn only_administrator_is_admin() {
        assert!(Role::Administrator.is_admin());
        assert!(!Role::Manager.is_admin());
        assert!(!Role::Employee.is_admin());
        assert!(!Role::Volunteer.is_admin());
    }

    #[test]
    fn status_serializes_with_space() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let back: TaskStatus = serde_json::from_str("\"In Progress\"").unwrap();
        assert_eq!(back, TaskStatus::InProgress);
    }

    #[test]
    fn payload_defaults() {
        let payload: CreateTaskPayload =
            serde_json::from_str(r#"{ "title": "Draft report" }"#).unwrap();
        assert_eq!(payload.priority, TaskPriority::Medium);
        assert_eq!(payload.status, TaskStatus::Todo);
        assert!(!payload.is_personal);
    }
}
