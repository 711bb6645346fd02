// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use common::{
    CreateTaskPayload, Task, TaskPriority, TaskStatus, TaskWithUsers, UpdateTaskPayload, User,
    UserSummary,
};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::AppError;

/// Joined select used by every read path: each task row carries the display
/// data of its assignee and assigner.
const SELECT_JOINED: &str = r#"
SELECT t.id, t.title, t.description, t.assigned_to, t.assigned_by,
       t.due_date, t.due_time, t.priority, t.status, t.category,
       t.is_personal, t.created_at, t.updated_at,
       ua.name AS assigned_to_name, ua.email AS assigned_to_email,
       ub.name AS assigned_by_name, ub.email AS assigned_by_email
  FROM tasks t
  JOIN users ua ON ua.id = t.assigned_to
  JOIN users ub ON ub.id = t.assigned_by
"#;

// Ties on equal due dates keep a stable order via the id.
const ORDER_BY_DUE_DATE: &str = " ORDER BY t.due_date ASC NULLS LAST, t.id ASC";

/// Flat row shape produced by [`SELECT_JOINED`].
#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: Option<String>,
    assigned_to: String,
    assigned_by: String,
    due_date: Option<NaiveDate>,
    due_time: Option<NaiveTime>,
    priority: TaskPriority,
    status: TaskStatus,
    category: Option<String>,
    is_personal: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    assigned_to_name: String,
    assigned_to_email: String,
    assigned_by_name: String,
    assigned_by_email: String,
}

impl From<TaskRow> for TaskWithUsers {
    fn from(row: TaskRow) -> Self {
        TaskWithUsers {
            assigned_to_user: UserSummary {
                id: row.assigned_to.clone(),
                name: row.assigned_to_name,
                email: row.assigned_to_email,
            },
            assigned_by_user: UserSummary {
                id: row.assigned_by.clone(),
                name: row.assigned_by_name,
                email: row.assigned_by_email,
            },
            task: Task {
                id: row.id,
                title: row.title,
                description: row.description,
                assigned_to: row.assigned_to,
                assigned_by: row.assigned_by,
                due_date: row.due_date,
                due_time: row.due_time,
                priority: row.priority,
                status: row.status,
                category: row.category,
                is_personal: row.is_personal,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

/// Whether a task appears in this user's views at all.
pub fn visible_to(task: &Task, user: &User) -> bool {
    user.role.is_admin() || task.assigned_to == user.id || task.assigned_by == user.id
}

/// Retrieves the caller's visible task set, ordered by due date ascending.
///
/// Administrators receive every task; everyone else only sees tasks where
/// they are the assignee or the assigner.
pub async fn list_visible(pool: &SqlitePool, current: &User) -> Result<Vec<TaskWithUsers>, AppError> {
    let rows = if current.role.is_admin() {
        let query = format!("{SELECT_JOINED}{ORDER_BY_DUE_DATE}");
        sqlx::query_as::<_, TaskRow>(&query)
            .fetch_all(pool)
            .await
            .context("Failed to retrieve tasks")?
    } else {
        let query = format!(
            "{SELECT_JOINED} WHERE t.assigned_to = ?1 OR t.assigned_by = ?1{ORDER_BY_DUE_DATE}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(&current.id)
            .fetch_all(pool)
            .await
            .context("Failed to retrieve tasks")?
    };

    debug!("Loaded {} tasks for {}", rows.len(), current.id);
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Looks up one task without the joined display data.
pub async fn find_task(pool: &SqlitePool, id: i64) -> Result<Option<Task>, AppError> {
    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to look up task")?;
    Ok(task)
}

async fn fetch_joined(pool: &SqlitePool, id: i64) -> Result<TaskWithUsers, AppError> {
    let query = format!("{SELECT_JOINED} WHERE t.id = ?");
    let row = sqlx::query_as::<_, TaskRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to retrieve task")?
        .ok_or_else(|| AppError::not_found(format!("Task with ID {id} not found.")))?;
    Ok(row.into())
}

/// Creates a new task on behalf of `current`.
///
/// The title must be non-empty after trim and the assignee must be an
/// active user; both are checked before anything is written. Non-admin
/// callers are always self-assigned, whatever the payload says, and
/// `assigned_by` is always the caller.
pub async fn create_task(
    pool: &SqlitePool,
    current: &User,
    payload: CreateTaskPayload,
) -> Result<TaskWithUsers, AppError> {
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::validation("Please enter a task title."));
    }

    let assigned_to = if current.role.is_admin() {
        payload
            .assigned_to
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::validation("Please select a user to assign this task to.")
            })?
    } else {
        current.id.clone()
    };
    ensure_active_user(pool, &assigned_to).await?;

    let description = clean_optional(payload.description);
    let category = clean_optional(payload.category);
    let now = Utc::now();

    let id = sqlx::query(
        r#"
        INSERT INTO tasks (title, description, assigned_to, assigned_by, due_date, due_time,
                           priority, status, category, is_personal, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&title)
    .bind(&description)
    .bind(&assigned_to)
    .bind(&current.id)
    .bind(payload.due_date)
    .bind(payload.due_time)
    .bind(payload.priority)
    .bind(payload.status)
    .bind(&category)
    .bind(payload.is_personal)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to insert task")?
    .last_insert_rowid();

    info!("Task {} created by {}, assigned to {}", id, current.id, assigned_to);
    fetch_joined(pool, id).await
}

/// Applies a full edit to a task.
///
/// Only administrators and the original assigner may edit. Reassignment is
/// honored for administrators only; a non-admin's `assigned_to` is dropped
/// silently rather than rejected.
pub async fn update_task(
    pool: &SqlitePool,
    current: &User,
    id: i64,
    payload: UpdateTaskPayload,
) -> Result<TaskWithUsers, AppError> {
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::validation("Please enter a task title."));
    }

    let task = find_task(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Task with ID {id} not found.")))?;

    if !(current.role.is_admin() || task.assigned_by == current.id) {
        return Err(AppError::forbidden(
            "You do not have permission to edit this task.",
        ));
    }

    let assigned_to = match payload
        .assigned_to
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        Some(candidate) if current.role.is_admin() => {
            if candidate != task.assigned_to {
                ensure_active_user(pool, candidate).await?;
            }
            candidate.to_string()
        }
        _ => task.assigned_to.clone(),
    };

    let description = clean_optional(payload.description);
    let category = clean_optional(payload.category);

    sqlx::query(
        r#"
        UPDATE tasks
           SET title = ?, description = ?, assigned_to = ?, due_date = ?, due_time = ?,
               priority = ?, status = ?, category = ?, is_personal = ?, updated_at = ?
         WHERE id = ?
        "#,
    )
    .bind(&title)
    .bind(&description)
    .bind(&assigned_to)
    .bind(payload.due_date)
    .bind(payload.due_time)
    .bind(payload.priority)
    .bind(payload.status)
    .bind(&category)
    .bind(payload.is_personal)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update task")?;

    info!("Task {} updated by {}", id, current.id);
    fetch_joined(pool, id).await
}

/// Single-field status transition.
///
/// Administrators, the assigner and the assignee may change the status.
/// The status graph is unconstrained: any status may move to any other,
/// including back out of Completed or Cancelled.
pub async fn update_status(
    pool: &SqlitePool,
    current: &User,
    id: i64,
    status: TaskStatus,
) -> Result<TaskWithUsers, AppError> {
    let task = find_task(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Task with ID {id} not found.")))?;

    if !visible_to(&task, current) {
        return Err(AppError::forbidden(
            "You do not have permission to update this task.",
        ));
    }

    sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update task status")?;

    debug!("Task {} status set to {:?} by {}", id, status, current.id);
    fetch_joined(pool, id).await
}

/// Deletes a task. Only administrators and the original assigner may do
/// this; the confirmation step lives at the interface layer, not here.
pub async fn delete_task(pool: &SqlitePool, current: &User, id: i64) -> Result<(), AppError> {
    let task = find_task(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Task with ID {id} not found.")))?;

    if !(current.role.is_admin() || task.assigned_by == current.id) {
        return Err(AppError::forbidden(
            "You do not have permission to delete this task.",
        ));
    }

    sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete task")?;

    info!("Task {} deleted by {}", id, current.id);
    Ok(())
}

async fn ensure_active_user(pool: &SqlitePool, user_id: &str) -> Result<(), AppError> {
    let active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to check the assigned user")?;

    match active {
        Some(true) => Ok(()),
        Some(false) => Err(AppError::validation("The assigned user is not active.")),
        None => Err(AppError::validation("The assigned user does not exist.")),
    }
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
