// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::Context;
use chrono::{DateTime, Utc};
use common::{Comment, CommentWithAuthor, User, UserSummary};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::AppError;
use crate::tasks;

const SELECT_WITH_AUTHOR: &str = r#"
SELECT c.id, c.task_id, c.user_id, c.comment, c.created_at,
       u.name AS user_name, u.email AS user_email
  FROM task_comments c
  JOIN users u ON u.id = c.user_id
 WHERE c.task_id = ?
 ORDER BY c.created_at ASC, c.id ASC
"#;

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    task_id: i64,
    user_id: String,
    comment: String,
    created_at: DateTime<Utc>,
    user_name: String,
    user_email: String,
}

impl From<CommentRow> for CommentWithAuthor {
    fn from(row: CommentRow) -> Self {
        CommentWithAuthor {
            user: UserSummary {
                id: row.user_id.clone(),
                name: row.user_name,
                email: row.user_email,
            },
            comment: Comment {
                id: row.id,
                task_id: row.task_id,
                user_id: row.user_id,
                comment: row.comment,
                created_at: row.created_at,
            },
        }
    }
}

/// Returns the full comment thread of a task, oldest first.
///
/// Only users who can see the task can read its thread.
pub async fn list_for_task(
    pool: &SqlitePool,
    current: &User,
    task_id: i64,
) -> Result<Vec<CommentWithAuthor>, AppError> {
    let task = tasks::find_task(pool, task_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Task with ID {task_id} not found.")))?;
    if !tasks::visible_to(&task, current) {
        return Err(AppError::forbidden(
            "You do not have permission to view this task.",
        ));
    }

    let rows = sqlx::query_as::<_, CommentRow>(SELECT_WITH_AUTHOR)
        .bind(task_id)
        .fetch_all(pool)
        .await
        .context("Failed to retrieve comments")?;

    debug!("Loaded {} comments for task {}", rows.len(), task_id);
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Appends a comment and returns the refreshed thread.
///
/// The body must be non-empty after trim. The response is a re-read of the
/// whole thread rather than a local append, so the caller always sees the
/// canonical ordering even when someone else commented in between.
pub async fn append(
    pool: &SqlitePool,
    current: &User,
    task_id: i64,
    body: &str,
) -> Result<Vec<CommentWithAuthor>, AppError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::validation("Please enter a comment."));
    }

    let task = tasks::find_task(pool, task_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Task with ID {task_id} not found.")))?;
    if !tasks::visible_to(&task, current) {
        return Err(AppError::forbidden(
            "You do not have permission to comment on this task.",
        ));
    }

    sqlx::query(
        "INSERT INTO task_comments (task_id, user_id, comment, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(task_id)
    .bind(&current.id)
    .bind(body)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to insert comment")?;

    list_for_task(pool, current, task_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{self, Principal};
    use common::{CreateTaskPayload, Role, TaskPriority, TaskStatus};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory SQLite");
        crate::database::init_schema(&pool).await.unwrap();
        pool
    }

    async fn seed_user(pool: &SqlitePool, id: &str, email: &str, role: Role) -> User {
        let user = identity::resolve(
            pool,
            &Principal {
                id: id.to_string(),
                email: email.to_string(),
            },
        )
        .await
        .unwrap();
        sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
        User { role, ..user }
    }

    async fn seed_task(pool: &SqlitePool, owner: &User) -> i64 {
        let task = tasks::create_task(
            pool,
            owner,
            CreateTaskPayload {
                title: "Discussed work".to_string(),
                description: None,
                assigned_to: None,
                due_date: None,
                due_time: None,
                priority: TaskPriority::Medium,
                status: TaskStatus::Todo,
                category: None,
                is_personal: false,
            },
        )
        .await
        .unwrap();
        task.id
    }

    #[tokio::test]
    async fn append_returns_the_whole_thread_in_order() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice", "alice@example.com", Role::Employee).await;
        let task_id = seed_task(&pool, &alice).await;

        append(&pool, &alice, task_id, "first").await.unwrap();
        let thread = append(&pool, &alice, task_id, "second").await.unwrap();

        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].comment.comment, "first");
        assert_eq!(thread[1].comment.comment, "second");
        assert_eq!(thread[0].user.id, "alice");
    }

    #[tokio::test]
    async fn blank_comments_are_rejected() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice", "alice@example.com", Role::Employee).await;
        let task_id = seed_task(&pool, &alice).await;

        let err = append(&pool, &alice, task_id, "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(list_for_task(&pool, &alice, task_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bystanders_cannot_read_or_write_the_thread() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice", "alice@example.com", Role::Employee).await;
        let carol = seed_user(&pool, "carol", "carol@example.com", Role::Employee).await;
        let admin = seed_user(&pool, "bob", "bob@example.com", Role::Administrator).await;
        let task_id = seed_task(&pool, &alice).await;

        let err = list_for_task(&pool, &carol, task_id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = append(&pool, &carol, task_id, "drive-by").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // Administrators can always join the conversation.
        append(&pool, &admin, task_id, "looks good").await.unwrap();
    }

    #[tokio::test]
    async fn comments_are_removed_with_their_task() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice", "alice@example.com", Role::Employee).await;
        let task_id = seed_task(&pool, &alice).await;
        append(&pool, &alice, task_id, "soon gone").await.unwrap();

        tasks::delete_task(&pool, &alice, task_id).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM task_comments WHERE task_id = ?")
            .bind(task_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
