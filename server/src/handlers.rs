// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use common::{
    CreateCommentPayload, CreateTaskPayload, TaskPriority, TaskStatus, UpdateStatusPayload,
    UpdateTaskPayload,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::calendar::{self, MonthGrid, Viewport};
use crate::error::AppError;
use crate::identity::{self, Principal};
use crate::{comments, directory, tasks};

/// Resolves the caller's profile, creating or reconciling it as needed.
pub async fn me(
    State(pool): State<SqlitePool>,
    principal: Principal,
) -> Result<Json<common::User>, AppError> {
    let user = identity::resolve(&pool, &principal).await?;
    Ok(Json(user))
}

/// Lists the users the caller may assign tasks to.
pub async fn list_users(
    State(pool): State<SqlitePool>,
    principal: Principal,
) -> Result<Json<Vec<common::DirectoryUser>>, AppError> {
    let current = identity::resolve(&pool, &principal).await?;
    let users = directory::assignable_users(&pool, &current).await?;
    info!("Returning {} assignable users to {}", users.len(), current.id);
    Ok(Json(users))
}

/// Lists the caller's visible tasks, joined with user display data.
pub async fn list_tasks(
    State(pool): State<SqlitePool>,
    principal: Principal,
) -> Result<Json<Vec<common::TaskWithUsers>>, AppError> {
    let current = identity::resolve(&pool, &principal).await?;
    let tasks = tasks::list_visible(&pool, &current).await?;
    info!("Successfully retrieved {} tasks.", tasks.len());
    Ok(Json(tasks))
}

pub async fn create_task(
    State(pool): State<SqlitePool>,
    principal: Principal,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<(StatusCode, Json<common::TaskWithUsers>), AppError> {
    let current = identity::resolve(&pool, &principal).await?;
    let task = tasks::create_task(&pool, &current, payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(pool): State<SqlitePool>,
    principal: Principal,
    Path(task_id): Path<i64>,
    Json(payload): Json<UpdateTaskPayload>,
) -> Result<Json<common::TaskWithUsers>, AppError> {
    let current = identity::resolve(&pool, &principal).await?;
    let task = tasks::update_task(&pool, &current, task_id, payload).await?;
    Ok(Json(task))
}

pub async fn update_task_status(
    State(pool): State<SqlitePool>,
    principal: Principal,
    Path(task_id): Path<i64>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Json<common::TaskWithUsers>, AppError> {
    let current = identity::resolve(&pool, &principal).await?;
    let task = tasks::update_status(&pool, &current, task_id, payload.status).await?;
    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    confirm: bool,
}

/// Deletes a task. The first call must be re-issued with `?confirm=true`;
/// without it the request is rejected so a stray click cannot destroy data.
pub async fn delete_task(
    State(pool): State<SqlitePool>,
    principal: Principal,
    Path(task_id): Path<i64>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, AppError> {
    let current = identity::resolve(&pool, &principal).await?;
    if !query.confirm {
        return Err(AppError::validation(
            "Deletion must be confirmed with confirm=true.",
        ));
    }

    tasks::delete_task(&pool, &current, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_comments(
    State(pool): State<SqlitePool>,
    principal: Principal,
    Path(task_id): Path<i64>,
) -> Result<Json<Vec<common::CommentWithAuthor>>, AppError> {
    let current = identity::resolve(&pool, &principal).await?;
    let thread = comments::list_for_task(&pool, &current, task_id).await?;
    Ok(Json(thread))
}

/// Appends a comment and responds with the refreshed thread.
pub async fn create_comment(
    State(pool): State<SqlitePool>,
    principal: Principal,
    Path(task_id): Path<i64>,
    Json(payload): Json<CreateCommentPayload>,
) -> Result<(StatusCode, Json<Vec<common::CommentWithAuthor>>), AppError> {
    let current = identity::resolve(&pool, &principal).await?;
    let thread = comments::append(&pool, &current, task_id, &payload.comment).await?;
    Ok((StatusCode::CREATED, Json(thread)))
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    year: i32,
    month: u32,
    #[serde(default)]
    viewport: Viewport,
    search: Option<String>,
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
}

/// Projects the caller's visible tasks onto a filtered month grid.
pub async fn calendar_month(
    State(pool): State<SqlitePool>,
    principal: Principal,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<MonthGrid>, AppError> {
    let current = identity::resolve(&pool, &principal).await?;
    let visible = tasks::list_visible(&pool, &current).await?;
    let filtered = calendar::filter_tasks(
        visible,
        query.search.as_deref(),
        query.status,
        query.priority,
    );

    let grid = calendar::project_month(&filtered, query.year, query.month, query.viewport)
        .ok_or_else(|| {
            AppError::validation(format!(
                "{}-{} is not a valid year and month.",
                query.year, query.month
            ))
        })?;
    Ok(Json(grid))
}
