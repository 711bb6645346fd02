// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::handlers;
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::SqlitePool;

/// Creates and configures the application router.
pub fn create_router(pool: SqlitePool) -> Router {
    Router::new()
        // Identity and directory
        .route("/api/me", get(handlers::me))
        .route("/api/users", get(handlers::list_users))
        // Task lifecycle
        .route("/api/tasks", get(handlers::list_tasks))
        .route("/api/tasks", post(handlers::create_task))
        .route("/api/tasks/{id}", put(handlers::update_task))
        .route("/api/tasks/{id}/status", patch(handlers::update_task_status))
        .route("/api/tasks/{id}", delete(handlers::delete_task))
        // Comment threads
        .route("/api/tasks/{id}/comments", get(handlers::list_comments))
        .route("/api/tasks/{id}/comments", post(handlers::create_comment))
        // Calendar projection
        .route("/api/calendar", get(handlers::calendar_month))
        // Adds the database pool to the application state
        .with_state(pool)
}
