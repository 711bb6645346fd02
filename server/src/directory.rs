// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::Context;
use common::{DirectoryUser, User};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::AppError;

/// Returns the assignee candidate list for the given caller.
///
/// Active users ordered by name. When the caller is an administrator the
/// other administrators are excluded from the candidates, but the caller's
/// own profile is always injected as the explicit first entry so that
/// self-assignment stays possible. A failure here only degrades task
/// assignment to self-assignment; it never blocks task viewing.
pub async fn assignable_users(
    pool: &SqlitePool,
    current: &User,
) -> Result<Vec<DirectoryUser>, AppError> {
    let active = sqlx::query_as::<_, DirectoryUser>(
        "SELECT id, name, email, role FROM users WHERE is_active = 1 ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to load the user directory")?;

    let mut candidates = vec![DirectoryUser {
        id: current.id.clone(),
        name: current.name.clone(),
        email: current.email.clone(),
        role: current.role,
    }];

    for user in active {
        if user.id == current.id {
            continue;
        }
        // Admins cannot assign tasks to other admins through this path.
        if current.role.is_admin() && user.role.is_admin() {
            continue;
        }
        candidates.push(user);
    }

    debug!("Directory resolved {} candidates", candidates.len());
    Ok(candidates)
}
