// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::Context;
use axum::http::request::Parts;
use axum::extract::FromRequestParts;
use chrono::Utc;
use common::User;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::AppError;

/// The identity handed over by the authentication layer, carried on every
/// request as the `x-user-id` / `x-user-email` headers. This is distinct
/// from the application [`User`] profile; [`resolve`] bridges the two.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub email: String,
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        match (header("x-user-id"), header("x-user-email")) {
            (Some(id), Some(email)) => Ok(Principal { id, email }),
            _ => Err(AppError::Unauthenticated),
        }
    }
}

/// Resolves the application profile for an authenticated principal.
///
/// Lookup order:
/// 1. by the principal's id;
/// 2. by the principal's email, in which case the stored id is rewritten to
///    the principal's id (a one-time reconciliation for profiles created
///    before the current auth account existed);
/// 3. otherwise a fresh profile is created with the `Employee` role.
///
/// Every request handler runs this before touching any other component.
pub async fn resolve(pool: &SqlitePool, principal: &Principal) -> Result<User, AppError> {
    if let Some(user) = find_by_id(pool, &principal.id).await? {
        return Ok(user);
    }

    debug!(
        "No profile found for id {}, checking by email",
        principal.id
    );
    if let Some(user) = find_by_email(pool, &principal.email).await? {
        sqlx::query("UPDATE users SET id = ?, updated_at = ? WHERE email = ?")
            .bind(&principal.id)
            .bind(Utc::now())
            .bind(&principal.email)
            .execute(pool)
            .await
            .context("Failed to reconcile profile id")?;
        info!(
            "Reconciled profile for {} to principal id {}",
            principal.email, principal.id
        );
        return Ok(User {
            id: principal.id.clone(),
            ..user
        });
    }

    create_profile(pool, principal).await
}

async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to look up user by id")?;
    Ok(user)
}

async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to look up user by email")?;
    Ok(user)
}

/// Lazily creates a profile on first successful authentication.
async fn create_profile(pool: &SqlitePool, principal: &Principal) -> Result<User, AppError> {
    let name = principal
        .email
        .split('@')
        .next()
        .filter(|part| !part.is_empty())
        .unwrap_or("User")
        .to_string();
    let now = Utc::now();

    info!("Creating profile for new principal {}", principal.id);
    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, role, services, is_active, email_verified, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&principal.id)
    .bind(&principal.email)
    .bind(&name)
    .bind(common::Role::Employee.as_str())
    .bind("[]")
    .bind(true)
    .bind(true)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user profile")?;

    find_by_id(pool, &principal.id)
        .await?
        .context("Profile vanished right after creation")
        .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Role;
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

    fn principal(id: &str, email: &str) -> Principal {
        Principal {
            id: id.to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn resolve_creates_profile_lazily() {
        let pool = setup_test_db().await;

        let user = resolve(&pool, &principal("u-1", "alice@example.com"))
            .await
            .unwrap();

        assert_eq!(user.id, "u-1");
        assert_eq!(user.name, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, Role::Employee);
        assert!(user.is_active);
        assert!(user.services.is_empty());
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let pool = setup_test_db().await;

        let first = resolve(&pool, &principal("u-1", "alice@example.com"))
            .await
            .unwrap();
        let second = resolve(&pool, &principal("u-1", "alice@example.com"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn resolve_reconciles_by_email() {
        let pool = setup_test_db().await;

        // A profile created under an old auth id.
        resolve(&pool, &principal("old-id", "bob@example.com"))
            .await
            .unwrap();

        // The same person comes back under a fresh principal id.
        let user = resolve(&pool, &principal("new-id", "bob@example.com"))
            .await
            .unwrap();

        assert_eq!(user.id, "new-id");
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
        let stored_id: String = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
            .bind("bob@example.com")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored_id, "new-id");
    }
}
