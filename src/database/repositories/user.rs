use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::models::{User, UserRole};
use crate::database::{pool, utils::sql};
use crate::error::AppError;

const USER_COLUMNS: &str = "id, email, password_hash, name, role, language, \
     notify_global_enable, notify_station_ids, created_at, updated_at";

/// Create a user inside the signup transaction, alongside the special-code
/// consumption. Timestamps are store-generated.
pub async fn create_user(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
    password_hash: &str,
    name: &str,
    role: UserRole,
) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(&sql(&format!(
        r#"
            INSERT INTO
                users (id, email, password_hash, name, role, language, notify_global_enable, notify_station_ids, created_at, updated_at)
            VALUES
                (?, ?, ?, ?, ?, 'de', TRUE, '{{}}', NOW(), NOW())
            RETURNING
                {USER_COLUMNS}
        "#
    )))
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(role)
    .fetch_one(&mut **tx)
    .await?;

    Ok(user)
}

pub async fn find_by_id(user_id: Uuid) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&sql(&format!(
        r#"
            SELECT
                {USER_COLUMNS}
            FROM
                users
            WHERE
                id = ?
        "#
    )))
    .bind(user_id)
    .fetch_optional(pool())
    .await?;

    Ok(user)
}

pub async fn find_by_email(email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&sql(&format!(
        r#"
            SELECT
                {USER_COLUMNS}
            FROM
                users
            WHERE
                email = ?
        "#
    )))
    .bind(email)
    .fetch_optional(pool())
    .await?;

    Ok(user)
}

pub async fn email_exists(email: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar(&sql(r#"
            SELECT
                COUNT(*)
            FROM
                users
            WHERE
                email = ?
        "#))
    .bind(email)
    .fetch_one(pool())
    .await?;

    Ok(count > 0)
}

/// Write back the settings columns after a patch has been merged in memory.
pub async fn update_settings(user: &User) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(&sql(&format!(
        r#"
            UPDATE
                users
            SET
                language = ?,
                notify_global_enable = ?,
                notify_station_ids = ?,
                updated_at = NOW()
            WHERE
                id = ?
            RETURNING
                {USER_COLUMNS}
        "#
    )))
    .bind(&user.language)
    .bind(user.notify_global_enable)
    .bind(&user.notify_station_ids)
    .bind(user.id)
    .fetch_one(pool())
    .await?;

    Ok(user)
}

/// Users who opted in globally and subscribed to the given station.
pub async fn find_station_subscribers(station_id: Uuid) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>(&sql(&format!(
        r#"
            SELECT
                {USER_COLUMNS}
            FROM
                users
            WHERE
                notify_global_enable = TRUE
                AND ? = ANY(notify_station_ids)
        "#
    )))
    .bind(station_id)
    .fetch_all(pool())
    .await?;

    Ok(users)
}
