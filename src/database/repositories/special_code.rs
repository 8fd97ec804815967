use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::models::{SpecialCode, UserRole};
use crate::database::{pool, utils::sql};
use crate::error::AppError;

const CODE_COLUMNS: &str = "code, role, is_used, used_by, used_at, created_by, created_at";

/// Mint a new one-time signup code granting the given role.
pub async fn create_code(role: UserRole, created_by: Uuid) -> Result<SpecialCode, AppError> {
    let code = sqlx::query_as::<_, SpecialCode>(&sql(&format!(
        r#"
            INSERT INTO
                special_codes (code, role, is_used, created_by, created_at)
            VALUES
                (?, ?, FALSE, ?, NOW())
            RETURNING
                {CODE_COLUMNS}
        "#
    )))
    .bind(SpecialCode::generate_code())
    .bind(role)
    .bind(created_by)
    .fetch_one(pool())
    .await?;

    Ok(code)
}

pub async fn get_all_codes() -> Result<Vec<SpecialCode>, AppError> {
    let codes = sqlx::query_as::<_, SpecialCode>(&sql(&format!(
        r#"
            SELECT
                {CODE_COLUMNS}
            FROM
                special_codes
            ORDER BY
                created_at DESC
        "#
    )))
    .fetch_all(pool())
    .await?;

    Ok(codes)
}

/// Read a code inside the signup transaction, locking its row so two
/// concurrent signups cannot both consume it.
pub async fn lock_code(
    tx: &mut Transaction<'_, Postgres>,
    code: &str,
) -> Result<Option<SpecialCode>, AppError> {
    let code = sqlx::query_as::<_, SpecialCode>(&sql(&format!(
        r#"
            SELECT
                {CODE_COLUMNS}
            FROM
                special_codes
            WHERE
                code = ?
            FOR UPDATE
        "#
    )))
    .bind(code)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(code)
}

/// Flip a code to used in the same transaction that creates the user.
pub async fn mark_used(
    tx: &mut Transaction<'_, Postgres>,
    code: &str,
    used_by: Uuid,
) -> Result<(), AppError> {
    sqlx::query(&sql(r#"
            UPDATE
                special_codes
            SET
                is_used = TRUE,
                used_by = ?,
                used_at = NOW()
            WHERE
                code = ?
                AND is_used = FALSE
        "#))
    .bind(used_by)
    .bind(code)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
