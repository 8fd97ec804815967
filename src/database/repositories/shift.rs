use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::models::{
    Application, ApplicationStatus, Shift, ShiftDetails, ShiftInput, ShiftQuery, UserRole,
};
use crate::database::transaction::{self, MAX_ATTEMPTS};
use crate::database::{pool, utils::sql};
use crate::error::AppError;
use crate::services::lifecycle::{ShiftSnapshot, TransitionOutcome};

const SHIFT_COLUMNS: &str = "id, station_id, date, start_time, end_time, urgency, notes, \
     posted_by, status, created_at, updated_at";

const APPLICATION_COLUMNS: &str =
    "id, shift_id, applicant_id, status, decided_by, applied_at, updated_at";

/// Create a new shift in the open state. Input is validated by the
/// lifecycle engine before this runs.
pub async fn create_shift(input: &ShiftInput, posted_by: Uuid) -> Result<Shift, AppError> {
    let shift = sqlx::query_as::<_, Shift>(&sql(&format!(
        r#"
            INSERT INTO
                shifts (id, station_id, date, start_time, end_time, urgency, notes, posted_by, status, created_at, updated_at)
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, 'open', NOW(), NOW())
            RETURNING
                {SHIFT_COLUMNS}
        "#
    )))
    .bind(Uuid::new_v4())
    .bind(input.station_id)
    .bind(input.date)
    .bind(input.start_time)
    .bind(input.end_time)
    .bind(input.urgency)
    .bind(input.notes.as_deref())
    .bind(posted_by)
    .fetch_one(pool())
    .await?;

    Ok(shift)
}

pub async fn find_by_id(shift_id: Uuid) -> Result<Option<Shift>, AppError> {
    let shift = sqlx::query_as::<_, Shift>(&sql(&format!(
        r#"
            SELECT
                {SHIFT_COLUMNS}
            FROM
                shifts
            WHERE
                id = ?
        "#
    )))
    .bind(shift_id)
    .fetch_optional(pool())
    .await?;

    Ok(shift)
}

/// Filtered shift listing. Plain users are scoped down to open and pending
/// shifts regardless of the requested status filter.
pub async fn find_by_query(query: &ShiftQuery, role: UserRole) -> Result<Vec<Shift>, AppError> {
    let mut builder = sqlx::QueryBuilder::<Postgres>::new(format!(
        "SELECT {SHIFT_COLUMNS} FROM shifts WHERE 1 = 1"
    ));

    if let Some(station_id) = query.station_id {
        builder.push(" AND station_id = ").push_bind(station_id);
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(from) = query.from {
        builder.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        builder.push(" AND date <= ").push_bind(to);
    }
    if !role.can_manage_shifts() {
        builder.push(" AND status IN ('open', 'pending')");
    }
    builder.push(" ORDER BY date ASC, start_time ASC");

    let shifts = builder
        .build_query_as::<Shift>()
        .fetch_all(pool())
        .await?;

    Ok(shifts)
}

/// Applications for a shift in applied-at order, earliest first.
pub async fn get_applications(shift_id: Uuid) -> Result<Vec<Application>, AppError> {
    let applications = sqlx::query_as::<_, Application>(&sql(&format!(
        r#"
            SELECT
                {APPLICATION_COLUMNS}
            FROM
                applications
            WHERE
                shift_id = ?
            ORDER BY
                applied_at ASC,
                id ASC
        "#
    )))
    .bind(shift_id)
    .fetch_all(pool())
    .await?;

    Ok(applications)
}

pub async fn get_details(shift_id: Uuid) -> Result<Option<ShiftDetails>, AppError> {
    let Some(shift) = find_by_id(shift_id).await? else {
        return Ok(None);
    };
    let applications = get_applications(shift_id).await?;

    Ok(Some(ShiftDetails {
        shift,
        applications,
    }))
}

pub async fn get_applications_by_user(user_id: Uuid) -> Result<Vec<Application>, AppError> {
    let applications = sqlx::query_as::<_, Application>(&sql(&format!(
        r#"
            SELECT
                {APPLICATION_COLUMNS}
            FROM
                applications
            WHERE
                applicant_id = ?
            ORDER BY
                applied_at DESC
        "#
    )))
    .bind(user_id)
    .fetch_all(pool())
    .await?;

    Ok(applications)
}

/// Consistent view of a shift and its applications, with the shift row
/// locked for the remainder of the transaction.
pub async fn snapshot_for_update(
    tx: &mut Transaction<'_, Postgres>,
    shift_id: Uuid,
) -> Result<ShiftSnapshot, AppError> {
    let shift = sqlx::query_as::<_, Shift>(&sql(&format!(
        r#"
            SELECT
                {SHIFT_COLUMNS}
            FROM
                shifts
            WHERE
                id = ?
            FOR UPDATE
        "#
    )))
    .bind(shift_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

    let applications = sqlx::query_as::<_, Application>(&sql(&format!(
        r#"
            SELECT
                {APPLICATION_COLUMNS}
            FROM
                applications
            WHERE
                shift_id = ?
            ORDER BY
                applied_at ASC,
                id ASC
        "#
    )))
    .bind(shift_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(ShiftSnapshot {
        shift,
        applications,
    })
}

/// Apply a lifecycle outcome inside the caller's transaction: shift status,
/// application status updates, and the optional new application, as one
/// atomic write set.
pub async fn persist_outcome(
    tx: &mut Transaction<'_, Postgres>,
    outcome: &TransitionOutcome,
) -> Result<Shift, AppError> {
    let shift = sqlx::query_as::<_, Shift>(&sql(&format!(
        r#"
            UPDATE
                shifts
            SET
                status = ?,
                updated_at = NOW()
            WHERE
                id = ?
            RETURNING
                {SHIFT_COLUMNS}
        "#
    )))
    .bind(outcome.shift_status)
    .bind(outcome.shift_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

    for update in &outcome.application_updates {
        sqlx::query(&sql(r#"
                UPDATE
                    applications
                SET
                    status = ?,
                    decided_by = COALESCE(?, decided_by),
                    updated_at = NOW()
                WHERE
                    id = ?
            "#))
        .bind(update.status)
        .bind(update.decided_by)
        .bind(update.application_id)
        .execute(&mut **tx)
        .await?;
    }

    if let Some(ref draft) = outcome.new_application {
        sqlx::query(&sql(r#"
                INSERT INTO
                    applications (id, shift_id, applicant_id, status, applied_at, updated_at)
                VALUES
                    (?, ?, ?, ?, NOW(), NOW())
            "#))
        .bind(Uuid::new_v4())
        .bind(draft.shift_id)
        .bind(draft.applicant_id)
        .bind(ApplicationStatus::Applied)
        .execute(&mut **tx)
        .await?;
    }

    Ok(shift)
}

/// Run a lifecycle operation against the current snapshot and persist its
/// outcome in one transaction. Transient store aborts are retried with
/// exponential backoff up to a bounded attempt count; exhaustion surfaces
/// as a Conflict.
pub async fn run_transition<F>(
    shift_id: Uuid,
    op: F,
) -> Result<(Shift, TransitionOutcome), AppError>
where
    F: Fn(&ShiftSnapshot) -> Result<TransitionOutcome, AppError>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;

        let mut tx = pool().begin().await.map_err(AppError::from)?;
        let result = async {
            let snapshot = snapshot_for_update(&mut tx, shift_id).await?;
            let outcome = op(&snapshot)?;
            let shift = persist_outcome(&mut tx, &outcome).await?;
            Ok::<_, AppError>((shift, outcome))
        }
        .await;

        match result {
            Ok(value) => {
                tx.commit().await.map_err(AppError::from)?;
                return Ok(value);
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    log::error!(
                        "Rollback failed after error (orig: {}, rollback: {})",
                        err,
                        rollback_err
                    );
                }

                if err.is_retryable() && attempt < MAX_ATTEMPTS {
                    log::debug!(
                        "Retrying shift transition (attempt {}/{}): {}",
                        attempt,
                        MAX_ATTEMPTS,
                        err
                    );
                    transaction::backoff(attempt).await;
                    continue;
                }
                if err.is_retryable() {
                    log::warn!(
                        "Shift transition retries exhausted after {} attempts: {}",
                        attempt,
                        err
                    );
                    return Err(AppError::Conflict(
                        "The operation conflicted with a concurrent update".to_string(),
                    ));
                }
                return Err(err);
            }
        }
    }
}
