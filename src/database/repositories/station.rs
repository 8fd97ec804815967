use uuid::Uuid;

use crate::database::models::{Station, StationInput};
use crate::database::{pool, utils::sql};
use crate::error::AppError;

const STATION_COLUMNS: &str = "id, name, description, created_at, updated_at";

pub async fn create_station(input: &StationInput) -> Result<Station, AppError> {
    let station = sqlx::query_as::<_, Station>(&sql(&format!(
        r#"
            INSERT INTO
                stations (id, name, description, created_at, updated_at)
            VALUES
                (?, ?, ?, NOW(), NOW())
            RETURNING
                {STATION_COLUMNS}
        "#
    )))
    .bind(Uuid::new_v4())
    .bind(&input.name)
    .bind(input.description.as_deref())
    .fetch_one(pool())
    .await?;

    Ok(station)
}

pub async fn find_by_id(station_id: Uuid) -> Result<Option<Station>, AppError> {
    let station = sqlx::query_as::<_, Station>(&sql(&format!(
        r#"
            SELECT
                {STATION_COLUMNS}
            FROM
                stations
            WHERE
                id = ?
        "#
    )))
    .bind(station_id)
    .fetch_optional(pool())
    .await?;

    Ok(station)
}

pub async fn get_all_stations() -> Result<Vec<Station>, AppError> {
    let stations = sqlx::query_as::<_, Station>(&sql(&format!(
        r#"
            SELECT
                {STATION_COLUMNS}
            FROM
                stations
            ORDER BY
                name ASC
        "#
    )))
    .fetch_all(pool())
    .await?;

    Ok(stations)
}

pub async fn update_station(
    station_id: Uuid,
    input: &StationInput,
) -> Result<Option<Station>, AppError> {
    let station = sqlx::query_as::<_, Station>(&sql(&format!(
        r#"
            UPDATE
                stations
            SET
                name = ?,
                description = ?,
                updated_at = NOW()
            WHERE
                id = ?
            RETURNING
                {STATION_COLUMNS}
        "#
    )))
    .bind(&input.name)
    .bind(input.description.as_deref())
    .bind(station_id)
    .fetch_optional(pool())
    .await?;

    Ok(station)
}

pub async fn delete_station(station_id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query(&sql(r#"
            DELETE FROM
                stations
            WHERE
                id = ?
        "#))
    .bind(station_id)
    .execute(pool())
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn station_exists(station_id: Uuid) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar(&sql(r#"
            SELECT
                COUNT(*)
            FROM
                stations
            WHERE
                id = ?
        "#))
    .bind(station_id)
    .fetch_one(pool())
    .await?;

    Ok(count > 0)
}
