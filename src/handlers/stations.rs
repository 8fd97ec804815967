use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::database::models::StationInput;
use crate::database::repositories::station as station_repo;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::user_context::extract_context;

pub async fn get_stations(req: HttpRequest) -> Result<HttpResponse, AppError> {
    extract_context(&req).await?;

    let stations = station_repo::get_all_stations().await?;

    Ok(ApiResponse::success(stations))
}

pub async fn get_station(
    path: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    extract_context(&req).await?;

    let station = station_repo::find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Station not found".to_string()))?;

    Ok(ApiResponse::success(station))
}

pub async fn create_station(
    input: web::Json<StationInput>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    user_context.requires_it()?;

    let input = input.into_inner();
    if input.name.trim().is_empty() {
        return Err(AppError::Validation(
            "Station name must not be empty".to_string(),
        ));
    }

    let station = station_repo::create_station(&input).await?;

    Ok(ApiResponse::created(station))
}

pub async fn update_station(
    path: web::Path<Uuid>,
    input: web::Json<StationInput>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    user_context.requires_it()?;

    let input = input.into_inner();
    if input.name.trim().is_empty() {
        return Err(AppError::Validation(
            "Station name must not be empty".to_string(),
        ));
    }

    let station = station_repo::update_station(path.into_inner(), &input)
        .await?
        .ok_or_else(|| AppError::NotFound("Station not found".to_string()))?;

    Ok(ApiResponse::success(station))
}

pub async fn delete_station(
    path: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    user_context.requires_it()?;

    let deleted = station_repo::delete_station(path.into_inner()).await?;
    if !deleted {
        return Err(AppError::NotFound("Station not found".to_string()));
    }

    Ok(ApiResponse::message_only("Station deleted"))
}
