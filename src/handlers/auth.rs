use actix_web::{web, HttpRequest, HttpResponse};

use crate::database::models::{LoginRequest, SignupRequest, UserInfo};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::auth::AuthService;
use crate::services::user_context::extract_context;

pub async fn signup(
    input: web::Json<SignupRequest>,
    auth_service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let response = auth_service.signup(input.into_inner()).await?;

    log::info!("New signup: {} ({})", response.user.email, response.user.role);

    Ok(ApiResponse::created(response))
}

pub async fn login(
    input: web::Json<LoginRequest>,
    auth_service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let response = auth_service.login(input.into_inner()).await?;

    Ok(ApiResponse::success(response))
}

pub async fn me(req: HttpRequest) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;

    Ok(ApiResponse::success(UserInfo::from(user_context.user)))
}
