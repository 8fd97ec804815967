use actix_web::{web, HttpRequest, HttpResponse};

use crate::database::models::SpecialCodeInput;
use crate::database::repositories::special_code as special_code_repo;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::user_context::extract_context;

/// Mint a one-time signup code granting the requested role. IT only.
pub async fn create_special_code(
    input: web::Json<SpecialCodeInput>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    user_context.requires_it()?;

    let code = special_code_repo::create_code(input.role, user_context.user_id()).await?;

    log::info!(
        "Special code minted by {} granting role {}",
        user_context.user_id(),
        code.role
    );

    Ok(ApiResponse::created(code))
}

pub async fn get_special_codes(req: HttpRequest) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    user_context.requires_it()?;

    let codes = special_code_repo::get_all_codes().await?;

    Ok(ApiResponse::success(codes))
}
