use actix_web::{web, HttpRequest, HttpResponse};

use crate::database::models::{UserInfo, UserSettingsPatch};
use crate::database::repositories::user as user_repo;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::user_context::extract_context;

/// Field-level settings update: only the fields present in the patch are
/// written, everything else keeps its stored value. An empty patch is a
/// no-op that returns the current settings.
pub async fn update_my_settings(
    input: web::Json<UserSettingsPatch>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    let patch = input.into_inner();

    let mut user = user_context.user;
    if !patch.is_empty() {
        patch.apply_to(&mut user);
        user = user_repo::update_settings(&user).await?;
    }

    Ok(ApiResponse::success(UserInfo::from(user)))
}
