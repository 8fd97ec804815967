use actix_web::{dev::Payload, FromRequest, HttpRequest};
use uuid::Uuid;

use crate::database::models::{User, UserRole};
use crate::database::repositories::user as user_repo;
use crate::error::AppError;
use crate::services::auth::Claims;
use crate::services::lifecycle::Actor;

/// Request-scoped caller context: the freshly resolved user record, with
/// the role read from the store rather than trusted from the token.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user: User,
}

impl UserContext {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> UserRole {
        self.user.role
    }

    /// The identity the lifecycle engine sees for this request.
    pub fn actor(&self) -> Actor {
        Actor::new(self.user.id, self.user.role)
    }

    pub fn is_admin(&self) -> bool {
        self.user.role.can_manage_shifts()
    }

    pub fn is_it(&self) -> bool {
        self.user.role.is_it()
    }

    pub fn requires_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "This action requires administrator rights".to_string(),
            ))
        }
    }

    pub fn requires_it(&self) -> Result<(), AppError> {
        if self.is_it() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "This action requires IT staff rights".to_string(),
            ))
        }
    }
}

/// Resolve the caller from the request's bearer token. Handlers call this
/// once at the top; no ambient session state exists anywhere else.
pub async fn extract_context(req: &HttpRequest) -> Result<UserContext, AppError> {
    let mut payload = Payload::None;
    let claims = Claims::from_request(req, &mut payload)
        .into_inner()
        .map_err(|_| AppError::Unauthorized)?;

    let user = user_repo::find_by_id(claims.user_id())
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(UserContext { user })
}
