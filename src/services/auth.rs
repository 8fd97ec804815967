use actix_web::{
    dev::Payload, error::ErrorUnauthorized, web::Data, Error as ActixError, FromRequest,
    HttpRequest,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::config::Config;
use crate::database::models::{AuthResponse, LoginRequest, SignupRequest, User, UserRole};
use crate::database::repositories::{special_code as special_code_repo, user as user_repo};
use crate::database::transaction::DatabaseTransaction;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub email: String,
    pub role: Option<UserRole>,
    pub exp: usize, // expiration time
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Missing or unknown role resolves to the plain user role,
    /// least privilege.
    pub fn role(&self) -> UserRole {
        self.role.unwrap_or_default()
    }
}

impl FromRequest for Claims {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let auth_header = req.headers().get("Authorization");

        if let Some(auth_header) = auth_header {
            if let Ok(auth_str) = auth_header.to_str() {
                if auth_str.starts_with("Bearer ") {
                    let token = &auth_str[7..]; // Remove "Bearer " prefix

                    // Get the auth service from app data
                    if let Some(auth_service) = req.app_data::<Data<AuthService>>() {
                        return match auth_service.verify_token(token) {
                            Ok(claims) => ready(Ok(claims)),
                            Err(_) => ready(Err(ErrorUnauthorized("Invalid token"))),
                        };
                    }
                }
            }
        }

        ready(Err(ErrorUnauthorized(
            "Missing or invalid authorization header",
        )))
    }
}

#[derive(Clone)]
pub struct AuthService {
    config: Config,
}

impl AuthService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Sign up with a one-time special code. The code lookup, user creation,
    /// and code consumption happen in a single transaction: a used code can
    /// never grant a second signup, and a failed signup leaves no user row.
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse, AppError> {
        if user_repo::email_exists(&request.email).await? {
            return Err(AppError::Validation("Email already registered".to_string()));
        }

        let password_hash = hash(&request.password, DEFAULT_COST)
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let name = request
            .name
            .clone()
            .unwrap_or_else(|| request.email.split('@').next().unwrap_or("").to_string());
        let email = request.email.clone();
        let special_code = request.special_code.clone();

        let user = DatabaseTransaction::run(move |tx| {
            Box::pin(async move {
                let code = special_code_repo::lock_code(tx, &special_code).await?;
                let code = match code {
                    Some(code) if !code.is_used => code,
                    _ => {
                        return Err(AppError::Validation(
                            "Invalid or used special code".to_string(),
                        ));
                    }
                };

                let user =
                    user_repo::create_user(tx, &email, &password_hash, &name, code.role).await?;
                special_code_repo::mark_used(tx, &code.code, user.id).await?;

                Ok(user)
            })
        })
        .await?;

        let token = self.generate_token(&user)?;

        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        let user = user_repo::find_by_email(&request.email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let password_matches = verify(&request.password, &user.password_hash)
            .map_err(|e| AppError::Storage(e.to_string()))?;
        if !password_matches {
            return Err(AppError::Unauthorized);
        }

        let token = self.generate_token(&user)?;

        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AppError::Unauthorized)?;

        Ok(token_data.claims)
    }

    fn generate_token(&self, user: &User) -> Result<String, AppError> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::days(self.config.jwt_expiration_days))
            .expect("valid timestamp")
            .timestamp() as usize;

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: Some(user.role),
            exp: expiration,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )
        .map_err(|e| AppError::Storage(e.to_string()))?;

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: "test".to_string(),
            jwt_secret: "test-jwt-secret-key-that-is-long-enough".to_string(),
            jwt_expiration_days: 1,
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            app_instance_id: "test".to_string(),
        }
    }

    fn sample_user(role: UserRole) -> User {
        let now = Utc::now().naive_utc();
        User {
            id: Uuid::new_v4(),
            email: "planner@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: "planner".to_string(),
            role,
            language: "de".to_string(),
            notify_global_enable: true,
            notify_station_ids: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_tokens_verify_back_to_their_claims() {
        let service = AuthService::new(test_config());
        let user = sample_user(UserRole::Admin);

        let token = service.generate_token(&user).unwrap();
        let claims = service.verify_token(&token).unwrap();

        assert_eq!(claims.user_id(), user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role(), UserRole::Admin);
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let service = AuthService::new(test_config());

        assert!(matches!(
            service.verify_token("not-a-token"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let issuing = AuthService::new(test_config());
        let mut other_config = test_config();
        other_config.jwt_secret = "a-completely-different-secret-key".to_string();
        let verifying = AuthService::new(other_config);

        let token = issuing.generate_token(&sample_user(UserRole::User)).unwrap();

        assert!(matches!(
            verifying.verify_token(&token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn missing_role_in_claims_defaults_to_plain_user() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role: None,
            exp: 0,
        };

        assert_eq!(claims.role(), UserRole::User);
    }
}
