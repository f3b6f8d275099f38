/// User account routes

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{hash_password, validate_password_strength, HashedPassword};
use crate::error::{AppError, ErrorContext};
use crate::middleware::AuthenticatedUser;
use crate::store::{User, UserStore};
use crate::validators::is_valid_email;

#[derive(Deserialize)]
pub struct UserRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user. Never carries the password hash.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub is_chirpy_red: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            created_at: user.created_at,
            updated_at: user.updated_at,
            email: user.email,
            is_chirpy_red: user.is_chirpy_red,
        }
    }
}

async fn validated_credentials(form: UserRequest) -> Result<(String, HashedPassword), AppError> {
    let email = is_valid_email(&form.email)?;
    validate_password_strength(&form.password)?;

    let password = form.password;
    let hashed = web::block(move || hash_password(&password)).await??;
    Ok((email, hashed))
}

/// POST /api/users
///
/// # Errors
/// - 400: invalid email or password
/// - 409: email already registered
pub async fn create_user(
    form: web::Json<UserRequest>,
    users: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");
    let (email, hashed) = validated_credentials(form.into_inner()).await?;

    let user = users
        .create_user(&email, &hashed)
        .await
        .map_err(|e| context.log_error(e.into()))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// PUT /api/users
///
/// Changes the caller's email and password. Requires
/// `Authorization: Bearer <access_token>`.
pub async fn update_user(
    caller: AuthenticatedUser,
    form: web::Json<UserRequest>,
    users: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_update").with_user_id(caller.id().to_string());
    let (email, hashed) = validated_credentials(form.into_inner()).await?;

    let user = users
        .update_user(caller.id(), &email, &hashed)
        .await
        .map_err(|e| context.log_error(e.into()))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[derive(Serialize)]
pub struct IdentityResponse {
    pub id: Uuid,
}

/// GET /api/me
///
/// Mounted behind `JwtMiddleware`; echoes the verified identity.
pub async fn current_user(caller: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(IdentityResponse { id: caller.id() })
}
