/// Authentication Routes
///
/// Login, access token refresh and refresh token revocation.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{
    access_token_ttl, exchange_refresh_token, extract_bearer, hash_password, issue_access_token,
    issue_refresh_token, revoke_refresh_token, verify_password, HashedPassword, PasswordMismatch,
    RefreshError,
};
use crate::configuration::AuthKeys;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::store::{RefreshToken, RefreshTokenStore, StoreError, UserStore};

const REFRESH_ISSUE_ATTEMPTS: usize = 3;

lazy_static! {
    // Verified against when the email is unknown so both failure paths cost one bcrypt run.
    static ref UNKNOWN_USER_HASH: Result<HashedPassword, String> =
        hash_password("unknown-user-placeholder").map_err(|e| e.to_string());
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Optional access token lifetime, capped at one hour; zero or absent means one hour
    pub expires_in_seconds: Option<i64>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub is_chirpy_red: bool,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

/// POST /api/login
///
/// # Errors
/// - 401: unknown email or wrong password (same response for both)
/// - 503: storage unavailable
///
/// A new refresh token is generated again if the first one collides.
pub async fn login(
    form: web::Json<LoginRequest>,
    users: web::Data<dyn UserStore>,
    refresh_tokens: web::Data<dyn RefreshTokenStore>,
    keys: web::Data<AuthKeys>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");
    let LoginRequest {
        email,
        password,
        expires_in_seconds,
    } = form.into_inner();

    let user = match users.get_user_by_email(email.trim()).await {
        Ok(user) => Some(user),
        Err(StoreError::NotFound) => None,
        Err(e) => return Err(context.log_error(e.into())),
    };

    let stored = user.as_ref().map(|u| u.hashed_password.clone());
    let verified = web::block(move || check_password(stored, &password))
        .await?
        .map_err(|e| context.log_error(e))?;

    let user = match (user, verified) {
        (Some(user), Ok(())) => user,
        _ => return Err(AppError::Auth(AuthError::InvalidCredentials)),
    };

    let token = issue_access_token(user.id, &keys.secret, access_token_ttl(expires_in_seconds))?;
    let refresh_token = issue_with_retry(refresh_tokens.get_ref(), user.id)
        .await
        .map_err(|e| context.log_error(e.into()))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        id: user.id,
        created_at: user.created_at,
        updated_at: user.updated_at,
        email: user.email,
        is_chirpy_red: user.is_chirpy_red,
        token,
        refresh_token: refresh_token.token,
    }))
}

/// Runs on the blocking pool. Unknown users are checked against the placeholder
/// hash, which is computed here on first use.
fn check_password(
    stored: Option<HashedPassword>,
    password: &str,
) -> Result<Result<(), PasswordMismatch>, AppError> {
    let hashed = match stored {
        Some(hashed) => hashed,
        None => UNKNOWN_USER_HASH.clone().map_err(AppError::Internal)?,
    };
    Ok(verify_password(&hashed, password))
}

async fn issue_with_retry(
    store: &dyn RefreshTokenStore,
    owner: Uuid,
) -> Result<RefreshToken, RefreshError> {
    let mut attempt = 1;
    loop {
        match issue_refresh_token(store, owner).await {
            Err(RefreshError::Conflict) if attempt < REFRESH_ISSUE_ATTEMPTS => {
                tracing::warn!(attempt, "Refresh token collision, regenerating");
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// POST /api/refresh
///
/// `Authorization: Bearer <refresh_token>`. Unknown, revoked and expired
/// tokens all get the same 401.
pub async fn refresh(
    req: HttpRequest,
    refresh_tokens: web::Data<dyn RefreshTokenStore>,
    keys: web::Data<AuthKeys>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = extract_bearer(req.headers())?;

    let token = exchange_refresh_token(refresh_tokens.get_ref(), &refresh_token, &keys.secret).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse { token }))
}

/// POST /api/revoke
///
/// `Authorization: Bearer <refresh_token>`. Revoking an already revoked token
/// succeeds.
pub async fn revoke(
    req: HttpRequest,
    refresh_tokens: web::Data<dyn RefreshTokenStore>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = extract_bearer(req.headers())?;

    revoke_refresh_token(refresh_tokens.get_ref(), &refresh_token).await?;

    Ok(HttpResponse::NoContent().finish())
}
