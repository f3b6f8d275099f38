use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use uuid::Uuid;

use crate::auth::{extract_bearer, verify_access_token, SigningSecret};
use crate::configuration::AuthKeys;
use crate::error::{AppError, ConfigError};

/// Caller identity established from a verified access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(Uuid);

impl AuthenticatedUser {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

pub(crate) fn authenticate(
    headers: &HeaderMap,
    secret: &SigningSecret,
) -> Result<AuthenticatedUser, AppError> {
    let token = extract_bearer(headers)?;
    let user_id = verify_access_token(&token, secret)?;
    Ok(AuthenticatedUser(user_id))
}

/// Reuses the identity injected by [`JwtMiddleware`](crate::middleware::JwtMiddleware)
/// when present, otherwise verifies the bearer token itself.
impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthenticatedUser>() {
            return ready(Ok(*user));
        }

        let result = match req.app_data::<web::Data<AuthKeys>>() {
            Some(keys) => authenticate(req.headers(), &keys.secret),
            None => Err(AppError::Config(ConfigError::MissingRequired(
                "auth keys not registered".to_string(),
            ))),
        };
        ready(result)
    }
}
