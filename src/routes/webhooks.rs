/// Payment provider webhooks, authenticated with `Authorization: ApiKey <key>`

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{api_keys_match, extract_api_key};
use crate::configuration::AuthKeys;
use crate::error::{AppError, AuthError, ValidationError};
use crate::store::UserStore;

const USER_UPGRADED: &str = "user.upgraded";

#[derive(Deserialize)]
pub struct WebhookData {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct WebhookRequest {
    pub event: String,
    pub data: WebhookData,
}

/// POST /api/polka/webhooks
///
/// Other events are acknowledged without doing anything.
///
/// # Errors
/// - 401: missing or wrong API key
/// - 400: `user_id` is not a UUID
/// - 404: unknown user
pub async fn polka_webhook(
    req: HttpRequest,
    body: web::Json<WebhookRequest>,
    users: web::Data<dyn UserStore>,
    keys: web::Data<AuthKeys>,
) -> Result<HttpResponse, AppError> {
    let api_key = extract_api_key(req.headers())?;
    if !api_keys_match(&keys.polka_key, &api_key) {
        return Err(AppError::Auth(AuthError::ApiKeyInvalid));
    }

    if body.event != USER_UPGRADED {
        return Ok(HttpResponse::NoContent().finish());
    }

    let user_id = Uuid::parse_str(&body.data.user_id)
        .map_err(|_| ValidationError::InvalidFormat("data.user_id".to_string()))?;
    users.upgrade_user(user_id).await?;

    tracing::info!(user_id = %user_id, "User upgraded");
    Ok(HttpResponse::NoContent().finish())
}
