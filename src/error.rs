/// Error Handling Module
///
/// 1. Domain-specific error types
/// 2. One `AppError` every handler returns
/// 3. HTTP response mapping with structured logging
///
/// Credential failures are collapsed on the way out: clients learn that a token
/// or refresh credential was rejected, never which check rejected it. The
/// specific cause is logged where it is known.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::auth::{
    CredentialError, HashingFailure, PasswordMismatch, RefreshError, VerificationFailure,
};
use crate::store::StoreError;

// ============================================================================
// 1. DOMAIN-SPECIFIC ERROR TYPES
// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} bytes)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

impl StdError for ValidationError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// Authentication errors as clients see them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    TokenInvalid,
    MissingToken,
    MalformedAuthorization,
    RefreshDenied,
    ApiKeyInvalid,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Incorrect email or password"),
            AuthError::TokenInvalid => write!(f, "Invalid or expired token"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::MalformedAuthorization => write!(f, "Malformed authorization header"),
            AuthError::RefreshDenied => write!(f, "Refresh denied"),
            AuthError::ApiKeyInvalid => write!(f, "Invalid API key"),
        }
    }
}

impl StdError for AuthError {}

// ============================================================================
// 2. UNIFIED APPLICATION ERROR TYPE
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Storage(StoreError),
    Auth(AuthError),
    Config(ConfigError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Storage(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Storage(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        tracing::debug!(error = %err, "Credential extraction failed");
        match err {
            CredentialError::MissingHeader
            | CredentialError::EmptyToken
            | CredentialError::EmptyKey => AppError::Auth(AuthError::MissingToken),
            CredentialError::MalformedHeader => AppError::Auth(AuthError::MalformedAuthorization),
        }
    }
}

impl From<VerificationFailure> for AppError {
    fn from(err: VerificationFailure) -> Self {
        tracing::warn!(cause = %err, "Access token rejected");
        AppError::Auth(AuthError::TokenInvalid)
    }
}

impl From<RefreshError> for AppError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::NotFound | RefreshError::Revoked | RefreshError::Expired => {
                AppError::Auth(AuthError::RefreshDenied)
            }
            RefreshError::Conflict => AppError::Storage(StoreError::UniqueViolation(
                "refresh token already exists".to_string(),
            )),
            RefreshError::Storage(msg) => AppError::Storage(StoreError::Unavailable(msg)),
            RefreshError::Signing(msg) => AppError::Internal(msg),
        }
    }
}

impl From<PasswordMismatch> for AppError {
    fn from(_: PasswordMismatch) -> Self {
        AppError::Auth(AuthError::InvalidCredentials)
    }
}

impl From<HashingFailure> for AppError {
    fn from(err: HashingFailure) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::Internal(format!("Blocking task failed: {}", err))
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl AppError {
    fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),

            AppError::Storage(e) => match e {
                StoreError::UniqueViolation(_) => {
                    (StatusCode::CONFLICT, "DUPLICATE_ENTRY", e.to_string())
                }
                StoreError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
                StoreError::Unavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Storage service temporarily unavailable".to_string(),
                ),
            },

            AppError::Auth(e) => {
                let code = match e {
                    AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
                    AuthError::TokenInvalid => "TOKEN_INVALID",
                    AuthError::MissingToken => "MISSING_TOKEN",
                    AuthError::MalformedAuthorization => "MALFORMED_AUTHORIZATION",
                    AuthError::RefreshDenied => "REFRESH_DENIED",
                    AuthError::ApiKeyInvalid => "API_KEY_INVALID",
                };
                (StatusCode::UNAUTHORIZED, code, e.to_string())
            }

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = self.classify();

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Storage(StoreError::UniqueViolation(_)) => {
                tracing::warn!(request_id = request_id, error = %self, "Duplicate entry attempt");
            }
            AppError::Storage(e) => {
                tracing::error!(request_id = request_id, error = %e, "Storage error");
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(request_id = request_id, "Invalid credentials attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        self.classify().0
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-operation context attached to success and failure logs
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Log `error` with this context and hand it back for propagation
    pub fn log_error(&self, error: AppError) -> AppError {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "user_id": self.user_id,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match &error {
            AppError::Storage(_) | AppError::Config(_) | AppError::Internal(_) => {
                tracing::error!(error = %error, context = ?context, "Operation failed");
            }
            _ => {
                tracing::warn!(error = %error, context = ?context, "Operation rejected");
            }
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("email".to_string());
        assert_eq!(err.to_string(), "email is empty");
    }

    #[test]
    fn test_verification_failures_collapse() {
        let causes = [
            VerificationFailure::Malformed,
            VerificationFailure::AlgorithmMismatch,
            VerificationFailure::BadSignature,
            VerificationFailure::WrongIssuer,
            VerificationFailure::Expired,
            VerificationFailure::InvalidSubject,
        ];

        for cause in causes {
            let err: AppError = cause.into();
            let (status, body) = <AppError as ErrorHandler>::error_response(&err, "id");
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body.code, "TOKEN_INVALID");
            assert_eq!(body.message, "Invalid or expired token");
        }
    }

    #[test]
    fn test_refresh_lifecycle_failures_collapse() {
        for cause in [RefreshError::NotFound, RefreshError::Revoked, RefreshError::Expired] {
            let err: AppError = cause.into();
            let (_, body) = <AppError as ErrorHandler>::error_response(&err, "id");
            assert_eq!(body.code, "REFRESH_DENIED");
            assert_eq!(body.message, "Refresh denied");
        }
    }

    #[test]
    fn test_storage_failure_is_service_unavailable() {
        let err: AppError = RefreshError::Storage("connection refused".to_string()).into();

        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        let (_, body) = <AppError as ErrorHandler>::error_response(&err, "id");
        assert!(!body.message.contains("connection refused"));
    }

    #[test]
    fn test_credential_errors_map_to_unauthorized() {
        let missing: AppError = CredentialError::MissingHeader.into();
        let malformed: AppError = CredentialError::MalformedHeader.into();

        assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
        assert!(matches!(malformed, AppError::Auth(AuthError::MalformedAuthorization)));
    }

    #[test]
    fn test_error_response_creation() {
        let response = ErrorResponse::new(
            "test-123".to_string(),
            "Test error".to_string(),
            "TEST_ERROR".to_string(),
            400,
        );

        assert_eq!(response.error_id, "test-123");
        assert_eq!(response.code, "TEST_ERROR");
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("test_operation");
        assert_eq!(ctx.operation, "test_operation");
        assert!(ctx.user_id.is_none());

        let ctx_with_user = ctx.with_user_id("user-123".to_string());
        assert_eq!(ctx_with_user.user_id, Some("user-123".to_string()));
    }
}
