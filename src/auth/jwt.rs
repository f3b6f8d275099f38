/// JWT Token Generation and Validation
///
/// Access tokens are stateless HS256 JWTs. The signing secret is passed in
/// explicitly on every call; nothing here reads process-wide state.

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, ISSUER};
use crate::error::{AppError, ConfigError};

/// Lifetime used when the caller does not ask for one
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 3600;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// HMAC key shared by every issue/verify call for the lifetime of the process
#[derive(Clone)]
pub struct SigningSecret(String);

impl SigningSecret {
    /// # Errors
    /// Returns error if the secret is empty
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.jwt_secret".to_string()));
        }
        Ok(Self(secret))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Why an access token was rejected.
///
/// Only meant for logs. Callers must collapse every variant into the same
/// "invalid or expired token" outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFailure {
    Malformed,
    AlgorithmMismatch,
    BadSignature,
    WrongIssuer,
    Expired,
    InvalidSubject,
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationFailure::Malformed => write!(f, "token is malformed"),
            VerificationFailure::AlgorithmMismatch => write!(f, "unexpected signing algorithm"),
            VerificationFailure::BadSignature => write!(f, "signature does not match"),
            VerificationFailure::WrongIssuer => write!(f, "unexpected issuer"),
            VerificationFailure::Expired => write!(f, "token has expired"),
            VerificationFailure::InvalidSubject => write!(f, "subject is not a valid user ID"),
        }
    }
}

impl std::error::Error for VerificationFailure {}

/// Resolve the requested access token lifetime.
///
/// Overrides can only shorten the lifetime: values above one hour are capped,
/// and absent, zero or negative values fall back to the one hour default.
pub fn access_token_ttl(override_seconds: Option<i64>) -> Duration {
    let seconds = match override_seconds {
        Some(seconds) if seconds > 0 => seconds.min(DEFAULT_ACCESS_TOKEN_TTL_SECS),
        _ => DEFAULT_ACCESS_TOKEN_TTL_SECS,
    };
    Duration::seconds(seconds)
}

/// Issue a signed access token for `subject`
///
/// # Errors
/// Returns error only if the JWT library fails to sign, which does not happen
/// for HMAC keys.
pub fn issue_access_token(
    subject: Uuid,
    secret: &SigningSecret,
    ttl: Duration,
) -> Result<String, AppError> {
    let claims = Claims::new(subject, ttl);

    encode(
        &Header::new(ALGORITHM),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Verify an access token and return the user it was issued to
///
/// # Errors
/// Returns the specific [`VerificationFailure`] for diagnostics.
pub fn verify_access_token(token: &str, secret: &SigningSecret) -> Result<Uuid, VerificationFailure> {
    // Reject anything not signed with HS256 before touching the key.
    let header = decode_header(token).map_err(|_| VerificationFailure::Malformed)?;
    if header.alg != ALGORITHM {
        return Err(VerificationFailure::AlgorithmMismatch);
    }

    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature => VerificationFailure::BadSignature,
        ErrorKind::InvalidAlgorithm => VerificationFailure::AlgorithmMismatch,
        ErrorKind::ExpiredSignature => VerificationFailure::Expired,
        ErrorKind::InvalidIssuer => VerificationFailure::WrongIssuer,
        _ => VerificationFailure::Malformed,
    })?;

    if claims.is_expired_at(Utc::now().timestamp()) {
        return Err(VerificationFailure::Expired);
    }

    claims.user_id().ok_or(VerificationFailure::InvalidSubject)
}
