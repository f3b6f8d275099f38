/// Authentication module
///
/// Password hashing, access token issuance/verification, refresh token
/// lifecycle and extraction of credentials from request headers.

mod claims;
mod extract;
mod jwt;
mod password;
mod refresh_token;

pub use claims::{Claims, ISSUER};
pub use extract::{api_keys_match, extract_api_key, extract_bearer, CredentialError};
pub use jwt::{
    access_token_ttl, issue_access_token, verify_access_token, SigningSecret,
    VerificationFailure, DEFAULT_ACCESS_TOKEN_TTL_SECS,
};
pub use password::{
    hash_password, validate_password_strength, verify_password, HashedPassword,
    HashingFailure, PasswordMismatch,
};
pub use refresh_token::{
    exchange_refresh_token, generate_refresh_token, issue_refresh_token, revoke_refresh_token,
    RefreshError, REFRESH_TOKEN_TTL_DAYS,
};
