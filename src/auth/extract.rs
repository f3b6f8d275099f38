/// Credential extraction from the `Authorization` header
///
/// Pure transport framing: nothing here knows whether a token is valid.

use std::fmt;

use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use sha2::{Digest, Sha256};

const BEARER_PREFIX: &str = "Bearer ";
const API_KEY_PREFIX: &str = "ApiKey ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    MissingHeader,
    MalformedHeader,
    EmptyToken,
    EmptyKey,
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::MissingHeader => write!(f, "authorization header is missing"),
            CredentialError::MalformedHeader => write!(f, "authorization header format is invalid"),
            CredentialError::EmptyToken => write!(f, "token is missing in the authorization header"),
            CredentialError::EmptyKey => write!(f, "api key is missing in the authorization header"),
        }
    }
}

impl std::error::Error for CredentialError {}

/// Pull the token out of `Authorization: Bearer <token>`
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, CredentialError> {
    extract_with_prefix(headers, BEARER_PREFIX, CredentialError::EmptyToken)
}

/// Pull the key out of `Authorization: ApiKey <key>`
pub fn extract_api_key(headers: &HeaderMap) -> Result<String, CredentialError> {
    extract_with_prefix(headers, API_KEY_PREFIX, CredentialError::EmptyKey)
}

fn extract_with_prefix(
    headers: &HeaderMap,
    prefix: &str,
    empty: CredentialError,
) -> Result<String, CredentialError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(CredentialError::MissingHeader)?
        .to_str()
        .map_err(|_| CredentialError::MalformedHeader)?;

    if value.is_empty() {
        return Err(CredentialError::MissingHeader);
    }

    // Case-sensitive, single space. Only the credential part is trimmed.
    let credential = value
        .strip_prefix(prefix)
        .ok_or(CredentialError::MalformedHeader)?
        .trim();

    if credential.is_empty() {
        return Err(empty);
    }

    Ok(credential.to_string())
}

/// Compare a presented service key with the configured one.
///
/// Both sides are hashed first so the comparison never depends on key length,
/// then the digests are compared without early exit.
pub fn api_keys_match(expected: &str, presented: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let presented = Sha256::digest(presented.as_bytes());

    expected
        .iter()
        .zip(presented.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
