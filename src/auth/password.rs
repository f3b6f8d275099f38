/// Password Hashing and Verification
///
/// bcrypt at the library default cost. Every hash carries its own salt.

use std::fmt;

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::ValidationError;

/// bcrypt ignores everything past 72 bytes of input
const MAX_PASSWORD_BYTES: usize = 72;

/// Encoded bcrypt hash (`$2b$<cost>$<salt><digest>`)
#[derive(Clone, PartialEq, Eq, sqlx::Type)]
#[sqlx(transparent)]
pub struct HashedPassword(String);

impl HashedPassword {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for HashedPassword {
    fn from(encoded: String) -> Self {
        Self(encoded)
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedPassword(<redacted>)")
    }
}

/// bcrypt refused to hash (bad cost parameter or RNG failure)
#[derive(Debug)]
pub struct HashingFailure(String);

impl fmt::Display for HashingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password hashing failed: {}", self.0)
    }
}

impl std::error::Error for HashingFailure {}

/// Password did not match the stored hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordMismatch;

impl fmt::Display for PasswordMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entered password was wrong")
    }
}

impl std::error::Error for PasswordMismatch {}

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error only if bcrypt itself fails
pub fn hash_password(password: &str) -> Result<HashedPassword, HashingFailure> {
    hash(password, DEFAULT_COST)
        .map(HashedPassword)
        .map_err(|e| HashingFailure(e.to_string()))
}

/// Verify a password against its hash
///
/// A hash that cannot be parsed counts as a mismatch.
pub fn verify_password(hashed: &HashedPassword, password: &str) -> Result<(), PasswordMismatch> {
    match verify(password, hashed.as_str()) {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err(PasswordMismatch),
    }
}

/// Reject passwords that bcrypt would silently truncate or that are empty.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_BYTES,
        ));
    }

    Ok(())
}
