/// Password Hashing and Verification
///
/// Capability boundary for checking a presented secret against a stored
/// digest. The bcrypt implementation embeds a per-call random salt in the
/// digest; no plaintext secret is ever persisted or logged.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Port for password hashing, injected into the orchestrator
pub trait PasswordEncoder: Send + Sync {
    /// Hash a plaintext password
    ///
    /// # Errors
    /// Returns error if the password fails strength validation or hashing
    /// itself fails
    fn hash(&self, raw: &str) -> Result<String, AppError>;

    /// Verify a plaintext password against its stored digest
    fn matches(&self, raw: &str, digest: &str) -> Result<bool, AppError>;
}

/// bcrypt-backed encoder (adaptive hashing, salt embedded in the digest)
pub struct BcryptPasswordEncoder;

impl PasswordEncoder for BcryptPasswordEncoder {
    fn hash(&self, raw: &str) -> Result<String, AppError> {
        validate_password_strength(raw)?;

        hash(raw, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn matches(&self, raw: &str, digest: &str) -> Result<bool, AppError> {
        verify(raw, digest)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}

/// Validate password strength requirements
///
/// Requirements:
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - At least one digit
/// - At least one lowercase letter
/// - At least one uppercase letter
fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        )));
    }

    // Maximum length (bcrypt limitation and DoS prevention)
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        )));
    }

    Ok(())
}
