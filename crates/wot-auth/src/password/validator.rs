//! Password policy enforcement for new passwords.

use wot_core::config::AuthConfig;
use wot_core::error::AppError;

/// Upper bound on accepted password length, in characters.
const MAX_LENGTH: usize = 128;

/// Validates password strength against the configured policy.
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    min_length: usize,
}

impl PasswordValidator {
    /// Create a validator from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_min_length(config.password_min_length)
    }

    /// Create a validator with an explicit minimum length.
    pub fn with_min_length(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Check a candidate password.
    ///
    /// `user_inputs` are account details (email, display name) that make a
    /// password easier to guess when it contains them.
    pub fn validate(&self, password: &str, user_inputs: &[&str]) -> Result<(), AppError> {
        let length = password.chars().count();
        if length < self.min_length {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters long",
                self.min_length
            )));
        }
        if length > MAX_LENGTH {
            return Err(AppError::validation(format!(
                "Password must be at most {MAX_LENGTH} characters long"
            )));
        }

        let estimate = zxcvbn::zxcvbn(password, user_inputs);
        if estimate.score() < zxcvbn::Score::Three {
            return Err(AppError::validation(
                "Password is too weak. Please use a stronger password with more entropy.",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wot_core::error::ErrorKind;

    use super::*;

    #[test]
    fn test_length_bounds() {
        let validator = PasswordValidator::with_min_length(8);

        let err = validator.validate("Sh0rt!", &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("at least 8"));

        let long = "x".repeat(MAX_LENGTH + 1);
        assert!(validator.validate(&long, &[]).is_err());
    }

    #[test]
    fn test_weak_password_rejected() {
        let validator = PasswordValidator::with_min_length(8);
        assert!(validator.validate("password1", &[]).is_err());
        assert!(validator.validate("qwertyuiop", &[]).is_err());
    }

    #[test]
    fn test_strong_password_accepted() {
        let validator = PasswordValidator::with_min_length(8);
        assert!(
            validator
                .validate("Gr33n-Porcelain-Throne-42!", &[])
                .is_ok()
        );
    }

    #[test]
    fn test_account_details_weaken_password() {
        let validator = PasswordValidator::with_min_length(8);
        let inputs = ["pat.lavatory@example.com", "patlavatory"];
        assert!(validator.validate("patlavatory", &inputs).is_err());
    }
}
