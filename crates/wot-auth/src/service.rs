//! Account flows composed from the lifecycle managers.
//!
//! This is the surface an HTTP layer calls: registration, login, session
//! refresh and logout, email verification and password recovery.

use std::sync::Arc;

use tracing::{debug, info, warn};
use validator::Validate;

use wot_core::error::AppError;
use wot_core::result::AppResult;
use wot_core::traits::{Clock, PasswordHasher};
use wot_database::repositories::{Account, IdentityRepository, NewAccount};
use wot_entity::role::{PermissionName, RoleName};
use wot_entity::user::{Credential, User, normalize_email};

use crate::jwt::{AccessClaims, TokenCodec};
use crate::notify::NotificationDispatcher;
use crate::password::PasswordValidator;
use crate::rbac::AuthorizationEvaluator;
use crate::reset::PasswordResetManager;
use crate::session::{RefreshSessionManager, TokenPair};
use crate::verification::EmailVerificationManager;

const INVALID_CREDENTIALS: &str = "Invalid credentials.";

/// Argon2id hash (default parameters) that no password matches. Unknown
/// emails are verified against it so they cost the same as known ones.
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$YBLs43vkp2XAxeAMklbhfQ$nD42AhtBPY9O/8JcHR4mrvPDB6LSgsnHkymKSOYosAs";

/// Registration fields checked before anything is written.
#[derive(Debug, Validate)]
struct Registration {
    #[validate(length(min = 1, message = "Display name must not be empty"))]
    display_name: String,
    #[validate(email(message = "Email address is not valid"))]
    email: String,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginResult {
    /// The authenticated user.
    pub user: User,
    /// Access token and the refresh token of the new session.
    pub tokens: TokenPair,
}

/// Orchestrates every account-level credential flow.
#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityRepository>,
    hasher: Arc<dyn PasswordHasher>,
    validator: PasswordValidator,
    codec: Arc<TokenCodec>,
    sessions: Arc<RefreshSessionManager>,
    verification: Arc<EmailVerificationManager>,
    reset: Arc<PasswordResetManager>,
    authorization: Arc<AuthorizationEvaluator>,
    notifications: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    default_roles: Vec<RoleName>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("default_roles", &self.default_roles)
            .finish()
    }
}

/// Collaborators an [`AuthService`] is assembled from.
#[derive(Clone)]
pub struct AuthServiceParts {
    /// User, credential and role lookups.
    pub identity: Arc<dyn IdentityRepository>,
    /// Password hashing primitive.
    pub hasher: Arc<dyn PasswordHasher>,
    /// Policy applied to new passwords.
    pub validator: PasswordValidator,
    /// Access token codec.
    pub codec: Arc<TokenCodec>,
    /// Refresh session manager.
    pub sessions: Arc<RefreshSessionManager>,
    /// Email verification manager.
    pub verification: Arc<EmailVerificationManager>,
    /// Password reset manager.
    pub reset: Arc<PasswordResetManager>,
    /// Permission checks.
    pub authorization: Arc<AuthorizationEvaluator>,
    /// Outbound mail.
    pub notifications: NotificationDispatcher,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Roles given to self-registered users.
    pub default_roles: Vec<RoleName>,
}

impl AuthService {
    /// Assemble the service.
    pub fn new(parts: AuthServiceParts) -> Self {
        Self {
            identity: parts.identity,
            hasher: parts.hasher,
            validator: parts.validator,
            codec: parts.codec,
            sessions: parts.sessions,
            verification: parts.verification,
            reset: parts.reset,
            authorization: parts.authorization,
            notifications: parts.notifications,
            clock: parts.clock,
            default_roles: parts.default_roles,
        }
    }

    /// Register a user with the default roles and send the verification mail.
    pub async fn register(
        &self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> AppResult<Account> {
        let roles = self.default_roles.clone();
        self.register_with_roles(display_name, email, password, &roles)
            .await
    }

    /// Register a user with explicit roles and send the verification mail.
    pub async fn register_with_roles(
        &self,
        display_name: &str,
        email: &str,
        password: &str,
        roles: &[RoleName],
    ) -> AppResult<Account> {
        let Registration {
            display_name,
            email,
        } = Registration::checked(display_name, email)?;
        self.validator
            .validate(password, &[email.as_str(), display_name.as_str()])?;

        if self.identity.find_credential_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("Email already in use."));
        }

        let password_hash = self.hasher.hash(password)?;
        let account = self
            .identity
            .create_account(
                &NewAccount {
                    display_name,
                    email,
                    password_hash,
                    roles: roles.to_vec(),
                },
                self.clock.now(),
            )
            .await?;

        let issued = self
            .verification
            .issue_verification(account.credential.id)
            .await?;
        self.notifications
            .send_verification(
                &account.credential.email,
                &account.user.display_name,
                &issued.value,
            )
            .await;

        info!(
            user_id = %account.user.id,
            credential_id = %account.credential.id,
            roles = ?roles,
            "User registered"
        );
        Ok(account)
    }

    /// Authenticate with email and password and open a new session.
    ///
    /// The password is checked before the verification state so that an
    /// unverified account is only revealed to someone who knows its password.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginResult> {
        let email = normalize_email(email);
        let Some(credential) = self.identity.find_credential_by_email(&email).await? else {
            let matched = self.hasher.verify(password, DUMMY_PASSWORD_HASH)?;
            debug!(matched, "Login attempt for unknown email");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };

        if !self.hasher.verify(password, &credential.password_hash)? {
            warn!(credential_id = %credential.id, "Login failed: wrong password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        if !credential.email_verified {
            info!(credential_id = %credential.id, "Login refused: email not verified");
            return Err(AppError::unauthorized("Email not verified."));
        }

        let user = self
            .identity
            .find_user(credential.user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

        let tokens = self.sessions.start_session(&user).await?;

        info!(user_id = %user.id, "Login successful");
        Ok(LoginResult { user, tokens })
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        self.sessions.rotate(refresh_token).await
    }

    /// End the session of the presented refresh token.
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        self.sessions.revoke_one(refresh_token).await
    }

    /// End every session of the user owning the presented refresh token.
    pub async fn logout_all(&self, refresh_token: &str) -> AppResult<u64> {
        let user_id = self.sessions.owner_of(refresh_token).await?;
        self.sessions.revoke_all(user_id).await
    }

    /// Issue a new verification token and mail it again.
    pub async fn resend_verification(&self, email: &str) -> AppResult<()> {
        let credential = self.credential_by_email(email).await?;
        if credential.email_verified {
            return Err(AppError::conflict("Email already verified."));
        }
        let user = self.owner_of_credential(&credential).await?;

        let issued = self.verification.issue_verification(credential.id).await?;
        self.notifications
            .send_verification(&credential.email, &user.display_name, &issued.value)
            .await;

        info!(credential_id = %credential.id, "Verification resent");
        Ok(())
    }

    /// Redeem a verification token and send the welcome mail.
    pub async fn verify_email(&self, token: &str) -> AppResult<Credential> {
        let credential = self.verification.consume(token).await?;

        match self.identity.find_user(credential.user_id).await? {
            Some(user) => {
                self.notifications
                    .send_welcome(&credential.email, &user.display_name)
                    .await;
            }
            None => warn!(credential_id = %credential.id, "Verified credential has no user"),
        }
        Ok(credential)
    }

    /// Start password recovery. Succeeds without effect for unknown emails.
    pub async fn forgot_password(&self, email: &str) -> AppResult<()> {
        let email = normalize_email(email);
        let Some(credential) = self.identity.find_credential_by_email(&email).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(());
        };
        let user = self.owner_of_credential(&credential).await?;

        let issued = self.reset.issue_reset(credential.id).await?;
        self.notifications
            .send_password_reset(&credential.email, &user.display_name, &issued.value)
            .await;

        info!(credential_id = %credential.id, "Password reset requested");
        Ok(())
    }

    /// Redeem a reset token, set the new password and end all sessions.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<Credential> {
        self.reset.consume(token, new_password).await
    }

    /// Verify an access token.
    pub fn authenticate(&self, access_token: &str) -> AppResult<AccessClaims> {
        Ok(self.codec.verify_access_token(access_token)?)
    }

    /// Verify an access token and require at least one of `required`
    /// against the caller's current permissions.
    pub async fn authorize_request(
        &self,
        access_token: &str,
        required: &[PermissionName],
    ) -> AppResult<AccessClaims> {
        let claims = self.authenticate(access_token)?;
        self.authorization.require(claims.sub, required).await?;
        Ok(claims)
    }

    async fn credential_by_email(&self, email: &str) -> AppResult<Credential> {
        self.identity
            .find_credential_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::not_found("User not found."))
    }

    async fn owner_of_credential(&self, credential: &Credential) -> AppResult<User> {
        self.identity
            .find_user(credential.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found."))
    }
}

impl Registration {
    fn checked(display_name: &str, email: &str) -> AppResult<Self> {
        let registration = Self {
            display_name: display_name.trim().to_string(),
            email: normalize_email(email),
        };
        registration
            .validate()
            .map_err(|e| AppError::validation(format!("Invalid registration: {e}")))?;
        Ok(registration)
    }
}

#[cfg(test)]
mod tests {
    use wot_core::error::ErrorKind;

    use super::*;

    #[test]
    fn test_registration_normalizes_fields() {
        let registration = Registration::checked("  Pat ", " Pat@Example.com ").unwrap();
        assert_eq!(registration.display_name, "Pat");
        assert_eq!(registration.email, "pat@example.com");
    }

    #[test]
    fn test_registration_rejects_malformed_email() {
        for bad in [
            "pat",
            "@example.com",
            "pat@",
            "pat smith@example.com",
            "pat@@example.com",
            "pat@exa mple.com",
        ] {
            let err = Registration::checked("Pat", bad).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation, "{bad} should be rejected");
        }
    }

    #[test]
    fn test_dummy_hash_is_well_formed() {
        let hasher = crate::password::Argon2PasswordHasher::new();
        assert!(!hasher.verify("Gr33n-Porcelain-Throne-42!", DUMMY_PASSWORD_HASH).unwrap());
    }

    #[test]
    fn test_registration_rejects_blank_display_name() {
        let err = Registration::checked("   ", "pat@example.com").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
