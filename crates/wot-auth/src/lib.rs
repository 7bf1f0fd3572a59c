//! # wot-auth
//!
//! Credential and token lifecycle for World of Toilets.
//!
//! ## Modules
//!
//! - `jwt`: access token signing and verification against an injected clock
//! - `store`: opaque token issuance, lookup and retirement; in-memory repository
//! - `session`: refresh session rotation and revocation, expired token sweep
//! - `verification`: single-use email verification tokens
//! - `reset`: single-use password reset tokens that end every session
//! - `rbac`: permission checks over live role assignments
//! - `password`: Argon2id hashing and password policy
//! - `notify`: lifecycle mail dispatch
//! - `service`: account flows built from the above

pub mod components;
pub mod jwt;
pub mod notify;
pub mod password;
pub mod rbac;
pub mod reset;
pub mod service;
pub mod session;
pub mod store;
pub mod verification;

pub use components::AuthComponents;
pub use jwt::{AccessClaims, CodecError, TokenCodec};
pub use notify::{LogNotifier, NotificationDispatcher};
pub use password::{Argon2PasswordHasher, PasswordValidator};
pub use rbac::AuthorizationEvaluator;
pub use reset::PasswordResetManager;
pub use service::{AuthService, AuthServiceParts, LoginResult};
pub use session::{RefreshSessionManager, TokenPair, TokenSweeper};
pub use store::{MemoryAuthStore, OpaqueTokenStore, TokenLookup};
pub use verification::EmailVerificationManager;
