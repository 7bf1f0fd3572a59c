//! Password hashing primitive contract.

use crate::result::AppResult;

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Hash a plaintext password into a self-describing string.
    fn hash(&self, plain: &str) -> AppResult<String>;

    /// Check a plaintext password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; `Err` is reserved for unusable hashes.
    fn verify(&self, plain: &str, hash: &str) -> AppResult<bool>;
}
