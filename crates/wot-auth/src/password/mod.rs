//! Password hashing and policy enforcement.

pub mod hasher;
pub mod validator;

pub use hasher::Argon2PasswordHasher;
pub use validator::PasswordValidator;
