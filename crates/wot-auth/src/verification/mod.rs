//! Email verification tokens.

pub mod manager;

pub use manager::EmailVerificationManager;
