//! Password reset tokens.

pub mod manager;

pub use manager::PasswordResetManager;
