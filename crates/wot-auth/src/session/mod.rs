//! Refresh sessions and expired token cleanup.

pub mod cleanup;
pub mod manager;

pub use cleanup::TokenSweeper;
pub use manager::{RefreshSessionManager, TokenPair};
