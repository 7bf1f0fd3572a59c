//! Opaque token entities shared by refresh, verification and reset flows.

pub mod kind;
pub mod model;

pub use kind::TokenKind;
pub use model::{IssuedToken, OpaqueToken, TokenState};
