//! User and credential entities.

pub mod credential;
pub mod model;

pub use credential::{Credential, normalize_email};
pub use model::User;
