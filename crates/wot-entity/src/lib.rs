//! # wot-entity
//!
//! Domain entity models for the credential lifecycle. Every struct here is
//! either a database row (deriving `sqlx::FromRow`) or a small value type.
//! Relations are plain foreign keys: a [`Credential`](user::Credential)
//! points at its user, a token points at its owner by id.

pub mod role;
pub mod token;
pub mod user;
