//! # wot-core
//!
//! Core crate for the World of Toilets credential lifecycle. Contains
//! configuration schemas, typed identifiers, the [`Ttl`](types::Ttl)
//! duration type, the seam traits implemented by other crates, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other workspace crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
