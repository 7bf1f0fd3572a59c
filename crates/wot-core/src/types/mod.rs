//! Core type definitions used across the workspace.

pub mod id;
pub mod ttl;

pub use id::*;
pub use ttl::Ttl;
