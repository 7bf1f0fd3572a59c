//! Opaque token persistence: secret generation, the lifecycle store and an
//! in-memory repository.

pub mod memory;
pub mod opaque;
pub mod secret;

pub use memory::MemoryAuthStore;
pub use opaque::{OpaqueTokenStore, TokenLookup};
