//! Repository contracts and their PostgreSQL implementations.

pub mod identity;
pub mod token;
pub mod traits;

pub use identity::PgIdentityRepository;
pub use token::PgTokenRepository;
pub use traits::{
    Account, ConsumeEffect, ConsumeOutcome, IdentityRepository, NewAccount, RotateOutcome,
    TokenRepository,
};
