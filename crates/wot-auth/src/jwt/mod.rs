//! Access token encoding, verification and claims.

pub mod claims;
pub mod codec;
pub mod decoder;
pub mod encoder;

pub use claims::AccessClaims;
pub use codec::TokenCodec;
pub use decoder::{CodecError, JwtDecoder};
pub use encoder::{AccessToken, JwtEncoder};
