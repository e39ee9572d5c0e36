//! Worker authentication for the mirrors-qa control plane.
//!
//! Workers authenticate once per token lifetime with an RSA-PSS-signed
//! challenge (see [`handshake`]) and then carry an HS256 bearer token
//! (see [`jwt`]) on every subsequent request.

pub mod error;
pub mod handshake;
pub mod jwt;

pub use error::{AuthError, AuthResult};
pub use jwt::{Claims, JwtManager};
