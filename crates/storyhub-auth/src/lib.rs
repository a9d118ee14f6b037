//! # storyhub-auth
//!
//! Verification of the bearer credentials presented on connect. Tokens are
//! issued by the account service; the encoder exists for tooling and tests.

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
