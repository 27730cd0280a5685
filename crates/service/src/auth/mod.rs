//! Bearer token verification.
//!
//! Tokens are issued by the external identity provider; this module only
//! checks the HS256 signature, expiry and (optionally) audience, and turns the
//! `sub` claim into the owning user id.
pub mod errors;
pub mod token;

pub use errors::AuthError;
pub use token::{AuthenticatedUser, Claims, TokenVerifier};
