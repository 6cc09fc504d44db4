//! Identity material and capability-token verification

pub mod identity;
pub mod token;

pub use identity::Identity;
pub use token::{AcceptAll, JwtVerifier, TokenRejected, TokenVerifier};
