//! Authentication collaborator implementations.

pub mod jwt;

pub use jwt::{JwtAuthenticator, TokenClaims, issue_token};
