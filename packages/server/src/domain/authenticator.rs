//! Authentication collaborator interface.

use async_trait::async_trait;

use super::{AuthError, Identity};

/// Verifies connection-supplied credentials.
///
/// Credential issuance lives outside the engine; it only consumes the
/// verified identity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Identity, AuthError>;
}
