//! Driven port for obtaining the current session credential.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::BearerToken;

define_port_error! {
    /// Errors surfaced while looking up a credential.
    pub enum CredentialProviderError {
        /// The credential source could not be consulted.
        Unavailable { message: String } =>
            "credential source unavailable: {message}",
        /// A credential exists but is unusable.
        Malformed { message: String } =>
            "credential malformed: {message}",
    }
}

/// Port yielding the bearer token of the active session, if any.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return the current token, or `None` when there is no active session.
    async fn current_token(&self) -> Result<Option<BearerToken>, CredentialProviderError>;
}

