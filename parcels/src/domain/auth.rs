//! Credential resolution into an access level.
//!
//! Resolution is total: "no session" and provider failures both yield
//! [`Access::Guest`] so the map keeps working without an account.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::filters::Role;
use super::ports::CredentialProvider;

/// Opaque bearer credential. The secret is wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(Zeroizing<String>);

impl BearerToken {
    /// Wrap a raw token, returning `None` when it is blank.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = Zeroizing::new(raw.into());
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Raw secret for building the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Resolved access: a role plus the credential backing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Access {
    /// No credential; guest-restricted queries.
    #[default]
    Guest,
    /// Holder of a bearer credential.
    Registered(BearerToken),
}

impl Access {
    /// Role implied by this access.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Guest => Role::Guest,
            Self::Registered(_) => Role::Registered,
        }
    }

    /// Credential to attach to outbound requests, if any.
    #[must_use]
    pub const fn token(&self) -> Option<&BearerToken> {
        match self {
            Self::Guest => None,
            Self::Registered(token) => Some(token),
        }
    }
}

/// Boundary adapter over a [`CredentialProvider`].
#[derive(Clone)]
pub struct AuthResolver {
    provider: Arc<dyn CredentialProvider>,
}

impl AuthResolver {
    /// Build a resolver over the given provider.
    #[must_use]
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self { provider }
    }

    /// Obtain the current access level. Never fails.
    pub async fn resolve(&self) -> Access {
        match self.provider.current_token().await {
            Ok(Some(token)) => Access::Registered(token),
            Ok(None) => {
                debug!("no active session; continuing as guest");
                Access::Guest
            }
            Err(error) => {
                warn!(%error, "credential lookup failed; continuing as guest");
                Access::Guest
            }
        }
    }
}
