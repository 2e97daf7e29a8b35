//! Resolves the active principal from stored credentials.

use std::time::Duration;

use shared::domain::Principal;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    credentials::{CredentialStore, SessionContext, StoredCredentials},
    error::ClientError,
    SessionsApi,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("no authentication token found")]
    MissingToken,
    #[error("failed to fetch user profile: {0}")]
    ProfileUnavailable(String),
    #[error("invalid user data received: {0}")]
    InvalidProfile(String),
}

#[derive(Debug, Clone)]
pub enum AuthOutcome {
    Authenticated {
        context: SessionContext,
        principal: Principal,
    },
    /// Credentials were cleared; the front end should send the user to the
    /// login surface once `redirect_after` has elapsed.
    Required {
        failure: AuthFailure,
        redirect_after: Duration,
    },
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

pub struct AuthResolver<'a> {
    store: &'a dyn CredentialStore,
    api: &'a dyn SessionsApi,
    redirect_delay: Duration,
}

impl<'a> AuthResolver<'a> {
    pub fn new(
        store: &'a dyn CredentialStore,
        api: &'a dyn SessionsApi,
        redirect_delay: Duration,
    ) -> Self {
        Self {
            store,
            api,
            redirect_delay,
        }
    }

    pub async fn resolve(&self) -> AuthOutcome {
        let credentials = self.store.load().unwrap_or_else(|err| {
            warn!("credential store unreadable, treating as empty: {err}");
            StoredCredentials::default()
        });
        let Some(context) = credentials.resolve() else {
            return self.fail(AuthFailure::MissingToken);
        };

        match self.api.fetch_profile(&context).await {
            Ok(principal) => {
                if let Err(err) = self.store.cache_principal(&principal) {
                    warn!("failed to cache principal: {err}");
                }
                info!(kind = %context.kind, name = %principal.name, "authenticated");
                AuthOutcome::Authenticated { context, principal }
            }
            Err(err @ (ClientError::Malformed { .. } | ClientError::Rejected { .. })) => {
                self.fail(AuthFailure::InvalidProfile(err.to_string()))
            }
            Err(err) => self.fail(AuthFailure::ProfileUnavailable(err.to_string())),
        }
    }

    fn fail(&self, failure: AuthFailure) -> AuthOutcome {
        error!("authentication error: {failure}");
        if let Err(err) = self.store.clear() {
            warn!("failed to clear stored credentials: {err}");
        }
        AuthOutcome::Required {
            failure,
            redirect_after: self.redirect_delay,
        }
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
