//! Authenticated session owned by the application context.

use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    domain::{
        identity::{
            claims::{ClaimsSource, IdentityClaims},
            errors::ClaimsError,
        },
        tenants::resolution::TENANT_FIELD,
    },
    retry::{RetryHandle, RetryPolicy, spawn_retry},
};

#[derive(Debug, Clone)]
struct Session {
    claims: IdentityClaims,
    last_activity: Timestamp,
}

/// Holds the signed-in user's claims and tracks activity against an idle timeout.
pub struct AuthSessionManager {
    source: Arc<dyn ClaimsSource>,
    session: RwLock<Option<Session>>,
    idle_timeout: SignedDuration,
    retry: RetryPolicy,
}

impl AuthSessionManager {
    #[must_use]
    pub fn new(source: Arc<dyn ClaimsSource>, idle_timeout: SignedDuration) -> Self {
        Self {
            source,
            session: RwLock::new(None),
            idle_timeout,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Resolve claims from the source and start a session.
    ///
    /// # Errors
    ///
    /// Returns any error from fetching or resolving the token.
    pub async fn sign_in(&self, now: Timestamp) -> Result<IdentityClaims, ClaimsError> {
        let token = self.source.fetch(false).await?;
        let claims = IdentityClaims {
            last_activity: now,
            ..IdentityClaims::resolve(&token)?
        };

        info!(user = %claims.user_id, role = %claims.role, "signed in");

        *self.session.write().await = Some(Session {
            claims: claims.clone(),
            last_activity: now,
        });

        Ok(claims)
    }

    pub async fn sign_out(&self) {
        if let Some(session) = self.session.write().await.take() {
            info!(user = %session.claims.user_id, "signed out");
        }
    }

    /// Record user activity, extending the idle window.
    pub async fn touch(&self, now: Timestamp) {
        if let Some(session) = self.session.write().await.as_mut() {
            session.last_activity = now;
        }
    }

    /// Claims of the active session, `None` when signed out or idle for too long.
    pub async fn current_claims(&self, now: Timestamp) -> Option<IdentityClaims> {
        let guard = self.session.read().await;
        let session = guard.as_ref()?;

        if now.duration_since(session.last_activity) > self.idle_timeout {
            debug!(user = %session.claims.user_id, "session idle past timeout");
            return None;
        }

        Some(IdentityClaims {
            last_activity: session.last_activity,
            ..session.claims.clone()
        })
    }

    /// Force-refresh the token until it carries a tenant claim.
    ///
    /// Newly provisioned members may sign in before their tenant claim has been
    /// propagated; the refresh retries under the configured policy and updates
    /// the session on success.
    pub fn refresh_claims(self: &Arc<Self>) -> RetryHandle<IdentityClaims, ClaimsError> {
        let manager = Arc::clone(self);

        spawn_retry(
            self.retry,
            move |attempt| {
                let manager = Arc::clone(&manager);

                async move {
                    debug!(attempt, "refreshing identity claims");
                    manager.refresh_once().await
                }
            },
            ClaimsError::is_retryable,
        )
    }

    async fn refresh_once(&self) -> Result<IdentityClaims, ClaimsError> {
        let token = self.source.fetch(true).await?;
        let claims = IdentityClaims::resolve(&token)?;

        if claims.tenant_id.is_none() {
            return Err(ClaimsError::NotPropagated {
                claim: TENANT_FIELD,
            });
        }

        let mut session = self.session.write().await;

        let last_activity = session
            .as_ref()
            .map_or(claims.authenticated_at, |current| current.last_activity);

        *session = Some(Session {
            claims: claims.clone(),
            last_activity,
        });

        Ok(IdentityClaims {
            last_activity,
            ..claims
        })
    }
}
