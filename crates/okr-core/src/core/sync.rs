//! Sync service: session transitions and the sign-in sync.

use serde::Serialize;
use tracing::{debug, info};

use crate::identity::{AuthEvent, Identity, IdentityProvider, SessionTransition};
use crate::sync::{CancelToken, SyncEngine, SyncError, SyncReport};

use super::{CoreError, CoreResult, Tracker};

/// Result of a successful sign-in.
#[derive(Debug, Clone, Serialize)]
pub struct SignIn {
    pub identity: Identity,
    /// `None` when the owner was already signed in and no sync ran.
    pub sync: Option<SyncReport>,
}

/// Service for session and sync operations.
pub struct SyncService<'a> {
    tracker: &'a Tracker,
}

impl<'a> SyncService<'a> {
    pub(crate) const fn new(tracker: &'a Tracker) -> Self {
        Self { tracker }
    }

    /// Fold a provider event into the session.
    ///
    /// A transition to a new signed-in owner cancels any sync still running
    /// for the previous owner and runs one sync for the new one. Signing out
    /// cancels a running sync. Repeated events do nothing.
    pub fn handle_auth_event(&self, event: &AuthEvent) -> CoreResult<Option<SyncReport>> {
        let transition = self.tracker.session().apply(event);
        match transition {
            SessionTransition::SignedIn(owner) => {
                info!(owner = %owner, "Signed in");
                let token = self.replace_running();
                self.run_for(&owner, &token).map(Some)
            }
            SessionTransition::SignedOut => {
                info!("Signed out");
                if let Some(token) = self.tracker.running_sync().take() {
                    token.cancel();
                }
                Ok(None)
            }
            SessionTransition::Unchanged => {
                debug!("Auth event did not change the session");
                Ok(None)
            }
        }
    }

    /// Sign in through the provider, then sync.
    pub fn sign_in(
        &self,
        provider: &dyn IdentityProvider,
        email: &str,
        password: &str,
    ) -> CoreResult<SignIn> {
        let identity = provider.login(email, password)?;
        self.signed_in(identity)
    }

    /// Create an account through the provider, then sync.
    pub fn register(
        &self,
        provider: &dyn IdentityProvider,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> CoreResult<SignIn> {
        let identity = provider.register(email, password, display_name)?;
        self.signed_in(identity)
    }

    /// Sign out through the provider.
    pub fn sign_out(&self, provider: &dyn IdentityProvider) -> CoreResult<()> {
        provider.logout()?;
        self.handle_auth_event(&AuthEvent::SignedOut)?;
        Ok(())
    }

    /// Run a sync for the current owner outside a sign-in transition.
    ///
    /// Returns `Err(CoreError::SignedOut)` when no owner is signed in.
    pub fn sync_now(&self) -> CoreResult<SyncReport> {
        let owner = self.tracker.owner().ok_or(CoreError::SignedOut)?;
        let token = self.replace_running();
        self.run_for(&owner, &token)
    }

    /// Cancel the running sync, if any. Returns whether one was cancelled.
    pub fn cancel(&self) -> bool {
        self.tracker.running_sync().take().is_some_and(|token| {
            token.cancel();
            true
        })
    }

    fn signed_in(&self, identity: Identity) -> CoreResult<SignIn> {
        let sync = self.handle_auth_event(&AuthEvent::SignedIn {
            owner_id: identity.owner_id.clone(),
        })?;
        Ok(SignIn { identity, sync })
    }

    /// Install a fresh token, cancelling the one it replaces.
    fn replace_running(&self) -> CancelToken {
        let token = CancelToken::new();
        if let Some(previous) = self.tracker.running_sync().replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Push `owner`'s queued changes to the remote so the merge sees them.
    ///
    /// Remote wins on id collisions, so an undelivered edit or delete would
    /// otherwise be reverted locally by the sync.
    fn deliver_pending(&self, owner: &str) -> Result<(), SyncError> {
        match self.tracker.outbox().flush_owner(owner, self.tracker.remote()) {
            Ok(report) => {
                if report.delivered > 0 {
                    debug!(owner, delivered = report.delivered, "Sync: delivered pending changes");
                }
                Ok(())
            }
            Err((write, source)) => Err(SyncError::PendingWrite {
                collection: write.collection,
                id: write.id,
                source,
            }),
        }
    }

    fn run_for(&self, owner: &str, token: &CancelToken) -> CoreResult<SyncReport> {
        let result = {
            let _gate = self.tracker.write_gate();
            self.deliver_pending(owner).and_then(|()| {
                SyncEngine::new(self.tracker.local(), self.tracker.remote()).run(owner, token)
            })
        };

        let mut running = self.tracker.running_sync();
        if running.as_ref().is_some_and(|t| t.same_as(token)) {
            *running = None;
        }
        Ok(result?)
    }
}
