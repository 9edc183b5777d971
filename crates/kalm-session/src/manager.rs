//! Session-scoped owner of the current authorizer.
//!
//! # Purpose
//! Applies login and logout events to the RBAC engine so the rest of the
//! application only ever reads a fully built [`SessionAuthorizer`].
//!
//! # Key invariants
//! - A login builds the new enforcer before replacing the old one; readers
//!   holding the previous `Arc` keep a consistent view.
//! - A payload with unchanged policy text reuses the current enforcer, but
//!   only one this manager's builder produced. The first authorized login
//!   always builds, so a bad custom model is reported even for empty policy
//!   text.
//! - Any failure or unauthorized payload leaves the session fail-closed.
//! - `generation` increases exactly when the visible authorizer changes.
use crate::{AuthPayload, SessionAuthorizer};
use kalm_authz::{AuthzResult, EnforcerBuilder};
use std::sync::Arc;

#[derive(Debug)]
pub struct SessionManager {
    builder: EnforcerBuilder,
    current: Arc<SessionAuthorizer>,
    policy_text: String,
    built: bool,
    generation: u64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::with_builder(EnforcerBuilder::default())
    }

    /// Manager whose enforcers come from `builder` (custom model or functions).
    pub fn with_builder(builder: EnforcerBuilder) -> Self {
        Self {
            builder,
            current: Arc::new(SessionAuthorizer::empty()),
            policy_text: String::new(),
            built: false,
            generation: 0,
        }
    }

    /// Apply a login payload.
    ///
    /// Returns `true` when the visible authorizer changed.
    ///
    /// # Errors
    /// - The builder's model or matcher fails to compile. The session is reset
    ///   to the empty authorizer before the error is returned.
    pub async fn login(&mut self, payload: &AuthPayload) -> AuthzResult<bool> {
        if !payload.authorized {
            tracing::debug!("unauthorized session payload; resetting rbac state");
            return Ok(self.reset());
        }

        let subjects = payload.effective_subjects();
        let same_policy = self.built && payload.policies == self.policy_text;
        if same_policy && subjects.as_slice() == self.current.subjects() {
            tracing::debug!(generation = self.generation, "session unchanged; skipping rebuild");
            return Ok(false);
        }

        let enforcer = if same_policy {
            Arc::clone(self.current.enforcer())
        } else {
            match self.builder.build(&payload.policies).await {
                Ok(enforcer) => Arc::new(enforcer),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to build rbac enforcer; resetting");
                    self.reset();
                    return Err(err);
                }
            }
        };

        self.current = Arc::new(SessionAuthorizer::new(enforcer, subjects));
        self.policy_text.clone_from(&payload.policies);
        self.built = true;
        self.generation += 1;
        tracing::debug!(
            generation = self.generation,
            subjects = self.current.subjects().len(),
            rebuilt = !same_policy,
            "session authorizer updated"
        );
        Ok(true)
    }

    /// Drop every grant and identity. Returns `true` if anything was held.
    pub fn logout(&mut self) -> bool {
        self.reset()
    }

    /// Current authorizer; cheap to clone and safe to keep across reloads.
    pub fn authorizer(&self) -> Arc<SessionAuthorizer> {
        Arc::clone(&self.current)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn reset(&mut self) -> bool {
        self.built = false;
        let held = !self.policy_text.is_empty() || !self.current.subjects().is_empty();
        if !held {
            return false;
        }
        self.current = Arc::new(SessionAuthorizer::empty());
        self.policy_text.clear();
        self.generation += 1;
        true
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
