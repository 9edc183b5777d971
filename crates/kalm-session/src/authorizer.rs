//! Access checks on behalf of every identity a session holds.
//!
//! Each predicate asks the enforcer once per effective subject and allows the
//! request if any subject is allowed. A session with no subjects, or an
//! enforcer with no grants, denies everything.
use crate::AuthPayload;
use kalm_authz::{Action, Enforcer, WILDCARD};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SessionAuthorizer {
    enforcer: Arc<Enforcer>,
    subjects: Vec<String>,
}

impl SessionAuthorizer {
    /// `subjects` are policy subject strings, already prefixed.
    pub fn new(enforcer: Arc<Enforcer>, subjects: Vec<String>) -> Self {
        Self { enforcer, subjects }
    }

    /// Fail-closed authorizer used before login and after logout.
    pub fn empty() -> Self {
        Self::new(Arc::new(Enforcer::empty()), Vec::new())
    }

    /// Authorizer over the default model built straight from a payload.
    pub async fn from_payload(payload: &AuthPayload) -> Self {
        Self::new(
            Arc::new(Enforcer::new(&payload.policies).await),
            payload.effective_subjects(),
        )
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn enforcer(&self) -> &Arc<Enforcer> {
        &self.enforcer
    }

    pub fn can(&self, action: &str, scope: &str, resource: &str) -> bool {
        self.subjects
            .iter()
            .any(|subject| self.enforcer.enforce(subject, action, scope, resource))
    }

    pub fn can_action(&self, action: Action, scope: &str, resource: &str) -> bool {
        self.can(action.as_str(), scope, resource)
    }

    pub fn can_view(&self, scope: &str, resource: &str) -> bool {
        self.can_action(Action::View, scope, resource)
    }

    pub fn can_edit(&self, scope: &str, resource: &str) -> bool {
        self.can_action(Action::Edit, scope, resource)
    }

    pub fn can_manage(&self, scope: &str, resource: &str) -> bool {
        self.can_action(Action::Manage, scope, resource)
    }

    pub fn can_view_namespace(&self, scope: &str) -> bool {
        self.can_view(scope, WILDCARD)
    }

    pub fn can_edit_namespace(&self, scope: &str) -> bool {
        self.can_edit(scope, WILDCARD)
    }

    pub fn can_manage_namespace(&self, scope: &str) -> bool {
        self.can_manage(scope, WILDCARD)
    }

    pub fn can_view_cluster(&self) -> bool {
        self.can_view(WILDCARD, WILDCARD)
    }

    pub fn can_edit_cluster(&self) -> bool {
        self.can_edit(WILDCARD, WILDCARD)
    }

    pub fn can_manage_cluster(&self) -> bool {
        self.can_manage(WILDCARD, WILDCARD)
    }
}

impl Default for SessionAuthorizer {
    fn default() -> Self {
        Self::empty()
    }
}
