//! Policy enforcer built from a model and a policy text blob.
//!
//! # Purpose and responsibility
//! Wraps a casbin enforcer loaded from the lenient rule store, with the
//! crate's [`RoleGraph`] installed as its role manager, and answers access
//! questions against it.
//!
//! # Where it fits
//! Constructed by the session layer after login and by `policyctl` from
//! files. There is no global instance; callers own and pass it explicitly.
//!
//! # Key invariants and assumptions
//! - `load_policies` replaces every grant and grouping. The new casbin
//!   enforcer and role graph are built before they are swapped in.
//! - Enforcement is a pure read and always returns a bool. Evaluation errors
//!   are logged and deny.
//! - An enforcer without grants denies every request.
//! - Requests are positional in request-definition order.
use crate::{
    Action, AuthzResult, DEFAULT_MODEL, FunctionMap, Model, PolicyRule, PolicySet, RoleGraph,
    WILDCARD,
};
use casbin::function_map::OperatorFunction;
use casbin::{CoreApi, MemoryAdapter, MgmtApi, RoleManager};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

const SUBJECT_FIELD: &str = "sub";

/// Reusable recipe for building enforcers with a custom model or functions.
///
/// # Example
/// ```rust
/// use kalm_authz::{Enforcer, OperatorFunction, dynamic_to_str};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let exact = OperatorFunction::Arg2(|request, grant| {
///     (dynamic_to_str(&request) == dynamic_to_str(&grant)).into()
/// });
///
/// let builder = Enforcer::builder().function("objMatchFunc", exact);
/// let enforcer = builder
///     .build("p, alice, view, ns1, pods/*\n")
///     .await
///     .expect("build");
/// assert!(!enforcer.can_view("alice", "ns1", "pods/a"));
/// assert!(enforcer.can_view("alice", "ns1", "pods/*"));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct EnforcerBuilder {
    model: Option<String>,
    functions: FunctionMap,
}

impl EnforcerBuilder {
    /// Use `text` as the model document instead of [`DEFAULT_MODEL`].
    pub fn model(mut self, text: impl Into<String>) -> Self {
        self.model = Some(text.into());
        self
    }

    /// Register a matcher function, replacing any built-in of the same name.
    pub fn function(mut self, name: impl Into<String>, function: OperatorFunction) -> Self {
        self.functions.insert(name, function);
        self
    }

    /// Build an enforcer and load `policy_text` into it.
    ///
    /// The model is compiled even when `policy_text` is empty.
    ///
    /// # Errors
    /// - Any model or matcher compilation error. Policy text never fails.
    pub async fn build(&self, policy_text: &str) -> AuthzResult<Enforcer> {
        let model_text = self.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let loaded = Loaded::compile(model_text, &self.functions, policy_text).await?;
        let mut enforcer = Enforcer {
            model: Model::default(),
            functions: self.functions.clone(),
            inner: None,
            roles: Arc::default(),
            policies: PolicySet::empty(),
            generation: 0,
        };
        enforcer.install(loaded);
        Ok(enforcer)
    }
}

/// Everything one policy load produces, built before anything is swapped in.
struct Loaded {
    model: Model,
    inner: casbin::Enforcer,
    roles: Arc<RwLock<RoleGraph>>,
    policies: PolicySet,
}

impl Loaded {
    async fn compile(
        model_text: &str,
        functions: &FunctionMap,
        policy_text: &str,
    ) -> AuthzResult<Self> {
        let (model, compiled) = Model::compile(model_text).await?;
        let policies = PolicySet::parse(policy_text, model.policy_fields().len());

        let mut inner = casbin::Enforcer::new(compiled, MemoryAdapter::default()).await?;
        functions.register(&mut inner);

        let roles = Arc::new(RwLock::new(RoleGraph::default()));
        if model.has_role_definition() {
            let manager: Arc<RwLock<dyn RoleManager>> = roles.clone();
            inner.set_role_manager(manager)?;
        }

        let rules: Vec<Vec<String>> = policies
            .policies()
            .iter()
            .map(|rule| rule.values().to_vec())
            .collect();
        if !rules.is_empty() && !inner.add_policies(rules).await? {
            tracing::debug!("casbin reported duplicate grants");
        }

        if model.has_role_definition() {
            let groupings: Vec<Vec<String>> = policies
                .groupings()
                .iter()
                .map(|grouping| vec![grouping.member.clone(), grouping.role.clone()])
                .collect();
            if !groupings.is_empty() && !inner.add_grouping_policies(groupings).await? {
                tracing::debug!("casbin reported duplicate groupings");
            }
            inner.build_role_links()?;
        }

        Ok(Self {
            model,
            inner,
            roles,
            policies,
        })
    }
}

pub struct Enforcer {
    model: Model,
    functions: FunctionMap,
    inner: Option<casbin::Enforcer>,
    roles: Arc<RwLock<RoleGraph>>,
    policies: PolicySet,
    generation: u64,
}

impl Enforcer {
    /// Enforcer over the default model with `policy_text` loaded.
    pub async fn new(policy_text: &str) -> Self {
        EnforcerBuilder::default()
            .build(policy_text)
            .await
            .expect("default model must compile")
    }

    /// Enforcer with no grants; every check is denied.
    pub fn empty() -> Self {
        Self {
            model: Model::default(),
            functions: FunctionMap::default(),
            inner: None,
            roles: Arc::default(),
            policies: PolicySet::empty(),
            generation: 0,
        }
    }

    pub fn builder() -> EnforcerBuilder {
        EnforcerBuilder::default()
    }

    /// Replace every grant and grouping with those in `policy_text`.
    ///
    /// On error the enforcer keeps its previous state.
    pub async fn load_policies(&mut self, policy_text: &str) -> AuthzResult<()> {
        let loaded = Loaded::compile(self.model.text(), &self.functions, policy_text).await?;
        self.install(loaded);
        Ok(())
    }

    fn install(&mut self, loaded: Loaded) {
        self.model = loaded.model;
        self.inner = Some(loaded.inner);
        self.roles = loaded.roles;
        self.policies = loaded.policies;
        self.generation += 1;
        tracing::info!(
            generation = self.generation,
            policies = self.policies.policies().len(),
            groupings = self.policies.groupings().len(),
            skipped = self.policies.skipped().len(),
            "loaded rbac policies"
        );
    }

    /// Register a matcher function on the live enforcer and on later reloads.
    pub fn add_function(&mut self, name: impl Into<String>, function: OperatorFunction) {
        let name = name.into();
        if let Some(inner) = self.inner.as_mut() {
            inner.add_function(&name, function);
        }
        self.functions.insert(name, function);
    }

    /// Whether `subject` may perform `action` on `resource` within `scope`.
    pub fn enforce(&self, subject: &str, action: &str, scope: &str, resource: &str) -> bool {
        self.enforce_request(&[subject, action, scope, resource])
    }

    /// Evaluate a request given in request-definition order.
    ///
    /// A request with the wrong number of values is denied.
    pub fn enforce_request(&self, request: &[&str]) -> bool {
        // casbin evaluates the matcher once against blank grant values when
        // no grants are loaded.
        let Some(inner) = self.inner.as_ref().filter(|_| !self.policies.policies().is_empty())
        else {
            tracing::trace!(?request, "no rbac grants loaded; denying");
            return false;
        };

        let expected = self.model.request_fields().len();
        if request.len() != expected {
            tracing::warn!(
                expected,
                actual = request.len(),
                "rbac request arity mismatch; denying"
            );
            return false;
        }

        let values: Vec<String> = request.iter().map(|value| value.to_string()).collect();
        match inner.enforce(values) {
            Ok(allowed) => {
                tracing::trace!(?request, allowed, "rbac decision");
                allowed
            }
            Err(err) => {
                tracing::warn!(error = %err, ?request, "rbac matcher evaluation failed; denying");
                false
            }
        }
    }

    pub fn enforce_action(
        &self,
        subject: &str,
        action: Action,
        scope: &str,
        resource: &str,
    ) -> bool {
        self.enforce(subject, action.as_str(), scope, resource)
    }

    pub fn can_view(&self, subject: &str, scope: &str, resource: &str) -> bool {
        self.enforce_action(subject, Action::View, scope, resource)
    }

    pub fn can_edit(&self, subject: &str, scope: &str, resource: &str) -> bool {
        self.enforce_action(subject, Action::Edit, scope, resource)
    }

    pub fn can_manage(&self, subject: &str, scope: &str, resource: &str) -> bool {
        self.enforce_action(subject, Action::Manage, scope, resource)
    }

    /// Every resource in `scope`.
    pub fn can_view_namespace(&self, subject: &str, scope: &str) -> bool {
        self.can_view(subject, scope, WILDCARD)
    }

    pub fn can_edit_namespace(&self, subject: &str, scope: &str) -> bool {
        self.can_edit(subject, scope, WILDCARD)
    }

    pub fn can_manage_namespace(&self, subject: &str, scope: &str) -> bool {
        self.can_manage(subject, scope, WILDCARD)
    }

    /// Every resource in every scope.
    pub fn can_view_cluster(&self, subject: &str) -> bool {
        self.can_view(subject, WILDCARD, WILDCARD)
    }

    pub fn can_edit_cluster(&self, subject: &str) -> bool {
        self.can_edit(subject, WILDCARD, WILDCARD)
    }

    pub fn can_manage_cluster(&self, subject: &str) -> bool {
        self.can_manage(subject, WILDCARD, WILDCARD)
    }

    /// `subject` and every role it inherits, subject first.
    pub fn roles_for(&self, subject: &str) -> Vec<String> {
        let roles = self.roles.read().expand(subject);
        roles.iter().map(str::to_string).collect()
    }

    /// Grants held by `subject` directly or through any inherited role.
    pub fn implicit_permissions(&self, subject: &str) -> Vec<&PolicyRule> {
        let Some(idx) = self.model.policy_index(SUBJECT_FIELD) else {
            return Vec::new();
        };
        let roles = self.roles.read().expand(subject);
        self.policies
            .policies()
            .iter()
            .filter(|rule| roles.contains(rule.get(idx)))
            .collect()
    }

    pub fn policy_set(&self) -> &PolicySet {
        &self.policies
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Number of policy loads since construction.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for Enforcer {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Enforcer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enforcer")
            .field("model", &self.model)
            .field("functions", &self.functions)
            .field("policies", &self.policies)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthzError, dynamic_to_str};
    use casbin::rhai::Dynamic;

    const NAMESPACE_POLICY: &str = "\
p, role_ns1Viewer, view, ns1, *
p, role_ns1Editor, edit, ns1, *
p, role_ns1Owner, manage, ns1, *
g, role_ns1Editor, role_ns1Viewer
g, role_ns1Owner, role_ns1Editor
g, ns1Viewer, role_ns1Viewer
g, ns1Editor, role_ns1Editor
g, ns1Owner, role_ns1Owner
p, role_clusterViewer, view, *, *
g, clusterViewer, role_clusterViewer
p, Nio, edit, ns2, components/*
";

    fn exact() -> OperatorFunction {
        OperatorFunction::Arg2(|request: Dynamic, grant: Dynamic| {
            (dynamic_to_str(&request) == dynamic_to_str(&grant)).into()
        })
    }

    #[tokio::test]
    async fn namespace_viewer_cannot_edit() {
        let enforcer = Enforcer::new(NAMESPACE_POLICY).await;
        assert!(enforcer.can_view_namespace("ns1Viewer", "ns1"));
        assert!(!enforcer.can_edit_namespace("ns1Viewer", "ns1"));
        assert!(!enforcer.can_view_namespace("ns1Viewer", "ns2"));
    }

    #[tokio::test]
    async fn chained_roles_accumulate_grants() {
        let enforcer = Enforcer::new(NAMESPACE_POLICY).await;
        assert!(enforcer.can_view_namespace("ns1Owner", "ns1"));
        assert!(enforcer.can_edit_namespace("ns1Owner", "ns1"));
        assert!(enforcer.can_manage_namespace("ns1Owner", "ns1"));

        assert!(enforcer.can_view_namespace("ns1Editor", "ns1"));
        assert!(enforcer.can_edit_namespace("ns1Editor", "ns1"));
        assert!(!enforcer.can_manage_namespace("ns1Editor", "ns1"));
    }

    #[tokio::test]
    async fn cluster_scope_wildcard_applies_everywhere() {
        let enforcer = Enforcer::new(NAMESPACE_POLICY).await;
        assert!(enforcer.can_view_namespace("clusterViewer", "ns1"));
        assert!(enforcer.can_view_namespace("clusterViewer", "ns2"));
        assert!(enforcer.can_view_cluster("clusterViewer"));
        assert!(!enforcer.can_edit_namespace("clusterViewer", "ns1"));
        assert!(!enforcer.can_view_cluster("ns1Viewer"));
    }

    #[tokio::test]
    async fn resource_prefix_grant() {
        let enforcer = Enforcer::new(NAMESPACE_POLICY).await;
        assert!(enforcer.enforce("Nio", "edit", "ns2", "components/abc"));
        assert!(!enforcer.enforce("Nio", "edit", "ns2", "pod/abc"));
        assert!(!enforcer.enforce("Nio", "edit", "ns1", "components/abc"));
        assert!(!enforcer.can_edit_namespace("Nio", "ns2"));
    }

    #[tokio::test]
    async fn request_arity_mismatch_is_denied() {
        let enforcer = Enforcer::new(NAMESPACE_POLICY).await;
        assert!(!enforcer.enforce_request(&["ns1Viewer", "view", "ns1"]));
        assert!(enforcer.enforce_request(&["ns1Viewer", "view", "ns1", "*"]));
    }

    #[tokio::test]
    async fn reload_replaces_previous_grants() {
        let mut enforcer = Enforcer::new(NAMESPACE_POLICY).await;
        assert_eq!(enforcer.generation(), 1);
        enforcer
            .load_policies("p, someoneElse, view, ns9, *\n")
            .await
            .expect("reload");
        assert_eq!(enforcer.generation(), 2);
        assert!(!enforcer.can_view_namespace("ns1Viewer", "ns1"));
        assert!(enforcer.can_view_namespace("someoneElse", "ns9"));
        assert_eq!(enforcer.roles_for("ns1Viewer"), ["ns1Viewer"]);
    }

    #[tokio::test]
    async fn empty_enforcer_denies_everything() {
        let enforcer = Enforcer::default();
        assert!(!enforcer.can_view_cluster("anyone"));
        assert!(!enforcer.enforce("", "", "", ""));
        assert!(enforcer.policy_set().is_empty());

        let loaded = Enforcer::new("g, alice, role_ns1Viewer\n").await;
        assert!(!loaded.enforce("", "", "", ""));
        assert!(!loaded.can_view_cluster("alice"));
    }

    #[tokio::test]
    async fn duplicate_lines_load_once() {
        let enforcer =
            Enforcer::new("p, viewer, view, ns1, *\np, viewer, view, ns1, *\ng, a, viewer\ng, a, viewer\n")
                .await;
        assert!(enforcer.can_view_namespace("a", "ns1"));
        assert_eq!(enforcer.roles_for("a"), ["a", "viewer"]);
    }

    #[tokio::test]
    async fn role_chains_have_no_depth_limit() {
        let mut text = String::from("p, role_12, view, ns1, *\n");
        for i in 0..12 {
            text.push_str(&format!("g, role_{i}, role_{}\n", i + 1));
        }
        let enforcer = Enforcer::new(&text).await;
        assert!(enforcer.can_view_namespace("role_0", "ns1"));
        assert_eq!(enforcer.roles_for("role_0").len(), 13);
    }

    #[tokio::test]
    async fn roles_and_implicit_permissions() {
        let enforcer = Enforcer::new(NAMESPACE_POLICY).await;
        assert_eq!(
            enforcer.roles_for("ns1Owner"),
            [
                "ns1Owner",
                "role_ns1Owner",
                "role_ns1Editor",
                "role_ns1Viewer"
            ]
        );
        let actions: Vec<&str> = enforcer
            .implicit_permissions("ns1Owner")
            .into_iter()
            .map(PolicyRule::action)
            .collect();
        assert_eq!(actions, ["view", "edit", "manage"]);
        assert!(enforcer.implicit_permissions("stranger").is_empty());
    }

    #[tokio::test]
    async fn add_function_replaces_resource_matching() {
        let mut enforcer = Enforcer::new(NAMESPACE_POLICY).await;
        assert!(enforcer.enforce("Nio", "edit", "ns2", "components/abc"));
        enforcer.add_function("objMatchFunc", exact());
        assert!(!enforcer.enforce("Nio", "edit", "ns2", "components/abc"));
        assert!(enforcer.enforce("Nio", "edit", "ns2", "components/*"));

        enforcer
            .load_policies(NAMESPACE_POLICY)
            .await
            .expect("reload");
        assert!(!enforcer.enforce("Nio", "edit", "ns2", "components/abc"));
    }

    #[tokio::test]
    async fn custom_model_changes_request_shape() {
        let model = "\
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub) && keyMatch(r.obj, p.obj) && r.act == p.act
";
        let enforcer = Enforcer::builder()
            .model(model)
            .build("p, reader, components/*, view\ng, alice, reader\np, bad, line\n")
            .await
            .expect("build");
        assert!(enforcer.enforce_request(&["alice", "components/abc", "view"]));
        assert!(!enforcer.enforce_request(&["alice", "pods/abc", "view"]));
        assert!(!enforcer.enforce("alice", "view", "ns1", "components/abc"));
        assert_eq!(enforcer.policy_set().skipped().len(), 1);
        assert_eq!(enforcer.model().request_fields(), ["sub", "obj", "act"]);
    }

    #[tokio::test]
    async fn model_without_roles_ignores_groupings() {
        let model = DEFAULT_MODEL
            .replace("[role_definition]\ng = _, _\n", "")
            .replace("g(r.sub, p.sub)", "r.sub == p.sub");
        let enforcer = Enforcer::builder()
            .model(model)
            .build("p, viewer, view, ns1, *\ng, alice, viewer\n")
            .await
            .expect("build");
        assert!(enforcer.can_view_namespace("viewer", "ns1"));
        assert!(!enforcer.can_view_namespace("alice", "ns1"));
        assert_eq!(enforcer.roles_for("alice"), ["alice"]);
    }

    #[tokio::test]
    async fn unknown_matcher_function_denies() {
        let enforcer = Enforcer::builder()
            .model(DEFAULT_MODEL.replace("objMatchFunc", "noSuchMatch"))
            .build(NAMESPACE_POLICY)
            .await
            .expect("functions resolve at evaluation");
        assert!(!enforcer.can_view_namespace("ns1Viewer", "ns1"));
    }

    #[tokio::test]
    async fn builder_surfaces_model_errors() {
        let err = Enforcer::builder()
            .model(DEFAULT_MODEL.replace("&& r.act == p.act", "&& r.act =="))
            .build("")
            .await
            .expect_err("matcher syntax");
        assert!(matches!(err, AuthzError::Casbin(_)), "{err:?}");

        let err = Enforcer::builder()
            .model(DEFAULT_MODEL.replace("g = _, _", "g = _, _, _"))
            .build(NAMESPACE_POLICY)
            .await
            .expect_err("domain roles");
        assert!(matches!(err, AuthzError::InvalidModel(_)));
    }
}
