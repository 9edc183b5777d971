//! Model documents describing request shape, grant shape and matcher.
//!
//! # Purpose
//! Loads the INI-like model text through casbin and checks it against the
//! subset this engine supports, keeping the field names around for the rule
//! store and permission listings.
//!
//! # How it fits
//! The enforcer hands the compiled casbin model to a casbin enforcer; the rule
//! store uses the policy field count to validate `p` lines.
//!
//! # Key invariants
//! - Request and policy definitions are non-empty lists of unique field names.
//! - Only the two-argument role definition `g = _, _` is supported.
//! - Only the allow-override effect is supported; there are no deny grants.
//!
//! # Examples
//! ```rust
//! use kalm_authz::{DEFAULT_MODEL, Model};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let model = Model::load(DEFAULT_MODEL).await.expect("default model");
//! assert_eq!(model.policy_fields(), ["sub", "act", "scope", "obj"]);
//! # }
//! ```
use crate::{AuthzError, AuthzResult};
use casbin::{DefaultModel, Model as _};

/// Model used by [`crate::Enforcer::new`].
pub const DEFAULT_MODEL: &str = r#"
[request_definition]
r = sub, act, scope, obj

[policy_definition]
p = sub, act, scope, obj

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub) && (r.scope == p.scope || p.scope == "*") && objMatchFunc(r.obj, p.obj) && r.act == p.act
"#;

// casbin stores the effect with `p.` rewritten to `p_`.
const ALLOW_OVERRIDE: &str = "some(where(p_eft==allow))";

/// How matching grants combine into a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Allow if at least one grant matches.
    AllowOverride,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    text: String,
    request: Vec<String>,
    policy: Vec<String>,
    role_definition: bool,
    effect: Effect,
}

impl Model {
    /// Parse and check a model document.
    ///
    /// # Errors
    /// - [`AuthzError::Casbin`] when casbin cannot read the document.
    /// - [`AuthzError::MissingSection`] when a required section is absent.
    /// - [`AuthzError::InvalidModel`] for empty or duplicate fields and for
    ///   domain-scoped role definitions.
    /// - [`AuthzError::UnsupportedEffect`] for any effect but allow-override.
    pub async fn load(text: &str) -> AuthzResult<Self> {
        Ok(Self::compile(text).await?.0)
    }

    /// Parse `text` into a casbin model plus the checked view of it.
    pub(crate) async fn compile(text: &str) -> AuthzResult<(Self, DefaultModel)> {
        let compiled = DefaultModel::from_str(text).await?;
        let model = Self::describe(text, &compiled)?;
        Ok((model, compiled))
    }

    fn describe(text: &str, compiled: &DefaultModel) -> AuthzResult<Self> {
        let sections = compiled.get_model();
        let assertion = |sec: &str| sections.get(sec).and_then(|defs| defs.get(sec));

        let request = assertion("r").ok_or(AuthzError::MissingSection("request_definition"))?;
        let policy = assertion("p").ok_or(AuthzError::MissingSection("policy_definition"))?;
        let effect = assertion("e").ok_or(AuthzError::MissingSection("policy_effect"))?;
        if assertion("m").is_none() {
            return Err(AuthzError::MissingSection("matchers"));
        }
        let role_definition = match assertion("g") {
            Some(role) => {
                check_role_definition(&role.value)?;
                true
            }
            None => false,
        };

        Ok(Self {
            text: text.to_string(),
            request: field_names("r", &request.tokens)?,
            policy: field_names("p", &policy.tokens)?,
            role_definition,
            effect: parse_effect(&effect.value)?,
        })
    }

    /// Model document as given.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn request_fields(&self) -> &[String] {
        &self.request
    }

    pub fn policy_fields(&self) -> &[String] {
        &self.policy
    }

    pub fn request_index(&self, field: &str) -> Option<usize> {
        self.request.iter().position(|name| name == field)
    }

    pub fn policy_index(&self, field: &str) -> Option<usize> {
        self.policy.iter().position(|name| name == field)
    }

    /// Whether `g` groupings are part of this model.
    pub fn has_role_definition(&self) -> bool {
        self.role_definition
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }
}

impl Default for Model {
    fn default() -> Self {
        let fields = || {
            ["sub", "act", "scope", "obj"]
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        Self {
            text: DEFAULT_MODEL.to_string(),
            request: fields(),
            policy: fields(),
            role_definition: true,
            effect: Effect::AllowOverride,
        }
    }
}

/// casbin prefixes every token with its key (`r_sub`); strip it back off.
fn field_names(key: &str, tokens: &[String]) -> AuthzResult<Vec<String>> {
    let prefix = format!("{key}_");
    let mut fields: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let name = token.strip_prefix(&prefix).unwrap_or(token);
        if name.is_empty() {
            return Err(AuthzError::InvalidModel(format!("empty field in {key} definition")));
        }
        if fields.iter().any(|existing| existing == name) {
            return Err(AuthzError::InvalidModel(format!(
                "duplicate field {name} in {key} definition"
            )));
        }
        fields.push(name.to_string());
    }
    Ok(fields)
}

fn check_role_definition(value: &str) -> AuthzResult<()> {
    match value.matches('_').count() {
        2 => Ok(()),
        3 => Err(AuthzError::InvalidModel(
            "domain-scoped role definitions are not supported".to_string(),
        )),
        n => Err(AuthzError::InvalidModel(format!(
            "role definition needs 2 placeholders, got {n}"
        ))),
    }
}

fn parse_effect(value: &str) -> AuthzResult<Effect> {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '.' { '_' } else { c })
        .collect();
    if compact == ALLOW_OVERRIDE {
        Ok(Effect::AllowOverride)
    } else {
        Err(AuthzError::UnsupportedEffect(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_model_loads_to_default() {
        let loaded = Model::load(DEFAULT_MODEL).await.expect("default model");
        assert_eq!(loaded, Model::default());
        assert!(loaded.has_role_definition());
        assert_eq!(loaded.effect(), Effect::AllowOverride);
        assert!(loaded.text().contains("objMatchFunc"));
    }

    #[test]
    fn field_lookup_is_positional() {
        let model = Model::default();
        assert_eq!(model.request_index("sub"), Some(0));
        assert_eq!(model.request_index("obj"), Some(3));
        assert_eq!(model.policy_index("scope"), Some(2));
        assert_eq!(model.policy_index("dom"), None);
    }

    #[tokio::test]
    async fn comments_and_spacing_are_ignored() {
        let model = Model::load(
            "# scoped grants\n\
             [request_definition]\n\
             r =sub,obj\n\
             [policy_definition]\n\
             p= sub , obj\n\
             [policy_effect]\n\
             e = some( where ( p.eft == allow ) )\n\
             [matchers]\n\
             m = r.sub == p.sub && r.obj == p.obj\n",
        )
        .await
        .expect("model");
        assert_eq!(model.request_fields(), ["sub", "obj"]);
        assert_eq!(model.policy_fields(), ["sub", "obj"]);
        assert!(!model.has_role_definition());
    }

    #[tokio::test]
    async fn missing_sections_are_reported() {
        let err = Model::load("[request_definition]\nr = sub\n")
            .await
            .expect_err("missing policy");
        assert_eq!(err, AuthzError::MissingSection("policy_definition"));

        let err = Model::load(
            "[request_definition]\nr = sub\n[policy_definition]\np = sub\n[policy_effect]\ne = some(where (p.eft == allow))\n",
        )
        .await
        .expect_err("missing matcher");
        assert_eq!(err, AuthzError::MissingSection("matchers"));

        let err = Model::load("[matchers]\nm = true\n")
            .await
            .expect_err("matchers only");
        assert_eq!(err, AuthzError::MissingSection("request_definition"));
    }

    #[tokio::test]
    async fn domain_roles_are_rejected() {
        let text = DEFAULT_MODEL.replace("g = _, _", "g = _, _, _");
        let err = Model::load(&text).await.expect_err("domain roles");
        assert!(matches!(err, AuthzError::InvalidModel(msg) if msg.contains("domain")));
    }

    #[tokio::test]
    async fn deny_effects_are_rejected() {
        let text = DEFAULT_MODEL.replace(
            "some(where (p.eft == allow))",
            "!some(where (p.eft == deny))",
        );
        let err = Model::load(&text).await.expect_err("deny effect");
        assert!(matches!(err, AuthzError::UnsupportedEffect(_)));
    }

    #[tokio::test]
    async fn duplicate_fields_are_rejected() {
        let text = DEFAULT_MODEL.replace("r = sub, act, scope, obj", "r = sub, sub");
        let err = Model::load(&text).await.expect_err("duplicate");
        assert!(matches!(err, AuthzError::InvalidModel(msg) if msg.contains("duplicate")));
    }
}
