//! Functions the model's matcher may call.
//!
//! # Purpose
//! Supplies `objMatchFunc`, the resource pattern used by the default model,
//! and keeps the table of extra functions registered on every casbin
//! enforcer this crate builds.
//!
//! # Key invariants
//! - Only grant-side values are treated as patterns.
//! - Registering a name twice keeps the later function.
use casbin::function_map::{OperatorFunction, dynamic_to_str};
use casbin::rhai::Dynamic;
use std::fmt;

/// Name the default model uses for resource matching.
pub const OBJ_MATCH_FUNCTION: &str = "objMatchFunc";

/// Single-wildcard prefix match used for grant resources.
///
/// The first `*` in `grant` marks the cut point `i`. Without a `*` the values
/// must be equal. Otherwise a longer `request` matches when its first `i`
/// bytes equal the grant's, and a shorter one only when it is exactly the
/// grant's prefix before the `*`.
pub fn key_match(request: &str, grant: &str) -> bool {
    let Some(cut) = grant.find('*') else {
        return request == grant;
    };
    let prefix = &grant.as_bytes()[..cut];
    if request.len() > cut {
        &request.as_bytes()[..cut] == prefix
    } else {
        request.as_bytes() == prefix
    }
}

/// [`key_match`] in the shape casbin's expression engine calls.
pub fn obj_match_function() -> OperatorFunction {
    OperatorFunction::Arg2(|request: Dynamic, grant: Dynamic| {
        key_match(&dynamic_to_str(&request), &dynamic_to_str(&grant)).into()
    })
}

/// Named matcher functions, in registration order.
#[derive(Clone)]
pub struct FunctionMap {
    functions: Vec<(String, OperatorFunction)>,
}

impl FunctionMap {
    /// Table without `objMatchFunc`.
    pub fn empty() -> Self {
        Self {
            functions: Vec::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, function: OperatorFunction) {
        let name = name.into();
        self.functions.retain(|(existing, _)| *existing != name);
        self.functions.push((name, function));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.iter().any(|(existing, _)| existing == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|(name, _)| name.as_str())
    }

    /// Add every function to `enforcer`, replacing casbin built-ins of the
    /// same name.
    pub(crate) fn register(&self, enforcer: &mut casbin::Enforcer) {
        use casbin::CoreApi;

        for (name, function) in &self.functions {
            enforcer.add_function(name, *function);
        }
    }
}

impl Default for FunctionMap {
    /// Table holding `objMatchFunc`.
    fn default() -> Self {
        let mut functions = Self::empty();
        functions.insert(OBJ_MATCH_FUNCTION, obj_match_function());
        functions
    }
}

impl fmt::Debug for FunctionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
