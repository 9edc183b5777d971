//! Kalm RBAC policy engine shared by the session layer and operator tooling.
//!
//! # Purpose
//! Loads line-oriented policy text into grants and role groupings, resolves
//! role inheritance transitively, and answers whether a subject may perform an
//! action on a scoped resource.
//!
//! # How it fits
//! The session crate rebuilds an [`Enforcer`] whenever a login payload carries
//! new policy text, then asks it access questions on behalf of every identity
//! the caller holds. `policyctl` drives the same engine from files.
//!
//! # Key invariants
//! - Enforcement never fails: the only outcomes are `true` and `false`.
//! - Malformed policy lines are skipped, never rejected.
//! - Role expansion always contains the subject itself and terminates on cycles.
//! - Only grant fields may carry `*`; request fields are literal.
//!
//! # Important configuration
//! - The model (request/policy shape, role definition, effect, matcher) is a
//!   casbin model document; [`DEFAULT_MODEL`] covers the dashboard's scoped
//!   grants.
//! - Building and reloading are async because casbin's model and adapter
//!   APIs are; enforcement is synchronous.
//!
//! # Examples
//! ```rust
//! use kalm_authz::Enforcer;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let enforcer = Enforcer::new(
//!     "p, role_ns1Viewer, view, ns1, *\n\
//!      g, ns1Viewer, role_ns1Viewer\n",
//! )
//! .await;
//! assert!(enforcer.can_view_namespace("ns1Viewer", "ns1"));
//! assert!(!enforcer.can_edit_namespace("ns1Viewer", "ns1"));
//! # }
//! ```
//!
//! # Common pitfalls
//! - `manage` does not imply `edit`, and `edit` does not imply `view`; each
//!   level must be granted explicitly.
//! - Request arguments are positional in request-definition order.
mod action;
mod enforcer;
mod errors;
mod matcher;
mod model;
mod policy;
mod role;

pub use action::Action;
pub use casbin::function_map::{OperatorFunction, dynamic_to_str};
pub use enforcer::{Enforcer, EnforcerBuilder};
pub use errors::{AuthzError, AuthzResult};
pub use matcher::{FunctionMap, OBJ_MATCH_FUNCTION, key_match, obj_match_function};
pub use model::{DEFAULT_MODEL, Effect, Model};
pub use policy::{PolicyRule, PolicySet, RoleGrouping, SkipReason, SkippedLine};
pub use role::{RoleGraph, RoleSet};

/// Wildcard accepted in grant scope and resource fields.
pub const WILDCARD: &str = "*";
