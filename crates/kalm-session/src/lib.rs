//! Session integration for the kalm RBAC engine.
//!
//! # Purpose
//! Turns an authenticated-session payload into the set of policy subjects the
//! caller acts as, and answers access checks across all of them.
//!
//! # How it fits
//! The host application feeds each login response into a [`SessionManager`];
//! views then read [`SessionManager::authorizer`] and call its predicates on
//! every render. The engine itself lives in `kalm_authz`.
//!
//! # Key invariants
//! - A check is allowed when any effective subject is allowed.
//! - Before the first authorized login, and after logout, every check is denied.
//!
//! # Examples
//! ```rust
//! use kalm_session::{AuthPayload, SessionManager};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let payload = AuthPayload {
//!     authorized: true,
//!     entity: "alice@example.com".to_string(),
//!     groups: vec!["ns1Viewer".to_string()],
//!     policies: "p, role_ns1Viewer, view, ns1, *\n\
//!                g, sub-ns1Viewer, role_ns1Viewer\n"
//!         .to_string(),
//!     ..AuthPayload::default()
//! };
//!
//! let mut manager = SessionManager::new();
//! manager.login(&payload).await.expect("default model compiles");
//! let session = manager.authorizer();
//! assert!(session.can_view_namespace("ns1"));
//! assert!(!session.can_edit_namespace("ns1"));
//! # }
//! ```
mod authorizer;
mod errors;
mod manager;
mod payload;

pub use authorizer::SessionAuthorizer;
pub use errors::{SessionError, SessionResult};
pub use manager::SessionManager;
pub use payload::{AuthPayload, ImpersonationType, SUBJECT_PREFIX, Subject};
