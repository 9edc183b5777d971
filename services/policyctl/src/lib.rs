//! Operator tooling for kalm RBAC policies.
//!
//! # Purpose
//! Loads a policy file (and optionally a custom model) into the same engine the
//! dashboard session layer uses, then answers checks, explains role
//! inheritance and reports lines the lenient parser skipped.
//!
//! # Important configuration
//! - `KALM_POLICY_FILE` / `--policy`: policy text.
//! - `KALM_MODEL_FILE` / `--model`: model document; the default model otherwise.
//! - `KALM_LOG`: log filter when `RUST_LOG` is unset (default `warn`).
//! - `KALM_POLICYCTL_CONFIG`: YAML file overriding the environment.
pub mod cli;
pub mod commands;
pub mod config;
pub mod observability;
