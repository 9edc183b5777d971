use clap::{Parser, Subcommand};
use kalm_authz::{Action, WILDCARD};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "policyctl")]
#[command(about = "Check, explain and lint kalm RBAC policies")]
pub struct Cli {
    /// Policy text file (overrides KALM_POLICY_FILE)
    #[arg(long, global = true)]
    pub policy: Option<PathBuf>,

    /// Model document (overrides KALM_MODEL_FILE)
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Evaluate one request; exits 1 when denied
    Check {
        subject: String,
        action: String,
        scope: String,
        resource: String,
    },

    /// Evaluate a view/edit/manage predicate; exits 1 when denied
    Can {
        action: Action,
        subject: String,
        /// Namespace, or "*" for the whole cluster
        #[arg(long, default_value = WILDCARD)]
        scope: String,
        #[arg(long, default_value = WILDCARD)]
        resource: String,
    },

    /// Print every role a subject holds, one per line
    Roles { subject: String },

    /// Print every grant a subject holds directly or through roles
    Permissions { subject: String },

    /// Report malformed policy lines; exits 1 if any were skipped
    Lint,

    /// Evaluate a request for every identity in a login payload
    Session {
        payload: PathBuf,
        action: String,
        scope: String,
        resource: String,
    },
}
