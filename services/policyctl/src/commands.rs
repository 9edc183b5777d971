//! Subcommand implementations.
//!
//! Every command writes its report to the supplied writer and returns a
//! [`Status`], so tests can drive them without spawning a process.
use crate::cli::Command;
use crate::config::PolicyCtlConfig;
use anyhow::{Context, Result};
use kalm_authz::{Enforcer, EnforcerBuilder};
use kalm_session::{AuthPayload, SessionManager};
use std::fs;
use std::io::Write;
use std::process::ExitCode;

/// Outcome of a command, mapped to the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Failure => ExitCode::FAILURE,
        }
    }
}

pub async fn run(
    command: &Command,
    config: &PolicyCtlConfig,
    out: &mut impl Write,
) -> Result<Status> {
    match command {
        Command::Check {
            subject,
            action,
            scope,
            resource,
        } => {
            let enforcer = load_enforcer(config).await?;
            decision(out, enforcer.enforce(subject, action, scope, resource))
        }
        Command::Can {
            action,
            subject,
            scope,
            resource,
        } => {
            let enforcer = load_enforcer(config).await?;
            decision(out, enforcer.enforce_action(subject, *action, scope, resource))
        }
        Command::Roles { subject } => {
            let enforcer = load_enforcer(config).await?;
            for role in enforcer.roles_for(subject) {
                writeln!(out, "{role}")?;
            }
            Ok(Status::Success)
        }
        Command::Permissions { subject } => {
            let enforcer = load_enforcer(config).await?;
            for rule in enforcer.implicit_permissions(subject) {
                writeln!(out, "{}", rule.to_line())?;
            }
            Ok(Status::Success)
        }
        Command::Lint => lint(&load_enforcer(config).await?, out),
        Command::Session {
            payload,
            action,
            scope,
            resource,
        } => {
            let text = fs::read_to_string(payload)
                .with_context(|| format!("read session payload: {}", payload.display()))?;
            let payload = AuthPayload::from_json(&text).context("parse session payload")?;
            let mut manager = SessionManager::with_builder(builder(config)?);
            manager
                .login(&payload)
                .await
                .context("build enforcer from session payload")?;
            let session = manager.authorizer();
            for subject in session.subjects() {
                tracing::debug!(%subject, "checking as");
            }
            decision(out, session.can(action, scope, resource))
        }
    }
}

/// Enforcer for the configured model with the configured policy file loaded.
pub async fn load_enforcer(config: &PolicyCtlConfig) -> Result<Enforcer> {
    let path = config
        .policy_file
        .as_ref()
        .context("no policy file; pass --policy or set KALM_POLICY_FILE")?;
    let text = fs::read_to_string(path)
        .with_context(|| format!("read policy file: {}", path.display()))?;
    let enforcer = builder(config)?
        .build(&text)
        .await
        .context("build enforcer")?;
    Ok(enforcer)
}

fn builder(config: &PolicyCtlConfig) -> Result<EnforcerBuilder> {
    let mut builder = Enforcer::builder();
    if let Some(path) = &config.model_file {
        let model = fs::read_to_string(path)
            .with_context(|| format!("read model file: {}", path.display()))?;
        builder = builder.model(model);
    }
    Ok(builder)
}

fn decision(out: &mut impl Write, allowed: bool) -> Result<Status> {
    if allowed {
        writeln!(out, "allow")?;
        Ok(Status::Success)
    } else {
        writeln!(out, "deny")?;
        Ok(Status::Failure)
    }
}

fn lint(enforcer: &Enforcer, out: &mut impl Write) -> Result<Status> {
    let set = enforcer.policy_set();
    for skipped in set.skipped() {
        writeln!(
            out,
            "line {}: {}: {}",
            skipped.line_no, skipped.reason, skipped.text
        )?;
    }
    writeln!(
        out,
        "{} policies, {} groupings, {} skipped",
        set.policies().len(),
        set.groupings().len(),
        set.skipped().len()
    )?;
    if set.skipped().is_empty() {
        Ok(Status::Success)
    } else {
        Ok(Status::Failure)
    }
}
