//! Rule store: policy text parsed into grants and role groupings.
//!
//! # Purpose
//! Turns the newline-delimited policy blob delivered with a login payload
//! into the grant relation `p` and the grouping relation `g`.
//!
//! # Key invariants
//! - Parsing is lenient: lines with an unknown discriminator or the wrong
//!   field count are skipped and recorded, never rejected.
//! - A parsed set is immutable; reloading builds a new set.
//!
//! # Examples
//! ```rust
//! use kalm_authz::PolicySet;
//!
//! let set = PolicySet::parse("p, alice, view, ns1, *\np, broken\ng, bob, alice\n", 4);
//! assert_eq!(set.policies().len(), 1);
//! assert_eq!(set.groupings().len(), 1);
//! assert_eq!(set.skipped().len(), 1);
//! ```
use serde::{Deserialize, Serialize};

const POLICY_DISCRIMINATOR: &str = "p";
const GROUPING_DISCRIMINATOR: &str = "g";
const GROUPING_FIELDS: usize = 3;

/// A permission grant with fields in policy-definition order.
///
/// For the default model the order is `sub, act, scope, obj`; the named
/// accessors assume that shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    values: Vec<String>,
}

impl PolicyRule {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Field at `index`, or `""` when the rule is shorter.
    pub fn get(&self, index: usize) -> &str {
        self.values.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn subject(&self) -> &str {
        self.get(0)
    }

    pub fn action(&self) -> &str {
        self.get(1)
    }

    pub fn scope(&self) -> &str {
        self.get(2)
    }

    pub fn resource(&self) -> &str {
        self.get(3)
    }

    /// Render as a policy line (`p, a, b, ...`).
    pub fn to_line(&self) -> String {
        let mut line = POLICY_DISCRIMINATOR.to_string();
        for value in &self.values {
            line.push_str(", ");
            line.push_str(value);
        }
        line
    }
}

/// `member` inherits every grant held by `role`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleGrouping {
    pub member: String,
    pub role: String,
}

impl RoleGrouping {
    pub fn new(member: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            member: member.into(),
            role: role.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnknownDiscriminator(String),
    FieldCount { expected: usize, actual: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnknownDiscriminator(value) => {
                write!(f, "unknown discriminator {value:?}")
            }
            SkipReason::FieldCount { expected, actual } => {
                write!(f, "expected {expected} fields, got {actual}")
            }
        }
    }
}

/// A policy line that was ignored during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the source text.
    pub line_no: usize,
    pub text: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySet {
    policies: Vec<PolicyRule>,
    groupings: Vec<RoleGrouping>,
    skipped: Vec<SkippedLine>,
}

impl PolicySet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse policy text whose `p` lines carry `policy_arity` payload fields.
    pub fn parse(text: &str, policy_arity: usize) -> Self {
        let mut set = Self::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let skip = |reason: SkipReason| SkippedLine {
                line_no: idx + 1,
                text: line.to_string(),
                reason,
            };

            match fields[0] {
                POLICY_DISCRIMINATOR if fields.len() == policy_arity + 1 => {
                    set.policies.push(PolicyRule::new(fields[1..].iter().copied()));
                }
                POLICY_DISCRIMINATOR => set.skipped.push(skip(SkipReason::FieldCount {
                    expected: policy_arity + 1,
                    actual: fields.len(),
                })),
                GROUPING_DISCRIMINATOR if fields.len() == GROUPING_FIELDS => {
                    set.groupings.push(RoleGrouping::new(fields[1], fields[2]));
                }
                GROUPING_DISCRIMINATOR => set.skipped.push(skip(SkipReason::FieldCount {
                    expected: GROUPING_FIELDS,
                    actual: fields.len(),
                })),
                other => set
                    .skipped
                    .push(skip(SkipReason::UnknownDiscriminator(other.to_string()))),
            }
        }

        for skipped in &set.skipped {
            tracing::debug!(
                line = skipped.line_no,
                reason = %skipped.reason,
                "skipping malformed policy line"
            );
        }
        set
    }

    pub fn policies(&self) -> &[PolicyRule] {
        &self.policies
    }

    pub fn groupings(&self) -> &[RoleGrouping] {
        &self.groupings
    }

    /// Lines ignored by the last parse, in source order.
    pub fn skipped(&self) -> &[SkippedLine] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty() && self.groupings.is_empty()
    }
}
