//! Login payload and the subjects derived from it.
//!
//! # Purpose
//! Deserializes the authorization response the dashboard receives after login
//! and turns its identity fields into the policy subjects to check.
//!
//! # Key invariants
//! - Missing or `null` fields deserialize to their empty defaults.
//! - Impersonation replaces the caller's identities entirely.
//! - Effective subjects never contain an empty identifier or a duplicate.
use crate::SessionResult;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Prefix carried by every identity written into policy text.
pub const SUBJECT_PREFIX: &str = "sub-";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpersonationType {
    #[default]
    User,
    Group,
}

/// Authorization response attached to an authenticated session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthPayload {
    pub authorized: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub entity: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub groups: Vec<String>,
    /// Policy text in the `p`/`g` line format.
    #[serde(deserialize_with = "null_as_default")]
    pub policies: String,
    #[serde(deserialize_with = "null_as_default")]
    pub impersonation: String,
    #[serde(deserialize_with = "null_as_default")]
    pub impersonation_type: ImpersonationType,
}

impl AuthPayload {
    pub fn from_json(text: &str) -> SessionResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_impersonating(&self) -> bool {
        !self.impersonation.is_empty()
    }

    /// Identities whose grants apply to this session, in check order.
    pub fn subjects(&self) -> Vec<Subject> {
        if self.is_impersonating() {
            let target = self.impersonation.clone();
            return vec![match self.impersonation_type {
                ImpersonationType::User => Subject::User(target),
                ImpersonationType::Group => Subject::Group(target),
            }];
        }

        let mut subjects = Vec::with_capacity(1 + self.groups.len());
        if !self.entity.is_empty() {
            subjects.push(Subject::User(self.entity.clone()));
        }
        for group in &self.groups {
            if group.is_empty() {
                continue;
            }
            let subject = Subject::Group(group.clone());
            if !subjects.contains(&subject) {
                subjects.push(subject);
            }
        }
        subjects
    }

    /// [`Self::subjects`] rendered as policy subject strings.
    pub fn effective_subjects(&self) -> Vec<String> {
        let mut rendered: Vec<String> = Vec::new();
        for subject in self.subjects() {
            let policy_subject = subject.policy_subject();
            if !rendered.contains(&policy_subject) {
                rendered.push(policy_subject);
            }
        }
        rendered
    }
}

/// An identity held by the session.
///
/// Users and groups share one policy namespace, so both render with
/// [`SUBJECT_PREFIX`]; the tag records where the identity came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    User(String),
    Group(String),
}

impl Subject {
    pub fn id(&self) -> &str {
        match self {
            Subject::User(id) | Subject::Group(id) => id,
        }
    }

    pub fn policy_subject(&self) -> String {
        format!("{SUBJECT_PREFIX}{}", self.id())
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::User(id) => write!(f, "user:{id}"),
            Subject::Group(id) => write!(f, "group:{id}"),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
