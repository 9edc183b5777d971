//! Role resolution over grouping edges.
//!
//! # Purpose
//! Computes the reflexive-transitive closure of `member -> role` edges so a
//! subject inherits every grant held by any role it reaches. The graph is
//! installed as casbin's role manager, so the matcher's `g(r.sub, p.sub)`
//! resolves through it.
//!
//! # Key invariants
//! - `expand(s)` always contains `s` and never contains duplicates.
//! - Traversal keeps a visited set, so cyclic groupings terminate. There is no
//!   hierarchy depth limit.
//! - Only subjects with outgoing edges are cached; any edge change drops the
//!   whole cache.
use crate::RoleGrouping;
use casbin::{MatchingFn, RoleManager, error::RbacError};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Expanded role set of one subject, subject first, breadth-first order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSet {
    roles: Vec<String>,
}

impl RoleSet {
    fn only(subject: &str) -> Self {
        Self {
            roles: vec![subject.to_string()],
        }
    }

    pub fn contains(&self, role: &str) -> bool {
        self.roles.iter().any(|held| held == role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.roles
    }
}

#[derive(Debug, Default)]
pub struct RoleGraph {
    edges: HashMap<String, Vec<String>>,
    closures: DashMap<String, Arc<RoleSet>>,
}

impl RoleGraph {
    pub fn new(groupings: &[RoleGrouping]) -> Self {
        let mut graph = Self::default();
        for grouping in groupings {
            graph.insert_edge(&grouping.member, &grouping.role);
        }
        graph
    }

    /// Roles granted to `member` by a single grouping edge.
    pub fn direct_roles(&self, member: &str) -> &[String] {
        self.edges.get(member).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Members holding `role` through a single grouping edge.
    pub fn direct_members(&self, role: &str) -> Vec<String> {
        let mut members: Vec<String> = self
            .edges
            .iter()
            .filter(|(_, roles)| roles.iter().any(|held| held == role))
            .map(|(member, _)| member.clone())
            .collect();
        members.sort();
        members
    }

    /// Every role `subject` holds, including itself.
    pub fn expand(&self, subject: &str) -> Arc<RoleSet> {
        if !self.edges.contains_key(subject) {
            return Arc::new(RoleSet::only(subject));
        }
        if let Some(cached) = self.closures.get(subject) {
            return Arc::clone(cached.value());
        }
        let expanded = Arc::new(self.walk(subject));
        self.closures
            .insert(subject.to_string(), Arc::clone(&expanded));
        expanded
    }

    /// Whether `member` reaches `role` through zero or more edges.
    pub fn reaches(&self, member: &str, role: &str) -> bool {
        member == role || self.expand(member).contains(role)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Number of memoized expansions.
    pub fn cached_closures(&self) -> usize {
        self.closures.len()
    }

    fn insert_edge(&mut self, member: &str, role: &str) -> bool {
        let roles = self.edges.entry(member.to_string()).or_default();
        if roles.iter().any(|held| held == role) {
            return false;
        }
        roles.push(role.to_string());
        self.closures.clear();
        true
    }

    fn walk(&self, subject: &str) -> RoleSet {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut roles = Vec::new();
        let mut queue = VecDeque::from([subject]);
        visited.insert(subject);

        while let Some(current) = queue.pop_front() {
            roles.push(current.to_string());
            for next in self.direct_roles(current) {
                if visited.insert(next.as_str()) {
                    queue.push_back(next.as_str());
                }
            }
        }
        RoleSet { roles }
    }
}

/// Domains are ignored: the supported model has a two-place role definition.
impl RoleManager for RoleGraph {
    fn clear(&mut self) {
        self.edges.clear();
        self.closures.clear();
    }

    fn add_link(&mut self, name1: &str, name2: &str, _domain: Option<&str>) {
        self.insert_edge(name1, name2);
    }

    fn matching_fn(
        &mut self,
        _role_matching_fn: Option<MatchingFn>,
        _domain_matching_fn: Option<MatchingFn>,
    ) {
        tracing::debug!("role graph matches role names literally; matching functions ignored");
    }

    fn delete_link(
        &mut self,
        name1: &str,
        name2: &str,
        _domain: Option<&str>,
    ) -> casbin::Result<()> {
        let Some(roles) = self.edges.get_mut(name1) else {
            return Err(RbacError::NotFound(name1.to_string()).into());
        };
        let before = roles.len();
        roles.retain(|held| held != name2);
        if roles.len() == before {
            return Err(RbacError::NotFound(format!("{name1} -> {name2}")).into());
        }
        if roles.is_empty() {
            self.edges.remove(name1);
        }
        self.closures.clear();
        Ok(())
    }

    fn has_link(&self, name1: &str, name2: &str, _domain: Option<&str>) -> bool {
        self.reaches(name1, name2)
    }

    fn get_roles(&self, name: &str, _domain: Option<&str>) -> Vec<String> {
        self.direct_roles(name).to_vec()
    }

    fn get_users(&self, name: &str, _domain: Option<&str>) -> Vec<String> {
        self.direct_members(name)
    }
}
