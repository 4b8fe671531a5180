//! Hierarchical access control list.
//!
//! Roles form a DAG (a role may have several parents), resources form a
//! tree. Rules are stored under a `(resource, role, privilege)` key where
//! `None` is a wildcard, and each rule may be guarded by an [`Assertion`].
//!
//! # Precedence
//!
//! A query walks the resource lineage (the resource, its ancestors, then the
//! wildcard resource) in the outer loop, the role lineage (the role, its
//! ancestors depth first, then the wildcard role) in the middle loop, and the
//! privilege (exact, then wildcard) in the inner loop. Under one key the
//! rules are tried newest first. The first rule whose assertion holds (or
//! that has none) decides; a failing assertion moves the search on. When no
//! rule applies the answer is deny.
//!
//! Parents of a role are searched last-listed-first.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use super::assertion::{Assertion, AssertionContext};
use super::resource::Resource;
use crate::models::Member;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub access: Access,
    pub assertion: Option<Assertion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    resource: Option<String>,
    role: Option<String>,
    privilege: Option<String>,
}

impl RuleKey {
    fn new(resource: Option<&str>, role: Option<&str>, privilege: Option<&str>) -> Self {
        Self {
            resource: resource.map(str::to_string),
            role: role.map(str::to_string),
            privilege: privilege.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AclError {
    #[error("Role already registered: {0}")]
    DuplicateRole(String),

    #[error("Unknown role: {0}")]
    MissingRole(String),

    #[error("Resource already registered: {0}")]
    DuplicateResource(String),

    #[error("Unknown resource: {0}")]
    MissingResource(String),

    #[error("Unknown parent: {0}")]
    MissingParent(String),
}

#[derive(Debug, Clone)]
pub struct Acl {
    /// Role -> parents, in search order.
    roles: BTreeMap<String, Vec<String>>,
    resources: BTreeMap<String, Option<String>>,
    rules: HashMap<RuleKey, Vec<Rule>>,
    /// Roles that stand for an authenticated member.
    members: HashMap<String, Arc<Member>>,
    /// Reference date for time-window assertions.
    today: NaiveDate,
}

impl Default for Acl {
    fn default() -> Self {
        Self::new()
    }
}

impl Acl {
    pub fn new() -> Self {
        Self {
            roles: BTreeMap::new(),
            resources: BTreeMap::new(),
            rules: HashMap::new(),
            members: HashMap::new(),
            today: Utc::now().date_naive(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    // Roles //////////////////////////////////////////////////////////////////

    /// Register a role. Parents must already exist.
    pub fn add_role(&mut self, name: &str, parents: &[&str]) -> Result<(), AclError> {
        if self.roles.contains_key(name) {
            return Err(AclError::DuplicateRole(name.to_string()));
        }
        for parent in parents {
            if !self.roles.contains_key(*parent) {
                return Err(AclError::MissingParent((*parent).to_string()));
            }
        }
        let search_order = parents.iter().rev().map(|p| p.to_string()).collect();
        self.roles.insert(name.to_string(), search_order);
        Ok(())
    }

    /// Register a role unless it already exists. Returns whether it was added.
    pub fn ensure_role(&mut self, name: &str, parents: &[&str]) -> Result<bool, AclError> {
        if self.roles.contains_key(name) {
            return Ok(false);
        }
        self.add_role(name, parents)?;
        Ok(true)
    }

    /// Register the role of an authenticated member so assertions can see it.
    pub fn add_member_role(
        &mut self,
        member: Arc<Member>,
        parents: &[&str],
    ) -> Result<String, AclError> {
        let role_id = member.role_id();
        self.add_role(&role_id, parents)?;
        self.members.insert(role_id.clone(), member);
        Ok(role_id)
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    pub fn member(&self, role: &str) -> Option<&Member> {
        self.members.get(role).map(Arc::as_ref)
    }

    /// The role followed by its ancestors, depth first. Empty for unknown roles.
    pub fn role_lineage(&self, name: &str) -> Vec<&str> {
        let Some((name, _)) = self.roles.get_key_value(name) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut lineage = Vec::new();
        self.visit_role(name, &mut seen, &mut lineage);
        lineage
    }

    fn visit_role<'a>(&'a self, name: &'a str, seen: &mut HashSet<&'a str>, lineage: &mut Vec<&'a str>) {
        if !seen.insert(name) {
            return;
        }
        lineage.push(name);
        if let Some(parents) = self.roles.get(name) {
            for parent in parents {
                self.visit_role(parent, seen, lineage);
            }
        }
    }

    /// Whether `role` transitively inherits `ancestor`. A role does not inherit itself.
    pub fn inherits_role(&self, role: &str, ancestor: &str) -> bool {
        self.role_lineage(role).iter().skip(1).any(|r| *r == ancestor)
    }

    // Resources //////////////////////////////////////////////////////////////

    pub fn add_resource(&mut self, name: &str, parent: Option<&str>) -> Result<(), AclError> {
        if self.resources.contains_key(name) {
            return Err(AclError::DuplicateResource(name.to_string()));
        }
        if let Some(parent) = parent {
            if !self.resources.contains_key(parent) {
                return Err(AclError::MissingParent(parent.to_string()));
            }
        }
        self.resources
            .insert(name.to_string(), parent.map(str::to_string));
        Ok(())
    }

    pub fn has_resource(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// The resource followed by its ancestors. Empty for unknown resources.
    pub fn resource_lineage(&self, name: &str) -> Vec<&str> {
        let mut lineage = Vec::new();
        let mut current = self.resources.get_key_value(name);
        while let Some((name, parent)) = current {
            lineage.push(name.as_str());
            current = parent
                .as_deref()
                .and_then(|p| self.resources.get_key_value(p));
        }
        lineage
    }

    // Rules //////////////////////////////////////////////////////////////////

    /// Allow `privileges` (all privileges when empty) for `role` on `resource`;
    /// `None` stands for every role or every resource.
    pub fn allow(
        &mut self,
        role: Option<&str>,
        resource: Option<&str>,
        privileges: &[&str],
    ) -> Result<(), AclError> {
        self.add_rule(Access::Allow, role, resource, privileges, None)
    }

    /// Like [`Acl::allow`], applying only when `assertion` holds.
    pub fn allow_if(
        &mut self,
        role: Option<&str>,
        resource: Option<&str>,
        privileges: &[&str],
        assertion: Assertion,
    ) -> Result<(), AclError> {
        self.add_rule(Access::Allow, role, resource, privileges, Some(assertion))
    }

    pub fn deny(
        &mut self,
        role: Option<&str>,
        resource: Option<&str>,
        privileges: &[&str],
    ) -> Result<(), AclError> {
        self.add_rule(Access::Deny, role, resource, privileges, None)
    }

    pub fn deny_if(
        &mut self,
        role: Option<&str>,
        resource: Option<&str>,
        privileges: &[&str],
        assertion: Assertion,
    ) -> Result<(), AclError> {
        self.add_rule(Access::Deny, role, resource, privileges, Some(assertion))
    }

    fn add_rule(
        &mut self,
        access: Access,
        role: Option<&str>,
        resource: Option<&str>,
        privileges: &[&str],
        assertion: Option<Assertion>,
    ) -> Result<(), AclError> {
        if let Some(role) = role {
            if !self.has_role(role) {
                return Err(AclError::MissingRole(role.to_string()));
            }
        }
        if let Some(resource) = resource {
            if !self.has_resource(resource) {
                return Err(AclError::MissingResource(resource.to_string()));
            }
        }

        let rule = Rule { access, assertion };
        if privileges.is_empty() {
            self.rules
                .entry(RuleKey::new(resource, role, None))
                .or_default()
                .push(rule);
        } else {
            for privilege in privileges {
                self.rules
                    .entry(RuleKey::new(resource, role, Some(privilege)))
                    .or_default()
                    .push(rule);
            }
        }
        Ok(())
    }

    /// Whether some rule names `privilege` explicitly.
    pub fn has_privilege(&self, privilege: &str) -> bool {
        self.rules
            .keys()
            .any(|key| key.privilege.as_deref() == Some(privilege))
    }

    // Queries ////////////////////////////////////////////////////////////////

    /// Whether `role` may exercise `privilege` on the resource type `resource`.
    /// Guarded rules see no resource instance and therefore do not apply.
    pub fn is_allowed(&self, role: &str, resource: &str, privilege: &str) -> bool {
        self.decide(role, resource, privilege, None)
    }

    /// Whether `role` may exercise `privilege` on a concrete resource instance.
    pub fn is_allowed_on(&self, role: &str, resource: &Resource, privilege: &str) -> bool {
        self.decide(role, resource.kind(), privilege, Some(resource))
    }

    fn decide(
        &self,
        role: &str,
        resource: &str,
        privilege: &str,
        instance: Option<&Resource>,
    ) -> bool {
        if !self.has_role(role) {
            tracing::debug!(role = %role, "Access query for unknown role");
            return false;
        }
        if !self.has_resource(resource) {
            tracing::debug!(resource = %resource, "Access query for unknown resource");
            return false;
        }

        let ctx = AssertionContext {
            acl: self,
            role,
            member: self.member(role),
            resource: instance,
            privilege,
            today: self.today,
        };

        let resources = self.resource_lineage(resource);
        let roles = self.role_lineage(role);

        let resource_keys = resources.into_iter().map(Some).chain(std::iter::once(None));
        for resource_key in resource_keys {
            let role_keys = roles.iter().copied().map(Some).chain(std::iter::once(None));
            for role_key in role_keys {
                for privilege_key in [Some(privilege), None] {
                    if let Some(access) = self.match_rules(resource_key, role_key, privilege_key, &ctx) {
                        tracing::trace!(
                            role = %role,
                            resource = %resource,
                            privilege = %privilege,
                            matched_resource = ?resource_key,
                            matched_role = ?role_key,
                            matched_privilege = ?privilege_key,
                            access = ?access,
                            "Access rule matched"
                        );
                        return access == Access::Allow;
                    }
                }
            }
        }

        false
    }

    fn match_rules(
        &self,
        resource: Option<&str>,
        role: Option<&str>,
        privilege: Option<&str>,
        ctx: &AssertionContext<'_>,
    ) -> Option<Access> {
        let rules = self.rules.get(&RuleKey::new(resource, role, privilege))?;
        rules
            .iter()
            .rev()
            .find(|rule| rule.assertion.map_or(true, |a| a.evaluate(ctx)))
            .map(|rule| rule.access)
    }
}
