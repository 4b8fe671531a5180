use std::sync::Arc;

use thiserror::Error;

use super::evaluator::Acl;
use super::resource::Resource;
use crate::models::Member;
use crate::services::metrics;

const UNKNOWN_LABEL: &str = "unknown";

/// Who is making the request.
#[derive(Debug, Clone)]
pub enum Identity {
    Guest,
    Member(Arc<Member>),
}

impl Identity {
    pub fn member(&self) -> Option<&Member> {
        match self {
            Identity::Guest => None,
            Identity::Member(member) => Some(member),
        }
    }
}

/// A denied access check, before it is rendered for the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Not allowed to {privilege} {resource}")]
pub struct Denied {
    pub resource: String,
    pub privilege: String,
}

/// The ACL as seen by one request: the template plus the roles of the
/// current identity.
#[derive(Debug, Clone)]
pub struct AccessContext {
    acl: Acl,
    identity: Identity,
    role_id: String,
}

impl AccessContext {
    pub(crate) fn new(acl: Acl, identity: Identity, role_id: String) -> Self {
        Self {
            acl,
            identity,
            role_id,
        }
    }

    pub fn acl(&self) -> &Acl {
        &self.acl
    }

    pub fn member(&self) -> Option<&Member> {
        self.identity.member()
    }

    /// `guest` or `member:<lidnr>`.
    pub fn role_id(&self) -> &str {
        &self.role_id
    }

    pub fn is_allowed(&self, resource: &str, privilege: &str) -> bool {
        let allowed = self.acl.is_allowed(&self.role_id, resource, privilege);
        self.record(resource, privilege, allowed);
        allowed
    }

    pub fn is_allowed_on(&self, resource: &Resource, privilege: &str) -> bool {
        let allowed = self.acl.is_allowed_on(&self.role_id, resource, privilege);
        self.record(resource.kind(), privilege, allowed);
        allowed
    }

    /// Query on behalf of another role, e.g. an organ role on `organ:member`.
    pub fn is_role_allowed(&self, role: &str, resource: &str, privilege: &str) -> bool {
        let allowed = self.acl.is_allowed(role, resource, privilege);
        self.record(resource, privilege, allowed);
        allowed
    }

    pub fn require(&self, resource: &str, privilege: &str) -> Result<(), Denied> {
        if self.is_allowed(resource, privilege) {
            Ok(())
        } else {
            Err(Denied {
                resource: resource.to_string(),
                privilege: privilege.to_string(),
            })
        }
    }

    pub fn require_on(&self, resource: &Resource, privilege: &str) -> Result<(), Denied> {
        if self.is_allowed_on(resource, privilege) {
            Ok(())
        } else {
            Err(Denied {
                resource: resource.kind().to_string(),
                privilege: privilege.to_string(),
            })
        }
    }

    fn record(&self, resource: &str, privilege: &str, allowed: bool) {
        tracing::debug!(
            role = %self.role_id,
            resource = %resource,
            privilege = %privilege,
            allowed,
            "Access decision"
        );
        let (resource, privilege) = self.metric_labels(resource, privilege);
        metrics::record_access_decision(resource, privilege, allowed);
    }

    /// Names that no rule knows about collapse into one label, so callers
    /// cannot mint new series.
    fn metric_labels<'a>(&self, resource: &'a str, privilege: &'a str) -> (&'a str, &'a str) {
        if !self.acl.has_resource(resource) {
            return (UNKNOWN_LABEL, UNKNOWN_LABEL);
        }
        if self.acl.has_privilege(privilege) {
            (resource, privilege)
        } else {
            (resource, UNKNOWN_LABEL)
        }
    }
}
