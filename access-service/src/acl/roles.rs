//! Built-in roles, the rule book, and per-request role registration.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::assertion::Assertion;
use super::context::{AccessContext, Identity};
use super::evaluator::{Acl, AclError};
use super::resource::{self, RESOURCE_TYPES};
use crate::models::Member;

pub const GUEST: &str = "guest";
pub const USER: &str = "user";
pub const GRADUATE: &str = "graduate";
pub const ACTIVE_MEMBER: &str = "active_member";
pub const BOARD: &str = "board";
pub const PHOTO_ADMIN: &str = "photo_admin";
pub const ADMIN: &str = "admin";

/// Built-in roles with their parents, parents listed first.
pub const BUILT_IN_ROLES: &[(&str, &[&str])] = &[
    (GUEST, &[]),
    (USER, &[GUEST]),
    (GRADUATE, &[USER]),
    (ACTIVE_MEMBER, &[USER]),
    (BOARD, &[ACTIVE_MEMBER]),
    (PHOTO_ADMIN, &[]),
    (ADMIN, &[]),
];

/// Privilege a member holds on `organ` through the role named after that organ.
pub const ORGAN_MEMBER_PRIVILEGE: &str = "member";

/// The request-independent ACL: built-in roles, every resource type and the
/// rule book. Built once at startup; each request works on a clone.
pub fn default_acl() -> Result<Acl, AclError> {
    let mut acl = Acl::new();

    for (role, parents) in BUILT_IN_ROLES {
        acl.add_role(role, parents)?;
    }
    for (name, parent) in RESOURCE_TYPES {
        acl.add_resource(name, *parent)?;
    }

    install_rules(&mut acl)?;
    Ok(acl)
}

fn install_rules(acl: &mut Acl) -> Result<(), AclError> {
    use resource::*;

    // guest
    acl.allow(Some(GUEST), Some(ACTIVITY), &["view", "list"])?;
    acl.allow(Some(GUEST), Some(ORGAN), &["view", "list"])?;
    acl.allow_if(Some(GUEST), Some(PAGE), &["view"], Assertion::IsAllowedToViewPage)?;
    acl.allow(Some(GUEST), Some(NEWS_ITEM), &["view"])?;
    acl.allow(Some(GUEST), Some(COMPANY), &["view", "list"])?;

    // user
    acl.allow(Some(USER), Some(ACTIVITY_SIGNUP), &["signup", "signoff"])?;
    acl.allow(Some(USER), Some(ALBUM), &["view"])?;
    acl.allow(Some(USER), Some(PHOTO), &["view", "download", "tag", "vote"])?;
    acl.allow(Some(USER), Some(DECISION), &["view", "search"])?;
    acl.allow(Some(USER), Some(MEETING), &["view"])?;
    acl.allow(Some(USER), Some(REGULATIONS), &["view"])?;
    acl.allow(Some(USER), Some(EXAM), &["view", "download"])?;
    acl.allow(Some(USER), Some(COURSE), &["view"])?;
    acl.allow(Some(USER), Some(MEMBER), &["view", "search", "birthdays"])?;
    acl.allow(Some(USER), Some(POLL), &["view", "vote", "request"])?;
    acl.allow(Some(USER), Some(POLL_COMMENT), &["view", "create"])?;
    acl.allow_if(Some(USER), Some(POLL_COMMENT), &["edit", "delete"], Assertion::IsCreator)?;
    acl.allow(Some(USER), Some(AUTHORIZATION), &["create", "view_own"])?;
    acl.allow_if(Some(USER), Some(AUTHORIZATION), &["revoke"], Assertion::IsOwner)?;

    // graduates lose sight of photos taken after their membership ended,
    // unless they appear in them
    acl.deny_if(
        Some(GRADUATE),
        Some(ALBUM),
        &["view", "download"],
        Assertion::IsAfterMembershipEndedAndNotTagged,
    )?;
    acl.deny_if(
        Some(GRADUATE),
        Some(PHOTO),
        &["view", "download"],
        Assertion::IsAfterMembershipEndedAndNotTagged,
    )?;
    acl.deny_if(
        Some(GRADUATE),
        Some(PHOTO),
        &["tag", "vote"],
        Assertion::IsAfterMembershipEnded,
    )?;

    // active_member
    acl.allow(Some(ACTIVE_MEMBER), Some(ACTIVITY), &["create"])?;
    acl.allow_if(
        Some(ACTIVE_MEMBER),
        Some(ACTIVITY),
        &["update", "view_participants", "export"],
        Assertion::IsCreatorOrOrganMember,
    )?;
    acl.allow_if(
        Some(ACTIVE_MEMBER),
        Some(ACTIVITY_SIGNUP),
        &["view"],
        Assertion::IsOrganMember,
    )?;
    acl.allow(Some(ACTIVE_MEMBER), Some(FILES), &["browse"])?;
    acl.allow_if(
        Some(ACTIVE_MEMBER),
        Some(ORGAN),
        &["view_members"],
        Assertion::IsOrganMember,
    )?;

    // board
    acl.allow(Some(BOARD), Some(DECISION), &["create", "edit"])?;
    acl.allow(Some(BOARD), Some(MEETING), &["create", "edit"])?;
    acl.allow(Some(BOARD), Some(POLL), &["approve", "delete"])?;
    acl.allow(Some(BOARD), Some(AUTHORIZATION), &["view_all"])?;

    acl.allow(Some(PHOTO_ADMIN), Some(ALBUM), &[])?;
    acl.allow(Some(PHOTO_ADMIN), Some(PHOTO), &[])?;

    // admin may do everything except act as a member of every organ
    acl.allow(Some(ADMIN), None, &[])?;
    acl.deny(Some(ADMIN), Some(ORGAN), &[ORGAN_MEMBER_PRIVILEGE])?;

    Ok(())
}

/// Register the role named after an organ (inheriting `active_member`) and
/// grant it `organ:member`. Registering a known organ role again is a no-op.
pub fn register_organ_role(acl: &mut Acl, abbr: &str) -> Result<bool, AclError> {
    if is_built_in(abbr) {
        tracing::warn!(organ = %abbr, "Organ abbreviation collides with a built-in role");
        return Ok(false);
    }
    if !acl.ensure_role(abbr, &[ACTIVE_MEMBER])? {
        return Ok(false);
    }
    acl.allow(Some(abbr), Some(resource::ORGAN), &[ORGAN_MEMBER_PRIVILEGE])?;
    Ok(true)
}

pub fn is_built_in(role: &str) -> bool {
    BUILT_IN_ROLES.iter().any(|(name, _)| *name == role)
}

/// Build the access context for one request from the startup template.
///
/// Everything registered here lives only in the returned context, so
/// organ memberships and functional roles are re-read on every request.
pub fn build_access_context(
    template: &Acl,
    identity: Identity,
    now: DateTime<Utc>,
) -> Result<AccessContext, AclError> {
    let mut acl = template.clone();
    let today = now.date_naive();
    acl.set_today(today);

    let role_id = match &identity {
        Identity::Guest => GUEST.to_string(),
        Identity::Member(member) => register_member(&mut acl, member.clone(), today)?,
    };

    Ok(AccessContext::new(acl, identity, role_id))
}

fn register_member(
    acl: &mut Acl,
    member: Arc<Member>,
    today: chrono::NaiveDate,
) -> Result<String, AclError> {
    let organs: Vec<String> = member
        .current_organs(today)
        .into_iter()
        .map(|organ| organ.abbr.clone())
        .collect();

    // searched last-listed-first: organ roles, functional roles, then the
    // membership-derived roles
    let mut parents: Vec<String> = vec![USER.to_string()];
    if member.is_graduate() {
        parents.push(GRADUATE.to_string());
    }
    if !organs.is_empty() {
        parents.push(ACTIVE_MEMBER.to_string());
    }
    if member.is_board_member(today) {
        parents.push(BOARD.to_string());
    }

    // organ roles first: a functional role may share a current organ's name
    let mut organ_roles: Vec<String> = Vec::new();
    for abbr in &organs {
        if register_organ_role(acl, abbr)? {
            tracing::debug!(organ = %abbr, "Registered organ role");
        }
        if acl.has_role(abbr) && !is_built_in(abbr) && !organ_roles.contains(abbr) {
            organ_roles.push(abbr.clone());
        }
    }
    for role in &member.roles {
        if organ_roles.contains(role) || parents.contains(role) {
            continue;
        }
        acl.ensure_role(role, &[])?;
        parents.push(role.clone());
    }
    parents.extend(organ_roles);

    let parent_refs: Vec<&str> = parents.iter().map(String::as_str).collect();
    let role_id = acl.add_member_role(member.clone(), &parent_refs)?;

    tracing::debug!(
        lidnr = member.lidnr,
        role = %role_id,
        parents = ?parents,
        "Registered member role"
    );
    Ok(role_id)
}
