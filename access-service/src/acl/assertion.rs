//! Context-sensitive guards on ACL rules.
//!
//! An assertion sees the role that was queried (not the ancestor the rule
//! was found on), the member behind that role if any, and the resource
//! instance if the query carried one. Missing data means `false`.

use chrono::NaiveDate;

use super::evaluator::Acl;
use super::resource::Resource;
use crate::models::Member;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Assertion {
    /// The member created the resource.
    IsCreator,
    /// The member owns the resource.
    IsOwner,
    /// The member is currently installed in the resource's organ.
    IsOrganMember,
    IsCreatorOrOrganMember,
    /// The member is a graduate whose membership ended before the album started.
    IsAfterMembershipEnded,
    /// As [`Assertion::IsAfterMembershipEnded`], and the member is tagged in no photo of the album.
    IsAfterMembershipEndedAndNotTagged,
    /// The role is, or inherits, the page's required role.
    IsAllowedToViewPage,
}

pub struct AssertionContext<'a> {
    pub acl: &'a Acl,
    pub role: &'a str,
    pub member: Option<&'a Member>,
    pub resource: Option<&'a Resource>,
    pub privilege: &'a str,
    pub today: NaiveDate,
}

impl Assertion {
    pub fn evaluate(self, ctx: &AssertionContext<'_>) -> bool {
        let holds = match self {
            Assertion::IsCreator => is_creator(ctx),
            Assertion::IsOwner => is_owner(ctx),
            Assertion::IsOrganMember => is_organ_member(ctx),
            Assertion::IsCreatorOrOrganMember => {
                Assertion::IsCreator.evaluate(ctx) || Assertion::IsOrganMember.evaluate(ctx)
            }
            Assertion::IsAfterMembershipEnded => is_after_membership_ended(ctx),
            Assertion::IsAfterMembershipEndedAndNotTagged => {
                is_after_membership_ended_and_not_tagged(ctx)
            }
            Assertion::IsAllowedToViewPage => is_allowed_to_view_page(ctx),
        };

        tracing::trace!(
            assertion = ?self,
            role = %ctx.role,
            privilege = %ctx.privilege,
            holds,
            "Assertion evaluated"
        );
        holds
    }
}

fn is_creator(ctx: &AssertionContext<'_>) -> bool {
    match (ctx.member, ctx.resource.and_then(Resource::creator)) {
        (Some(member), Some(creator)) => member.lidnr == creator,
        _ => false,
    }
}

fn is_owner(ctx: &AssertionContext<'_>) -> bool {
    match (ctx.member, ctx.resource.and_then(Resource::owner)) {
        (Some(member), Some(owner)) => member.lidnr == owner,
        _ => false,
    }
}

fn is_organ_member(ctx: &AssertionContext<'_>) -> bool {
    match (ctx.member, ctx.resource.and_then(Resource::organ)) {
        (Some(member), Some(organ)) => member.is_installed_in(organ.id, ctx.today),
        _ => false,
    }
}

fn is_after_membership_ended(ctx: &AssertionContext<'_>) -> bool {
    let (Some(member), Some(album)) = (ctx.member, ctx.resource.and_then(Resource::album_scope))
    else {
        return false;
    };
    if !member.is_graduate() {
        return false;
    }
    member
        .membership_ends_on
        .map_or(false, |ended| ended < album.start_date)
}

fn is_after_membership_ended_and_not_tagged(ctx: &AssertionContext<'_>) -> bool {
    if !is_after_membership_ended(ctx) {
        return false;
    }
    match (ctx.member, ctx.resource.and_then(Resource::album_scope)) {
        (Some(member), Some(album)) => !album.tagged.contains(&member.lidnr),
        _ => false,
    }
}

fn is_allowed_to_view_page(ctx: &AssertionContext<'_>) -> bool {
    let Some(required) = ctx.resource.and_then(Resource::required_role) else {
        return false;
    };
    ctx.role == required || ctx.acl.inherits_role(ctx.role, required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::resource::AlbumScope;
    use crate::models::{MembershipType, Organ, OrganInstallation, OrganRef};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn member(lidnr: i64) -> Member {
        Member {
            lidnr,
            full_name: format!("Member {}", lidnr),
            email: format!("{}@example.com", lidnr),
            membership_type: MembershipType::Ordinary,
            membership_ends_on: None,
            organ_installations: vec![],
            board_installations: vec![],
            roles: vec![],
        }
    }

    fn graduate(lidnr: i64, ends_on: NaiveDate) -> Member {
        Member {
            membership_type: MembershipType::Graduate,
            membership_ends_on: Some(ends_on),
            ..member(lidnr)
        }
    }

    fn installed(mut m: Member, organ_id: u32, install: NaiveDate, discharge: Option<NaiveDate>) -> Member {
        m.organ_installations.push(OrganInstallation {
            organ: Organ {
                id: organ_id,
                abbr: format!("O{}", organ_id),
                name: format!("Organ {}", organ_id),
            },
            function: "Member".to_string(),
            install_date: install,
            discharge_date: discharge,
        });
        m
    }

    fn acl_with(members: Vec<Member>, today: NaiveDate) -> Acl {
        let mut acl = Acl::new();
        acl.set_today(today);
        acl.add_role("guest", &[]).unwrap();
        acl.add_role("user", &["guest"]).unwrap();
        for m in members {
            acl.add_member_role(Arc::new(m), &["user"]).unwrap();
        }
        acl
    }

    fn check(acl: &Acl, role: &str, resource: Option<&Resource>, assertion: Assertion) -> bool {
        let ctx = AssertionContext {
            acl,
            role,
            member: acl.member(role),
            resource,
            privilege: "view",
            today: acl.today(),
        };
        assertion.evaluate(&ctx)
    }

    fn album_scope(start: NaiveDate, tagged: &[i64]) -> AlbumScope {
        AlbumScope::new(
            Utc.from_utc_datetime(&start.and_hms_opt(20, 0, 0).unwrap()),
            tagged.iter().copied(),
        )
    }

    #[test]
    fn test_is_creator() {
        let acl = acl_with(vec![member(1), member(2)], date(2024, 1, 1));
        let resource = Resource::new("poll_comment").with_creator(1);

        assert!(check(&acl, "member:1", Some(&resource), Assertion::IsCreator));
        assert!(!check(&acl, "member:2", Some(&resource), Assertion::IsCreator));
        assert!(!check(&acl, "user", Some(&resource), Assertion::IsCreator));
        assert!(!check(&acl, "member:1", None, Assertion::IsCreator));
        assert!(!check(
            &acl,
            "member:1",
            Some(&Resource::new("poll_comment")),
            Assertion::IsCreator
        ));
    }

    #[test]
    fn test_is_owner() {
        let acl = acl_with(vec![member(1), member(2)], date(2024, 1, 1));
        let resource = Resource::new("authorization").with_owner(2);

        assert!(check(&acl, "member:2", Some(&resource), Assertion::IsOwner));
        assert!(!check(&acl, "member:1", Some(&resource), Assertion::IsOwner));
        // A creator capability does not stand in for ownership.
        let created = Resource::new("authorization").with_creator(2);
        assert!(!check(&acl, "member:2", Some(&created), Assertion::IsOwner));
    }

    #[test]
    fn test_is_organ_member_window() {
        let today = date(2024, 3, 15);
        let current = installed(member(1), 10, date(2021, 1, 1), None);
        let discharged = installed(member(2), 10, date(2021, 1, 1), Some(today - Duration::days(1)));
        let future = installed(member(3), 10, today + Duration::days(1), None);
        let discharged_today = installed(member(4), 10, date(2021, 1, 1), Some(today));
        let other_organ = installed(member(5), 11, date(2021, 1, 1), None);
        let acl = acl_with(
            vec![current, discharged, future, discharged_today, other_organ],
            today,
        );

        let resource = Resource::new("activity").with_organ(OrganRef {
            id: 10,
            abbr: "O10".to_string(),
        });

        assert!(check(&acl, "member:1", Some(&resource), Assertion::IsOrganMember));
        assert!(!check(&acl, "member:2", Some(&resource), Assertion::IsOrganMember));
        assert!(!check(&acl, "member:3", Some(&resource), Assertion::IsOrganMember));
        assert!(check(&acl, "member:4", Some(&resource), Assertion::IsOrganMember));
        assert!(!check(&acl, "member:5", Some(&resource), Assertion::IsOrganMember));
        assert!(!check(
            &acl,
            "member:1",
            Some(&Resource::new("activity")),
            Assertion::IsOrganMember
        ));
    }

    #[test]
    fn test_organ_membership_matches_identity_not_abbreviation() {
        let today = date(2024, 3, 15);
        let acl = acl_with(vec![installed(member(1), 10, date(2021, 1, 1), None)], today);
        let same_abbr_other_id = Resource::new("activity").with_organ(OrganRef {
            id: 99,
            abbr: "O10".to_string(),
        });
        assert!(!check(
            &acl,
            "member:1",
            Some(&same_abbr_other_id),
            Assertion::IsOrganMember
        ));
    }

    #[test]
    fn test_is_creator_or_organ_member() {
        let today = date(2024, 3, 15);
        let acl = acl_with(
            vec![
                member(1),
                installed(member(2), 10, date(2021, 1, 1), None),
                member(3),
            ],
            today,
        );
        let resource = Resource::new("activity")
            .with_creator(1)
            .with_organ(OrganRef {
                id: 10,
                abbr: "O10".to_string(),
            });

        assert!(check(&acl, "member:1", Some(&resource), Assertion::IsCreatorOrOrganMember));
        assert!(check(&acl, "member:2", Some(&resource), Assertion::IsCreatorOrOrganMember));
        assert!(!check(&acl, "member:3", Some(&resource), Assertion::IsCreatorOrOrganMember));
    }

    #[test]
    fn test_is_after_membership_ended() {
        let ended = date(2020, 1, 1);
        let acl = acl_with(
            vec![graduate(1, ended), Member { membership_ends_on: Some(ended), ..member(2) }],
            date(2024, 1, 1),
        );
        let during = Resource::new("album").with_album(album_scope(date(2019, 6, 1), &[]));
        let after = Resource::new("album").with_album(album_scope(date(2020, 6, 1), &[]));
        let same_day = Resource::new("album").with_album(album_scope(ended, &[]));

        assert!(!check(&acl, "member:1", Some(&during), Assertion::IsAfterMembershipEnded));
        assert!(check(&acl, "member:1", Some(&after), Assertion::IsAfterMembershipEnded));
        assert!(!check(&acl, "member:1", Some(&same_day), Assertion::IsAfterMembershipEnded));
        // Only graduates are affected.
        assert!(!check(&acl, "member:2", Some(&after), Assertion::IsAfterMembershipEnded));
        // Albums without scope data are not albums.
        assert!(!check(
            &acl,
            "member:1",
            Some(&Resource::new("album")),
            Assertion::IsAfterMembershipEnded
        ));
    }

    #[test]
    fn test_is_after_membership_ended_and_not_tagged_truth_table() {
        let acl = acl_with(vec![graduate(1, date(2020, 1, 1))], date(2024, 1, 1));
        let assertion = Assertion::IsAfterMembershipEndedAndNotTagged;

        // Album started while still a member: never hidden, tags irrelevant.
        let during_untagged = Resource::new("album").with_album(album_scope(date(2019, 6, 1), &[]));
        let during_tagged = Resource::new("album").with_album(album_scope(date(2019, 6, 1), &[1]));
        assert!(!check(&acl, "member:1", Some(&during_untagged), assertion));
        assert!(!check(&acl, "member:1", Some(&during_tagged), assertion));

        // Album started after membership ended: hidden unless tagged.
        let after_untagged = Resource::new("album").with_album(album_scope(date(2020, 6, 1), &[7]));
        let after_tagged = Resource::new("photo").with_album(album_scope(date(2020, 6, 1), &[7, 1]));
        assert!(check(&acl, "member:1", Some(&after_untagged), assertion));
        assert!(!check(&acl, "member:1", Some(&after_tagged), assertion));
    }

    #[test]
    fn test_is_allowed_to_view_page() {
        let acl = acl_with(vec![member(1)], date(2024, 1, 1));
        let public = Resource::new("page").with_required_role("guest");
        let members_only = Resource::new("page").with_required_role("user");

        assert!(check(&acl, "guest", Some(&public), Assertion::IsAllowedToViewPage));
        assert!(!check(&acl, "guest", Some(&members_only), Assertion::IsAllowedToViewPage));
        assert!(check(&acl, "user", Some(&members_only), Assertion::IsAllowedToViewPage));
        assert!(check(&acl, "member:1", Some(&members_only), Assertion::IsAllowedToViewPage));
        assert!(check(&acl, "member:1", Some(&public), Assertion::IsAllowedToViewPage));
        assert!(!check(&acl, "member:1", Some(&Resource::new("page")), Assertion::IsAllowedToViewPage));
    }
}
