//! Role-based access control for the association website.
//!
//! [`default_acl`] builds the request-independent rule book once; each
//! request then gets an [`AccessContext`] from [`build_access_context`]
//! with the caller's member, organ and functional roles added on top.

pub mod assertion;
pub mod context;
pub mod evaluator;
pub mod resource;
pub mod roles;

pub use assertion::{Assertion, AssertionContext};
pub use context::{AccessContext, Denied, Identity};
pub use evaluator::{Access, Acl, AclError, Rule};
pub use resource::{AlbumScope, Resource};
pub use roles::{build_access_context, default_acl};

#[cfg(test)]
mod tests {
    use super::resource::*;
    use super::roles::*;
    use super::*;
    use crate::models::{
        Album, BoardInstallation, Member, MembershipType, Organ, OrganInstallation, OrganRef,
        Page, Photo,
    };
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn abc() -> Organ {
        Organ {
            id: 1,
            abbr: "ABC".to_string(),
            name: "Activity Board Committee".to_string(),
        }
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

    fn abc_member(lidnr: i64) -> Member {
        let mut m = member(lidnr);
        m.organ_installations.push(OrganInstallation {
            organ: abc(),
            function: "Member".to_string(),
            install_date: date(2021, 1, 1),
            discharge_date: None,
        });
        m
    }

    fn graduate(lidnr: i64) -> Member {
        let mut m = member(lidnr);
        m.membership_type = MembershipType::Graduate;
        m.membership_ends_on = Some(date(2020, 1, 1));
        m
    }

    fn context(identity: Identity) -> AccessContext {
        let template = default_acl().unwrap();
        build_access_context(&template, identity, now()).unwrap()
    }

    fn album(start: DateTime<Utc>, tags: Vec<i64>) -> Album {
        Album {
            id: 1,
            name: "Album".to_string(),
            start_date_time: start,
            photos: vec![Photo { id: 1, tags }],
        }
    }

    #[test]
    fn test_guest_can_view_activities_but_not_create_them() {
        let ctx = context(Identity::Guest);
        assert_eq!(ctx.role_id(), GUEST);
        assert!(ctx.is_allowed(ACTIVITY, "view"));
        assert!(!ctx.is_allowed(ACTIVITY, "create"));
        assert!(ctx.require(ACTIVITY, "create").is_err());
    }

    #[test]
    fn test_organ_role_grants_organ_member_only() {
        let ctx = context(Identity::Member(Arc::new(abc_member(1234))));

        assert!(ctx.is_role_allowed("ABC", ORGAN, "member"));
        assert!(!ctx.is_role_allowed("ABC", ORGAN, "edit"));
        assert!(ctx.is_allowed(ORGAN, "member"));
        assert!(ctx.is_allowed(ACTIVITY, "create"));
    }

    #[test]
    fn test_user_rules_are_inherited_from_guest() {
        let ctx = context(Identity::Member(Arc::new(member(7))));
        assert!(ctx.is_allowed(ACTIVITY, "view"));
        assert!(ctx.is_allowed(DECISION, "view"));
        assert!(!ctx.is_allowed(DECISION, "create"));
        assert!(!ctx.is_allowed(ACTIVITY, "create"));
        assert!(!ctx.is_allowed(FILES, "browse"));
    }

    #[test]
    fn test_child_resource_inherits_parent_rules() {
        let ctx = context(Identity::Guest);
        assert!(ctx.is_allowed(ACTIVITY_SIGNUP, "view"));
        assert!(!ctx.is_allowed(ACTIVITY_SIGNUP, "signup"));
        assert!(ctx.is_allowed(JOB, "view"));
        assert!(ctx.is_allowed(JOB, "list"));
    }

    #[test]
    fn test_board_member_inherits_active_member() {
        let mut m = member(3);
        m.board_installations.push(BoardInstallation {
            position: "Treasurer".to_string(),
            install_date: date(2023, 7, 1),
            discharge_date: None,
        });
        let ctx = context(Identity::Member(Arc::new(m)));

        assert!(ctx.is_allowed(DECISION, "create"));
        assert!(ctx.is_allowed(FILES, "browse"));
        assert!(ctx.is_allowed(ACTIVITY, "create"));
    }

    #[test]
    fn test_discharged_board_member_has_no_board_rights() {
        let mut m = member(3);
        m.board_installations.push(BoardInstallation {
            position: "Treasurer".to_string(),
            install_date: date(2022, 7, 1),
            discharge_date: Some(date(2023, 7, 1)),
        });
        let ctx = context(Identity::Member(Arc::new(m)));
        assert!(!ctx.is_allowed(DECISION, "create"));
    }

    #[test]
    fn test_admin_may_do_everything_except_organ_membership() {
        let mut m = member(5);
        m.roles.push(ADMIN.to_string());
        let ctx = context(Identity::Member(Arc::new(m)));

        assert!(ctx.is_allowed(DECISION, "create"));
        assert!(ctx.is_allowed(POLL, "approve"));
        assert!(ctx.is_allowed(ORGAN, "view"));
        assert!(!ctx.is_allowed(ORGAN, "member"));
        assert!(!ctx.is_allowed("unknown", "view"));
    }

    #[test]
    fn test_activity_update_needs_creator_or_organ_member() {
        let ctx = context(Identity::Member(Arc::new(abc_member(10))));
        let organ = OrganRef::from(&abc());

        let own = Resource::new(ACTIVITY).with_creator(10);
        let organ_activity = Resource::new(ACTIVITY).with_creator(99).with_organ(organ);
        let foreign = Resource::new(ACTIVITY).with_creator(99);

        assert!(ctx.is_allowed_on(&own, "update"));
        assert!(ctx.is_allowed_on(&organ_activity, "update"));
        assert!(!ctx.is_allowed_on(&foreign, "update"));
        assert!(!ctx.is_allowed(ACTIVITY, "update"));
    }

    #[test]
    fn test_poll_comment_edit_requires_creator() {
        let ctx = context(Identity::Member(Arc::new(member(11))));
        assert!(ctx.is_allowed_on(&Resource::new(POLL_COMMENT).with_creator(11), "edit"));
        assert!(!ctx.is_allowed_on(&Resource::new(POLL_COMMENT).with_creator(12), "edit"));
        // inherited from poll
        assert!(ctx.is_allowed(POLL_COMMENT, "vote"));
    }

    #[test]
    fn test_authorization_revoke_requires_owner() {
        let ctx = context(Identity::Member(Arc::new(member(11))));
        assert!(ctx.is_allowed_on(&Resource::new(AUTHORIZATION).with_owner(11), "revoke"));
        assert!(!ctx.is_allowed_on(&Resource::new(AUTHORIZATION).with_owner(1), "revoke"));
    }

    #[test]
    fn test_graduate_photo_visibility() {
        let ctx = context(Identity::Member(Arc::new(graduate(42))));
        let before = album(Utc.with_ymd_and_hms(2019, 6, 1, 10, 0, 0).unwrap(), vec![]);
        let after = album(Utc.with_ymd_and_hms(2020, 6, 1, 10, 0, 0).unwrap(), vec![]);
        let after_tagged = album(Utc.with_ymd_and_hms(2020, 6, 1, 10, 0, 0).unwrap(), vec![42]);

        assert!(ctx.is_allowed_on(&Resource::album(&before), "view"));
        assert!(!ctx.is_allowed_on(&Resource::album(&after), "view"));
        assert!(!ctx.is_allowed_on(&Resource::photo(&after), "download"));
        assert!(ctx.is_allowed_on(&Resource::album(&after_tagged), "view"));
        assert!(ctx.is_allowed_on(&Resource::photo(&after_tagged), "download"));

        // tagging and voting stay closed regardless of tags
        assert!(!ctx.is_allowed_on(&Resource::photo(&after_tagged), "tag"));
        assert!(ctx.is_allowed_on(&Resource::photo(&before), "vote"));
    }

    #[test]
    fn test_ordinary_member_sees_every_album() {
        let ctx = context(Identity::Member(Arc::new(member(8))));
        let after = album(Utc.with_ymd_and_hms(2020, 6, 1, 10, 0, 0).unwrap(), vec![]);
        assert!(ctx.is_allowed_on(&Resource::album(&after), "view"));
        assert!(!ctx.is_allowed_on(&Resource::album(&after), "delete"));
    }

    #[test]
    fn test_photo_admin_graduate_keeps_access() {
        let mut m = graduate(43);
        m.roles.push(PHOTO_ADMIN.to_string());
        let ctx = context(Identity::Member(Arc::new(m)));
        let after = album(Utc.with_ymd_and_hms(2020, 6, 1, 10, 0, 0).unwrap(), vec![]);

        assert!(ctx.is_allowed_on(&Resource::album(&after), "view"));
        assert!(ctx.is_allowed_on(&Resource::photo(&after), "delete"));
    }

    #[test]
    fn test_page_visibility_follows_required_role() {
        let public = Page {
            slug: "about".to_string(),
            title: "About".to_string(),
            required_role: GUEST.to_string(),
            body: String::new(),
        };
        let members_only = Page {
            required_role: USER.to_string(),
            ..public.clone()
        };
        let board_only = Page {
            required_role: BOARD.to_string(),
            ..public.clone()
        };

        let guest = context(Identity::Guest);
        let user = context(Identity::Member(Arc::new(member(9))));

        assert!(guest.is_allowed_on(&Resource::page(&public), "view"));
        assert!(!guest.is_allowed_on(&Resource::page(&members_only), "view"));
        assert!(user.is_allowed_on(&Resource::page(&members_only), "view"));
        assert!(!user.is_allowed_on(&Resource::page(&board_only), "view"));
    }

    #[test]
    fn test_organ_membership_follows_installation_window() {
        let mut m = member(20);
        m.organ_installations.push(OrganInstallation {
            organ: abc(),
            function: "Member".to_string(),
            install_date: date(2024, 3, 16),
            discharge_date: None,
        });
        let ctx = context(Identity::Member(Arc::new(m)));

        assert!(!ctx.acl().has_role("ABC"));
        assert!(!ctx.is_allowed(ACTIVITY, "create"));
    }
}
