pub mod album;
pub mod member;
pub mod organ;
pub mod page;

pub use album::{Album, Photo};
pub use member::{member_role_id, Lidnr, Member, MembershipType};
pub use organ::{BoardInstallation, Organ, OrganInstallation, OrganRef};
pub use page::Page;
