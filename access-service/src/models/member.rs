//! Member model - the authenticated principal.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{BoardInstallation, Organ, OrganInstallation};

/// Membership number; the principal id carried in sessions.
pub type Lidnr = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipType {
    Ordinary,
    External,
    Graduate,
    Honorary,
}

/// Member entity as loaded for a single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub lidnr: Lidnr,
    pub full_name: String,
    pub email: String,
    pub membership_type: MembershipType,
    #[serde(default)]
    pub membership_ends_on: Option<NaiveDate>,
    #[serde(default)]
    pub organ_installations: Vec<OrganInstallation>,
    #[serde(default)]
    pub board_installations: Vec<BoardInstallation>,
    /// Functional roles granted explicitly, e.g. `admin`.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Member {
    /// Role identifier under which this member is registered in the ACL.
    pub fn role_id(&self) -> String {
        member_role_id(self.lidnr)
    }

    pub fn is_graduate(&self) -> bool {
        self.membership_type == MembershipType::Graduate
    }

    /// Organs the member is installed into on `today`, without duplicates.
    pub fn current_organs(&self, today: NaiveDate) -> Vec<&Organ> {
        let mut organs: Vec<&Organ> = Vec::new();
        for installation in &self.organ_installations {
            if installation.is_current(today) && !organs.iter().any(|o| o.id == installation.organ.id)
            {
                organs.push(&installation.organ);
            }
        }
        organs
    }

    /// Whether the member holds a current installation into the organ with `organ_id`.
    pub fn is_installed_in(&self, organ_id: u32, today: NaiveDate) -> bool {
        self.organ_installations
            .iter()
            .any(|i| i.organ.id == organ_id && i.is_current(today))
    }

    pub fn is_board_member(&self, today: NaiveDate) -> bool {
        self.board_installations.iter().any(|b| b.is_current(today))
    }
}

pub fn member_role_id(lidnr: Lidnr) -> String {
    format!("member:{}", lidnr)
}
