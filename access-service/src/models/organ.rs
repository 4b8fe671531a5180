//! Organ model - committees, fraternities and other organizational units.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An organizational unit a member can be installed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organ {
    pub id: u32,
    pub abbr: String,
    pub name: String,
}

/// Reference to an organ as carried by protected resources. Identity is the id;
/// the abbreviation is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganRef {
    pub id: u32,
    pub abbr: String,
}

impl From<&Organ> for OrganRef {
    fn from(organ: &Organ) -> Self {
        Self {
            id: organ.id,
            abbr: organ.abbr.clone(),
        }
    }
}

/// A member's installation into an organ, bounded by install and discharge dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganInstallation {
    pub organ: Organ,
    pub function: String,
    pub install_date: NaiveDate,
    #[serde(default)]
    pub discharge_date: Option<NaiveDate>,
}

impl OrganInstallation {
    /// Installed on or before `today` and not discharged before `today`.
    pub fn is_current(&self, today: NaiveDate) -> bool {
        is_within(self.install_date, self.discharge_date, today)
    }
}

/// A member's installation into the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardInstallation {
    pub position: String,
    pub install_date: NaiveDate,
    #[serde(default)]
    pub discharge_date: Option<NaiveDate>,
}

impl BoardInstallation {
    pub fn is_current(&self, today: NaiveDate) -> bool {
        is_within(self.install_date, self.discharge_date, today)
    }
}

fn is_within(install: NaiveDate, discharge: Option<NaiveDate>, today: NaiveDate) -> bool {
    install <= today && discharge.map_or(true, |d| d >= today)
}
