//! Photo album model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Lidnr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub id: u64,
    /// Members tagged in this photo.
    #[serde(default)]
    pub tags: Vec<Lidnr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: u64,
    pub name: String,
    pub start_date_time: DateTime<Utc>,
    #[serde(default)]
    pub photos: Vec<Photo>,
}
