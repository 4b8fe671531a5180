use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Album, Page};

#[derive(Debug, Deserialize, Validate)]
pub struct AccessCheckQuery {
    #[validate(length(min = 1, max = 64))]
    pub resource: String,
    #[validate(length(min = 1, max = 64))]
    pub privilege: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessCheckResponse {
    pub role: String,
    pub resource: String,
    pub privilege: String,
    pub allowed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlbumResponse {
    pub id: u64,
    pub name: String,
    pub start_date_time: DateTime<Utc>,
    pub photo_count: usize,
}

impl From<&Album> for AlbumResponse {
    fn from(album: &Album) -> Self {
        Self {
            id: album.id,
            name: album.name.clone(),
            start_date_time: album.start_date_time,
            photo_count: album.photos.len(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageResponse {
    pub slug: String,
    pub title: String,
    pub body: String,
}

impl From<Page> for PageResponse {
    fn from(page: Page) -> Self {
        Self {
            slug: page.slug,
            title: page.title,
            body: page.body,
        }
    }
}
