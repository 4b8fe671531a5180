//! Protected resource types and the per-instance data assertions read.
//!
//! A [`Resource`] describes one concrete instance (an activity, a photo, a
//! page). The optional fields are its capabilities: an assertion that needs
//! a capability the instance does not carry evaluates to `false`.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{Album, Lidnr, OrganRef, Page};

pub const ACTIVITY: &str = "activity";
pub const ACTIVITY_SIGNUP: &str = "activity_signup";
pub const ORGAN: &str = "organ";
pub const PHOTO: &str = "photo";
pub const ALBUM: &str = "album";
pub const PAGE: &str = "page";
pub const DECISION: &str = "decision";
pub const MEETING: &str = "meeting";
pub const AUTHORIZATION: &str = "authorization";
pub const FILES: &str = "files";
pub const REGULATIONS: &str = "regulations";
pub const POLL: &str = "poll";
pub const POLL_COMMENT: &str = "poll_comment";
pub const NEWS_ITEM: &str = "news_item";
pub const EXAM: &str = "exam";
pub const COURSE: &str = "course";
pub const MEMBER: &str = "member";
pub const COMPANY: &str = "company";
pub const JOB: &str = "job";

/// Every resource type with its parent, parents listed before children.
pub const RESOURCE_TYPES: &[(&str, Option<&str>)] = &[
    (ACTIVITY, None),
    (ACTIVITY_SIGNUP, Some(ACTIVITY)),
    (ORGAN, None),
    (ALBUM, None),
    (PHOTO, None),
    (PAGE, None),
    (DECISION, None),
    (MEETING, None),
    (AUTHORIZATION, None),
    (FILES, None),
    (REGULATIONS, None),
    (POLL, None),
    (POLL_COMMENT, Some(POLL)),
    (NEWS_ITEM, None),
    (EXAM, None),
    (COURSE, None),
    (MEMBER, None),
    (COMPANY, None),
    (JOB, Some(COMPANY)),
];

/// The album a photo or album resource belongs to, reduced to what the
/// graduate-visibility assertions need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumScope {
    pub start_date: NaiveDate,
    pub tagged: HashSet<Lidnr>,
}

impl AlbumScope {
    pub fn new(start: DateTime<Utc>, tagged: impl IntoIterator<Item = Lidnr>) -> Self {
        Self {
            start_date: start.date_naive(),
            tagged: tagged.into_iter().collect(),
        }
    }
}

impl From<&Album> for AlbumScope {
    fn from(album: &Album) -> Self {
        AlbumScope::new(
            album.start_date_time,
            album.photos.iter().flat_map(|p| p.tags.iter().copied()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    kind: String,
    creator: Option<Lidnr>,
    owner: Option<Lidnr>,
    organ: Option<OrganRef>,
    album: Option<AlbumScope>,
    required_role: Option<String>,
}

impl Resource {
    /// A resource instance with no capabilities.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            creator: None,
            owner: None,
            organ: None,
            album: None,
            required_role: None,
        }
    }

    /// An album instance.
    pub fn album(album: &Album) -> Self {
        Self::new(ALBUM).with_album(AlbumScope::from(album))
    }

    /// A photo instance; carries the scope of its containing album.
    pub fn photo(album: &Album) -> Self {
        Self::new(PHOTO).with_album(AlbumScope::from(album))
    }

    pub fn page(page: &Page) -> Self {
        Self::new(PAGE).with_required_role(page.required_role.clone())
    }

    pub fn with_creator(mut self, creator: Lidnr) -> Self {
        self.creator = Some(creator);
        self
    }

    pub fn with_owner(mut self, owner: Lidnr) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_organ(mut self, organ: OrganRef) -> Self {
        self.organ = Some(organ);
        self
    }

    pub fn with_album(mut self, album: AlbumScope) -> Self {
        self.album = Some(album);
        self
    }

    pub fn with_required_role(mut self, role: impl Into<String>) -> Self {
        self.required_role = Some(role.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn creator(&self) -> Option<Lidnr> {
        self.creator
    }

    pub fn owner(&self) -> Option<Lidnr> {
        self.owner
    }

    pub fn organ(&self) -> Option<&OrganRef> {
        self.organ.as_ref()
    }

    pub fn album_scope(&self) -> Option<&AlbumScope> {
        self.album.as_ref()
    }

    pub fn required_role(&self) -> Option<&str> {
        self.required_role.as_deref()
    }
}
