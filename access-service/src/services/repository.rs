use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use super::error::ServiceError;
use crate::models::{Album, Lidnr, Member, Page};
use crate::utils::PasswordHashString;

/// Stored login data of a member.
#[derive(Debug, Clone)]
pub struct MemberCredentials {
    pub lidnr: Lidnr,
    pub password_hash: PasswordHashString,
}

#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn find_member(&self, lidnr: Lidnr) -> Result<Option<Member>, ServiceError>;

    /// Look up credentials by membership number or e-mail address.
    async fn find_credentials(&self, login: &str)
        -> Result<Option<MemberCredentials>, ServiceError>;

    async fn find_album(&self, id: u64) -> Result<Option<Album>, ServiceError>;

    async fn find_page(&self, slug: &str) -> Result<Option<Page>, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct SeedMember {
    #[serde(flatten)]
    member: Member,
    #[serde(default)]
    password_hash: Option<PasswordHashString>,
}

#[derive(Debug, Default, Deserialize)]
struct Seed {
    #[serde(default)]
    members: Vec<SeedMember>,
    #[serde(default)]
    albums: Vec<Album>,
    #[serde(default)]
    pages: Vec<Page>,
}

/// Repository held in memory, filled from a JSON seed file or by hand.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    members: HashMap<Lidnr, Member>,
    credentials: HashMap<Lidnr, PasswordHashString>,
    albums: HashMap<u64, Album>,
    pages: HashMap<String, Page>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, anyhow::Error> {
        let seed: Seed = serde_json::from_str(json)
            .map_err(|e| anyhow::anyhow!("Failed to parse member seed: {}", e))?;

        let mut repository = Self::new();
        for entry in seed.members {
            repository = repository.with_member(entry.member, entry.password_hash);
        }
        for album in seed.albums {
            repository = repository.with_album(album);
        }
        for page in seed.pages {
            repository = repository.with_page(page);
        }
        Ok(repository)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read member seed from {}: {}", path.display(), e)
        })?;
        let repository = Self::from_json(&json)?;

        tracing::info!(
            path = %path.display(),
            members = repository.members.len(),
            albums = repository.albums.len(),
            pages = repository.pages.len(),
            "Loaded member seed"
        );
        Ok(repository)
    }

    pub fn with_member(mut self, member: Member, password_hash: Option<PasswordHashString>) -> Self {
        if let Some(hash) = password_hash {
            self.credentials.insert(member.lidnr, hash);
        }
        self.members.insert(member.lidnr, member);
        self
    }

    pub fn with_album(mut self, album: Album) -> Self {
        self.albums.insert(album.id, album);
        self
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.pages.insert(page.slug.clone(), page);
        self
    }

    fn lidnr_for_login(&self, login: &str) -> Option<Lidnr> {
        let login = login.trim();
        if let Ok(lidnr) = login.parse::<Lidnr>() {
            return self.members.contains_key(&lidnr).then_some(lidnr);
        }
        self.members
            .values()
            .find(|member| member.email.eq_ignore_ascii_case(login))
            .map(|member| member.lidnr)
    }
}

#[async_trait]
impl MemberRepository for MemoryRepository {
    async fn find_member(&self, lidnr: Lidnr) -> Result<Option<Member>, ServiceError> {
        Ok(self.members.get(&lidnr).cloned())
    }

    async fn find_credentials(
        &self,
        login: &str,
    ) -> Result<Option<MemberCredentials>, ServiceError> {
        let credentials = self.lidnr_for_login(login).and_then(|lidnr| {
            self.credentials
                .get(&lidnr)
                .map(|hash| MemberCredentials {
                    lidnr,
                    password_hash: hash.clone(),
                })
        });
        Ok(credentials)
    }

    async fn find_album(&self, id: u64) -> Result<Option<Album>, ServiceError> {
        Ok(self.albums.get(&id).cloned())
    }

    async fn find_page(&self, slug: &str) -> Result<Option<Page>, ServiceError> {
        Ok(self.pages.get(slug).cloned())
    }
}
