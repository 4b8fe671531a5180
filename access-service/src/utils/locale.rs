use async_trait::async_trait;
use service_core::axum::{
    extract::FromRequestParts,
    http::{header::ACCEPT_LANGUAGE, request::Parts},
};
use service_core::error::AppError;

use crate::acl::Denied;

/// Language of user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Nl,
}

impl Locale {
    /// First supported language in an `Accept-Language` header, by quality.
    pub fn from_accept_language(header: &str) -> Self {
        let mut best: Option<(f32, Locale)> = None;
        for part in header.split(',') {
            let mut pieces = part.trim().split(';');
            let tag = pieces.next().unwrap_or("").trim().to_ascii_lowercase();
            let quality = pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);

            let locale = match tag.split('-').next() {
                Some("nl") => Locale::Nl,
                Some("en") => Locale::En,
                _ => continue,
            };
            if best.map_or(true, |(q, _)| quality > q) {
                best = Some((quality, locale));
            }
        }
        best.map(|(_, locale)| locale).unwrap_or_default()
    }

    pub fn not_allowed_message(self, denied: &Denied) -> String {
        match self {
            Locale::En => format!(
                "You are not allowed to {} this {}",
                denied.privilege,
                denied.resource.replace('_', " ")
            ),
            Locale::Nl => format!(
                "Je hebt geen toestemming om deze {} te {}",
                denied.resource.replace('_', " "),
                dutch_verb(&denied.privilege)
            ),
        }
    }

    /// The 403 error for a denied check.
    pub fn not_allowed(self, denied: Denied) -> AppError {
        AppError::NotAllowed(self.not_allowed_message(&denied))
    }
}

fn dutch_verb(privilege: &str) -> &str {
    match privilege {
        "view" => "bekijken",
        "list" => "bekijken",
        "create" => "maken",
        "edit" | "update" => "bewerken",
        "delete" => "verwijderen",
        "download" => "downloaden",
        "tag" => "taggen",
        "vote" => "stemmen",
        other => other,
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Locale::from_accept_language)
            .unwrap_or_default())
    }
}
