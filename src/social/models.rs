use chrono::{DateTime, Utc};
use serde::Deserialize;

// --- Recent-search response types ---

/// Reply from the recent-search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<Post>,
    #[serde(default)]
    pub includes: Includes,
    pub meta: Option<SearchMeta>,
}

impl SearchResponse {
    /// Finds an expanded user record by handle, ignoring case.
    pub fn find_user(&self, username: &str) -> Option<&User> {
        self.includes
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
    }
}

/// Result metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchMeta {
    #[serde(default)]
    pub result_count: u32,
    pub newest_id: Option<String>,
    pub oldest_id: Option<String>,
}

/// A single post.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_id: Option<String>,
    #[serde(default)]
    pub entities: PostEntities,
}

/// Annotations attached to a post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostEntities {
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
    #[serde(default)]
    pub mentions: Vec<MentionEntity>,
}

/// A link annotation. The short URL is always present; the platform may
/// also report where it expands to and where its redirects finally land.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlEntity {
    pub url: Option<String>,
    pub expanded_url: Option<String>,
    pub unwound_url: Option<String>,
    pub display_url: Option<String>,
}

impl UrlEntity {
    /// Candidate representations, most-resolved first.
    pub fn candidates(&self) -> [Option<&str>; 3] {
        [
            self.unwound_url.as_deref(),
            self.expanded_url.as_deref(),
            self.url.as_deref(),
        ]
    }
}

/// A mention annotation.
#[derive(Debug, Clone, Deserialize)]
pub struct MentionEntity {
    pub username: String,
}

/// Expanded objects referenced by the posts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<User>,
}

/// A user profile.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub username: String,
    /// Profile link, usually a shortened URL.
    pub url: Option<String>,
    pub description: Option<String>,
    pub entities: Option<UserEntities>,
}

/// Link annotations in a user's profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserEntities {
    pub url: Option<EntityUrls>,
    pub description: Option<EntityUrls>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityUrls {
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
}

impl User {
    /// Returns the profile link, preferring its expanded form when the
    /// profile annotations carry one.
    pub fn profile_url(&self) -> String {
        let short = self.url.clone().unwrap_or_default();
        let Some(entities) = &self.entities else {
            return short;
        };
        entities
            .url
            .iter()
            .chain(entities.description.iter())
            .flat_map(|e| e.urls.iter())
            .find(|u| {
                u.url.as_deref() == Some(short.as_str())
                    && u.expanded_url.as_deref().is_some_and(|x| !x.is_empty())
            })
            .and_then(|u| u.expanded_url.clone())
            .unwrap_or(short)
    }
}
