//! Episode announcements on the social timeline.
//!
//! The host posts an announcement before each broadcast, linking the video
//! and webinar streams and mentioning the guests. This module searches for
//! those posts and turns each one into an [`Update`] candidate.

pub mod client;
pub mod models;

pub use client::{search_start, QuerySpec, SearchClient};
pub use models::{Post, SearchResponse, User};

use crate::error::Result;
use crate::guest::Guest;
use crate::links::{self, Platform};
use crate::text;
use chrono::{DateTime, Days, NaiveDate, Utc};
use std::collections::HashSet;

/// Handles that are never guests: the hosts, the show account, streaming
/// services. Matched without regard to case.
#[derive(Debug, Clone, Default)]
pub struct KnownHandles(HashSet<String>);

impl KnownHandles {
    pub fn new<I, S>(handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(handles.into_iter().map(|h| h.as_ref().to_lowercase()).collect())
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.0.contains(&handle.to_lowercase())
    }
}

/// Details extracted from one announcement post.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// The ID of the announcement post.
    pub post_id: String,
    /// When the announcement was posted.
    pub posted: DateTime<Utc>,
    /// The inferred broadcast date.
    pub air_date: NaiveDate,
    /// The video stream link, if one was found.
    pub youtube: String,
    /// The webinar stream link, if one was found.
    pub crowdcast: String,
    /// Possible guests, not yet merged into the registry.
    pub guests: Vec<Guest>,
}

impl Update {
    /// Reports whether the update carries a stream link or a guest.
    pub fn has_content(&self) -> bool {
        !self.youtube.is_empty() || !self.crowdcast.is_empty() || !self.guests.is_empty()
    }
}

/// Converts search results into updates, oldest first.
pub fn extract_updates(rsp: &SearchResponse, known: &KnownHandles) -> Vec<Update> {
    let mut ups: Vec<Update> = rsp.data.iter().map(|p| extract_update(p, rsp, known)).collect();
    // The search reports newest first; episode numbers are assigned in order.
    ups.sort_by_key(|u| u.posted);
    ups
}

fn extract_update(post: &Post, rsp: &SearchResponse, known: &KnownHandles) -> Update {
    let mut air_date = post.created_at.date_naive();
    if text::contains_word(&post.text, "tomorrow") {
        air_date = air_date.checked_add_days(Days::new(1)).unwrap_or(air_date);
    }

    let mut up = Update {
        post_id: post.id.clone(),
        posted: post.created_at,
        air_date,
        youtube: String::new(),
        crowdcast: String::new(),
        guests: Vec::new(),
    };

    // Search links for stream URLs, matched by host.
    for entity in &post.entities.urls {
        let Some(raw) = links::pick_url(entity.candidates()) else {
            continue;
        };
        let u = links::normalize(raw);
        match Platform::of(&u) {
            Some(Platform::Crowdcast) if up.crowdcast.is_empty() => {
                up.crowdcast = u.to_string();
            }
            Some(Platform::YouTube) if up.youtube.is_empty() => {
                if links::video_id_of(&u).is_some() {
                    up.youtube = u.to_string();
                }
            }
            _ => {}
        }
    }

    // Mentions not on the known list are candidate guests.
    for m in &post.entities.mentions {
        if known.contains(&m.username) {
            continue;
        }
        let mut g = Guest {
            handle: m.username.clone(),
            ..Default::default()
        };
        if let Some(info) = rsp.find_user(&m.username) {
            g.name = info.name.clone();
            g.url = info.profile_url();
            g.notes = info.description.clone().unwrap_or_default();
        }
        up.guests.push(g);
    }

    up
}

/// Finds announcement updates by searching the social timeline.
pub struct UpdateFinder {
    client: SearchClient,
    query: QuerySpec,
    known: KnownHandles,
}

impl UpdateFinder {
    pub fn new(client: SearchClient, query: QuerySpec, known: KnownHandles) -> Self {
        Self {
            client,
            query,
            known,
        }
    }

    /// Returns updates announced after the episode that aired on `since`,
    /// oldest first. An empty result means there is nothing new.
    pub async fn updates(&self, since: NaiveDate, now: DateTime<Utc>) -> Result<Vec<Update>> {
        let Some(start) = search_start(since, now) else {
            log::info!("Search window after {} has not opened yet; no updates", since);
            return Ok(Vec::new());
        };
        let rsp = self.client.search_recent(&self.query.render(), start).await?;
        if rsp.data.is_empty() {
            log::info!("No matching updates since {}", start.format("%Y-%m-%d %H:%M"));
        }
        Ok(extract_updates(&rsp, &self.known))
    }
}
