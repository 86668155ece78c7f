//! Building episode records from announcements.

use crate::episode::{self, Episode, Label};
use crate::error::Result;
use crate::social::Update;
use crate::text;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tags an episode when its video description mentions a phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRule {
    pub phrase: String,
    pub tag: String,
}

impl TagRule {
    pub fn new(phrase: &str, tag: &str) -> Self {
        Self {
            phrase: phrase.to_string(),
            tag: tag.to_string(),
        }
    }

    pub fn matches(&self, description: &str) -> bool {
        text::similarity(description, &self.phrase) > 0.0
    }
}

/// Tag rules for the show's recurring segments.
pub fn default_tag_rules() -> Vec<TagRule> {
    vec![
        TagRule::new("cheese night", "cheese-night"),
        TagRule::new("where's lie", "truth-from-fiction"),
    ]
}

/// Combines an update with the existing record for its episode, if any.
///
/// A fresh record takes its number and air date from the arguments and its
/// detail body from `description`. An existing record keeps everything
/// except the stream links, which always come from the update. Matching
/// content tags are added to either.
pub fn synthesize(
    existing: Option<Episode>,
    number: u32,
    description: &str,
    up: &Update,
    rules: &[TagRule],
) -> Episode {
    let mut ep = existing.unwrap_or_else(|| {
        let label = Label::from(number);
        let mut fresh = Episode::new(label, up.air_date);
        fresh.season = fresh.derived_season();
        fresh.detail = description.trim().to_string();
        fresh
    });

    for rule in rules {
        if rule.matches(description) && ep.add_tag(&rule.tag) {
            log::debug!("Tagged episode {} as {}", ep.episode, rule.tag);
        }
    }
    ep.crowdcast_url = up.crowdcast.clone();
    ep.youtube_url = up.youtube.clone();
    ep
}

/// Creates or amends the episode file at `path` for update `up`.
pub fn create_episode_file(
    path: &Path,
    number: u32,
    description: &str,
    up: &Update,
    rules: &[TagRule],
) -> Result<Episode> {
    let existing = episode::load_episode(path)?;
    let ep = synthesize(existing, number, description, up, rules);
    episode::write_episode(path, &ep)?;
    Ok(ep)
}
