//! One pass of the episode update pipeline.
//!
//! A pass looks up the latest published episode, finds announcements made
//! since it aired, drops repeats, then writes an episode file and registers
//! the guests for each remaining announcement in order.

use crate::dedup::dedup_updates;
use crate::episode::{episode_file_name, Episode, Label};
use crate::error::{CatalogError, Result};
use crate::guest::add_or_update_guests;
use crate::links;
use crate::poller::{Clock, Outcome, Pipeline};
use crate::repo;
use crate::site::SiteClient;
use crate::social::{Update, UpdateFinder};
use crate::synth::{create_episode_file, TagRule};
use crate::video::{VideoClient, VideoInfo};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;
use std::str::FromStr;

/// Source of the latest published episode.
#[async_trait]
pub trait EpisodeSource: Send + Sync {
    async fn latest_episode(&self) -> Result<Episode>;
}

/// Source of announcement updates.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn updates(&self, since: NaiveDate, now: DateTime<Utc>) -> Result<Vec<Update>>;
}

/// Source of video metadata.
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn video_info(&self, id: &str) -> Result<Option<VideoInfo>>;
}

#[async_trait]
impl EpisodeSource for SiteClient {
    async fn latest_episode(&self) -> Result<Episode> {
        SiteClient::latest_episode(self).await
    }
}

#[async_trait]
impl UpdateSource for UpdateFinder {
    async fn updates(&self, since: NaiveDate, now: DateTime<Utc>) -> Result<Vec<Update>> {
        UpdateFinder::updates(self, since, now).await
    }
}

#[async_trait]
impl VideoSource for VideoClient {
    async fn video_info(&self, id: &str) -> Result<Option<VideoInfo>> {
        VideoClient::video_info(self, id).await
    }
}

/// Replacement for the site's idea of the latest episode, written
/// `NUM[:YYYY-MM-DD]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub episode: Label,
    pub date: Option<NaiveDate>,
}

impl FromStr for Override {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        let (num, date) = match s.split_once(':') {
            Some((num, date)) => (num, Some(date)),
            None => (s, None),
        };
        if num.trim().is_empty() {
            return Err(CatalogError::Config(format!("invalid override {:?}", s)));
        }
        let date = date
            .map(|d| {
                NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                    .map_err(|e| CatalogError::Config(format!("invalid override date {:?}: {}", d, e)))
            })
            .transpose()?;
        Ok(Self {
            episode: Label::parse(num.trim()),
            date,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Log what would happen without writing anything.
    pub dry_run: bool,
    /// Rewrite episode files that already exist.
    pub force: bool,
    /// Process updates whose video ID cannot be found.
    pub skip_video_check: bool,
    /// Open touched files in an editor after the pass.
    pub edit: bool,
    pub override_latest: Option<Override>,
    pub episode_dir: PathBuf,
    pub guest_file: PathBuf,
    pub tag_rules: Vec<TagRule>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            force: false,
            skip_video_check: false,
            edit: false,
            override_latest: None,
            episode_dir: PathBuf::from("_episodes"),
            guest_file: PathBuf::from("_data/guests.yaml"),
            tag_rules: Vec::new(),
        }
    }
}

/// The update pipeline over its three collaborators.
pub struct Updater<E, U, V, C> {
    site: E,
    finder: U,
    videos: V,
    clock: C,
    opts: UpdateOptions,
}

impl<E, U, V, C> Updater<E, U, V, C>
where
    E: EpisodeSource,
    U: UpdateSource,
    V: VideoSource,
    C: Clock,
{
    pub fn new(site: E, finder: U, videos: V, clock: C, opts: UpdateOptions) -> Self {
        Self {
            site,
            finder,
            videos,
            clock,
            opts,
        }
    }

    async fn latest(&self) -> Result<Episode> {
        let mut latest = self.site.latest_episode().await?;
        log::info!("Latest episode is {}, airdate {}", latest.episode, latest.date);
        if let Some(ov) = &self.opts.override_latest {
            latest.episode = ov.episode.clone();
            log::info!(" >> override episode: {}", latest.episode);
            if let Some(date) = ov.date {
                latest.date = date;
                log::info!(" >> override date: {}", latest.date);
            }
        }
        Ok(latest)
    }

    /// Looks up the description of the update's video. `None` means the
    /// update has no usable video ID; lookup failures only cost the
    /// description.
    async fn description(&self, up: &Update) -> Option<String> {
        let id = links::youtube_video_id(&up.youtube)?;
        match self.videos.video_info(&id).await {
            Ok(Some(info)) => {
                log::info!("- Fetched video description ({} bytes)", info.description.len());
                Some(info.description)
            }
            Ok(None) => {
                log::warn!("* Video {} is not listed; no description", id);
                Some(String::new())
            }
            Err(e) => {
                log::warn!("* Unable to fetch video detail: {}", e);
                Some(String::new())
            }
        }
    }

    /// Runs one pass.
    pub async fn run_pass(&self) -> Result<Outcome> {
        let latest = self.latest().await?;
        let base = latest.episode.as_whole().ok_or_else(|| {
            CatalogError::Other(format!("latest episode {} has no whole number", latest.episode))
        })?;

        let updates = dedup_updates(self.finder.updates(latest.date, self.clock.now()).await?);
        log::info!("Found {} updates since {}", updates.len(), latest.date);

        let opts = &self.opts;
        let mut slot = 0u32;
        let mut accepted = 0usize;
        let mut touched: Vec<PathBuf> = Vec::new();
        let mut guests_dirty = false;

        for (i, up) in updates.iter().enumerate() {
            let number = base + slot + 1;
            let path = opts.episode_dir.join(episode_file_name(up.air_date, number));
            let exists = path.exists();

            log::info!(
                "Update {}: episode {}, id {}, posted {}, air {}, exists={}",
                i + 1,
                number,
                up.post_id,
                up.posted.to_rfc2822(),
                up.air_date,
                exists
            );
            if exists && !opts.force {
                // Already filed by an earlier run; it still holds its number.
                slot += 1;
                continue;
            }

            let description = match self.description(up).await {
                Some(d) => d,
                None if opts.skip_video_check => String::new(),
                None => {
                    log::warn!("* No video ID found for update {}; skipping", up.post_id);
                    continue;
                }
            };

            if opts.dry_run {
                log::info!("@ Not writing episode file {}, this is a dry run", path.display());
            } else {
                create_episode_file(&path, number, &description, up, &opts.tag_rules)?;
                log::info!("- Wrote episode {} file: {}", number, path.display());
            }

            for guest in &up.guests {
                log::info!("- Guest: {}", guest);
            }
            if opts.dry_run {
                log::info!("@ Skipped guest list update, this is a dry run");
            } else if add_or_update_guests(number, &opts.guest_file, &up.guests)? {
                guests_dirty = true;
            }

            touched.push(path);
            slot += 1;
            accepted += 1;
        }
        if guests_dirty {
            touched.push(opts.guest_file.clone());
        }

        if opts.edit && !opts.dry_run && !touched.is_empty() {
            repo::edit_files(&touched)?;
        }

        Ok(Outcome {
            updated: accepted > 0,
            latest_air: latest.date,
        })
    }
}

#[async_trait]
impl<E, U, V, C> Pipeline for Updater<E, U, V, C>
where
    E: EpisodeSource,
    U: UpdateSource,
    V: VideoSource,
    C: Clock,
{
    async fn run_once(&mut self) -> Result<Outcome> {
        self.run_pass().await
    }
}
