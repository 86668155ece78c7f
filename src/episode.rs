//! Episode records.
//!
//! Each episode lives in its own markdown file: a YAML front-matter block
//! delimited by `---` lines holding the structured fields, followed by a
//! free-text detail body that humans edit by hand.

use crate::atomic::write_atomic;
use crate::error::{CatalogError, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// Front-matter delimiter line.
const DELIMITER: &str = "---\n";

/// Episodes per season.
pub const SEASON_LENGTH: f64 = 250.0;

// ============================================================================
// Label
// ============================================================================

/// An episode label. Most episodes are numbered, but a few specials carry a
/// text slug instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Numeric(f64),
    Textual(String),
}

impl Label {
    /// Parses a label from text, preferring a numeric reading.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Self::Numeric(v),
            _ => Self::Textual(s.to_string()),
        }
    }

    /// The numeric value of the label, or -1 for a textual label.
    pub fn number(&self) -> f64 {
        match self {
            Self::Numeric(v) => *v,
            Self::Textual(_) => -1.0,
        }
    }

    /// The label as a whole episode number, if it is one.
    pub fn as_whole(&self) -> Option<u32> {
        match self {
            Self::Numeric(v) if *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64 => {
                Some(*v as u32)
            }
            _ => None,
        }
    }
}

impl From<u32> for Label {
    fn from(n: u32) -> Self {
        Self::Numeric(n as f64)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) if v.fract() == 0.0 => write!(f, "{}", *v as i64),
            Self::Numeric(v) => write!(f, "{}", v),
            Self::Textual(s) => f.write_str(s),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Numeric(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                s.serialize_i64(*v as i64)
            }
            Self::Numeric(v) => s.serialize_f64(*v),
            Self::Textual(t) => s.serialize_str(t),
        }
    }
}

struct LabelVisitor;

impl<'de> Visitor<'de> for LabelVisitor {
    type Value = Label;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an episode number or label string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Label, E> {
        Ok(Label::Numeric(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Label, E> {
        Ok(Label::Numeric(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Label, E> {
        Ok(Label::Numeric(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Label, E> {
        Ok(Label::Textual(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        d.deserialize_any(LabelVisitor)
    }
}

// ============================================================================
// Episode
// ============================================================================

/// A titled hyperlink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    pub url: String,
}

/// One broadcast installment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub episode: Label,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    /// Guest display names. Filled in by the site; not stored in the file.
    #[serde(skip)]
    pub guests: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub topics: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(rename = "crowdcast", default, skip_serializing_if = "String::is_empty")]
    pub crowdcast_url: String,
    #[serde(rename = "youtube", default, skip_serializing_if = "String::is_empty")]
    pub youtube_url: String,
    #[serde(rename = "acast", default, skip_serializing_if = "String::is_empty")]
    pub acast_url: String,
    #[serde(rename = "audio-file", default, skip_serializing_if = "String::is_empty")]
    pub audio_file_url: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub special: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    /// Front-matter keys this program does not know about, kept as-is.
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
    /// Free-text body after the front matter.
    #[serde(skip)]
    pub detail: String,
}

impl Episode {
    pub fn new(episode: Label, date: NaiveDate) -> Self {
        Self {
            episode,
            date,
            season: None,
            guests: Vec::new(),
            topics: String::new(),
            summary: String::new(),
            crowdcast_url: String::new(),
            youtube_url: String::new(),
            acast_url: String::new(),
            audio_file_url: String::new(),
            special: false,
            tags: Vec::new(),
            links: Vec::new(),
            extra: serde_yaml::Mapping::new(),
            detail: String::new(),
        }
    }

    /// Adds `tag` unless it is already present. Reports whether it was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// The season this episode belongs to, derived from its number.
    pub fn derived_season(&self) -> Option<u32> {
        season_for(&self.episode)
    }
}

/// Derives the season for a numbered episode.
pub fn season_for(label: &Label) -> Option<u32> {
    match label {
        Label::Numeric(v) if *v >= 0.0 => Some((v / SEASON_LENGTH).floor() as u32 + 1),
        _ => None,
    }
}

/// Name of the file for episode `number` airing on `date`.
pub fn episode_file_name(date: NaiveDate, number: u32) -> String {
    format!("{}-{:04}.md", date.format("%Y-%m-%d"), number)
}

// ============================================================================
// Files
// ============================================================================

/// Parses the contents of an episode file. `path` is used for error reports.
pub fn parse_episode(path: &Path, text: &str) -> Result<Episode> {
    let chunks: Vec<&str> = text.splitn(3, DELIMITER).collect();
    if chunks.len() != 3 || !chunks[0].is_empty() {
        return Err(CatalogError::malformed(path, "invalid episode file format"));
    }

    let mut ep: Episode = serde_yaml::from_str(chunks[1])
        .map_err(|e| CatalogError::malformed(path, format!("decoding front matter: {}", e)))?;
    ep.detail = chunks[2].trim().to_string();
    Ok(ep)
}

/// Renders an episode as front matter plus detail body.
pub fn render_episode(ep: &Episode) -> Result<String> {
    let mut out = String::from(DELIMITER);
    out.push_str(&serde_yaml::to_string(ep)?);
    out.push_str(DELIMITER);
    if !ep.detail.is_empty() {
        out.push_str(&ep.detail);
        out.push('\n');
    }
    Ok(out)
}

/// Loads the episode file at `path`. Returns `Ok(None)` if there is no file.
pub fn load_episode(path: &Path) -> Result<Option<Episode>> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_episode(path, &text).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Writes `ep` to `path`, atomically replacing any existing file.
pub fn write_episode(path: &Path, ep: &Episode) -> Result<()> {
    let text = render_episode(ep)?;
    write_atomic(path, text.as_bytes())
}

fn episode_file_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}-[-\w]+\.md$").expect("valid file name regex"))
}

/// Fills in the season of every episode file in `dir` that lacks one.
/// Returns how many files were rewritten.
pub fn assign_seasons(dir: &Path) -> Result<usize> {
    let mut names: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if episode_file_pattern().is_match(&name) {
            names.push(name);
        } else {
            log::info!("Skip {:?}", name);
        }
    }
    names.sort();

    let mut updated = 0;
    for name in names {
        let path = dir.join(&name);
        let Some(mut ep) = load_episode(&path)? else {
            continue;
        };
        if let Some(season) = ep.season {
            log::info!("Episode {} already has season {} (skipped)", ep.episode, season);
            continue;
        }
        let Some(season) = ep.derived_season() else {
            log::warn!("Episode {} has no number; no season assigned", ep.episode);
            continue;
        };
        ep.season = Some(season);
        write_episode(&path, &ep)?;
        log::info!("Assigned episode {} to season {}", ep.episode, season);
        updated += 1;
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_label_parse_and_number() {
        assert_eq!(Label::parse("42"), Label::Numeric(42.0));
        assert_eq!(Label::parse(" 12.5 "), Label::Numeric(12.5));
        assert_eq!(Label::parse("xmas-special"), Label::Textual("xmas-special".into()));
        assert_eq!(Label::parse("xmas-special").number(), -1.0);
        assert_eq!(Label::parse("inf"), Label::Textual("inf".into()));
        assert_eq!(Label::from(7).as_whole(), Some(7));
        assert_eq!(Label::Numeric(7.5).as_whole(), None);
    }

    #[test]
    fn test_label_display() {
        assert_eq!(Label::Numeric(100.0).to_string(), "100");
        assert_eq!(Label::Numeric(100.5).to_string(), "100.5");
        assert_eq!(Label::Textual("pilot".into()).to_string(), "pilot");
    }

    #[test]
    fn test_label_json_encoding_is_symmetric() {
        for label in [Label::Numeric(12.0), Label::Numeric(2.5), Label::Textual("12b".into())] {
            let json = serde_json::to_string(&label).unwrap();
            let back: Label = serde_json::from_str(&json).unwrap();
            assert_eq!(back, label);
        }
        assert_eq!(serde_json::to_string(&Label::Numeric(12.0)).unwrap(), "12");
        assert_eq!(serde_json::to_string(&Label::Textual("x".into())).unwrap(), "\"x\"");
    }

    #[test]
    fn test_season_for() {
        assert_eq!(season_for(&Label::from(1)), Some(1));
        assert_eq!(season_for(&Label::from(249)), Some(1));
        assert_eq!(season_for(&Label::from(250)), Some(2));
        assert_eq!(season_for(&Label::from(501)), Some(3));
        assert_eq!(season_for(&Label::Textual("special".into())), None);
    }

    #[test]
    fn test_episode_file_name() {
        assert_eq!(episode_file_name(date("2023-06-11"), 7), "2023-06-11-0007.md");
        assert_eq!(episode_file_name(date("2023-06-11"), 12345), "2023-06-11-12345.md");
    }

    #[test]
    fn test_parse_episode_reads_front_matter_and_detail() {
        let text = "---\nepisode: 101\ndate: 2020-12-02\nyoutube: https://www.youtube.com/watch?v=abc\ntags:\n- cheese-night\nlinks:\n- title: Paper\n  url: https://example.com/paper\n---\nSome notes.\n\nMore notes.\n";
        let ep = parse_episode(Path::new("ep.md"), text).unwrap();
        assert_eq!(ep.episode, Label::Numeric(101.0));
        assert_eq!(ep.date, date("2020-12-02"));
        assert_eq!(ep.youtube_url, "https://www.youtube.com/watch?v=abc");
        assert_eq!(ep.tags, vec!["cheese-night"]);
        assert_eq!(ep.links[0].title, "Paper");
        assert_eq!(ep.detail, "Some notes.\n\nMore notes.");
    }

    #[test]
    fn test_parse_episode_rejects_missing_front_matter() {
        let err = parse_episode(Path::new("bad.md"), "episode: 1\n").unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { .. }));

        let err = parse_episode(Path::new("bad.md"), "preamble\n---\nepisode: 1\n---\n").unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { .. }));

        let err = parse_episode(Path::new("bad.md"), "---\nepisode: [\n---\n").unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { .. }));
    }

    #[test]
    fn test_write_then_load_preserves_unknown_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("2020-12-02-0101.md");
        std::fs::write(
            &path,
            "---\nepisode: 101\ndate: 2020-12-02\nmanual-note: keep me\n---\nHand-written detail.\n",
        )
        .unwrap();

        let mut ep = load_episode(&path).unwrap().unwrap();
        ep.add_tag("cheese-night");
        write_episode(&path, &ep).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("---\nepisode: 101\ndate: 2020-12-02\n"));
        assert!(text.contains("manual-note: keep me"));
        assert!(text.ends_with("---\nHand-written detail.\n"));

        let again = load_episode(&path).unwrap().unwrap();
        assert_eq!(again.tags, vec!["cheese-night"]);
        assert_eq!(again.detail, "Hand-written detail.");
    }

    #[test]
    fn test_load_episode_missing_file_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(load_episode(&temp.path().join("nope.md")).unwrap().is_none());
    }

    #[test]
    fn test_assign_seasons() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        let write = |name: &str, ep: &Episode| write_episode(&dir.join(name), ep).unwrap();

        write("2021-06-30-0250.md", &Episode::new(Label::from(250), date("2021-06-30")));
        let mut seasoned = Episode::new(Label::from(10), date("2020-04-20"));
        seasoned.season = Some(7);
        write("2020-04-20-0010.md", &seasoned);
        write("2020-12-25-holiday.md", &Episode::new(Label::parse("holiday"), date("2020-12-25")));
        std::fs::write(dir.join("notes.md"), "not an episode").unwrap();

        assert_eq!(assign_seasons(dir).unwrap(), 1);

        let ep = load_episode(&dir.join("2021-06-30-0250.md")).unwrap().unwrap();
        assert_eq!(ep.season, Some(2));
        let ep = load_episode(&dir.join("2020-04-20-0010.md")).unwrap().unwrap();
        assert_eq!(ep.season, Some(7));
        let ep = load_episode(&dir.join("2020-12-25-holiday.md")).unwrap().unwrap();
        assert_eq!(ep.season, None);
    }

    #[test]
    fn test_add_tag_is_idempotent() {
        let mut ep = Episode::new(Label::from(1), date("2020-03-25"));
        assert!(ep.add_tag("cheese-night"));
        assert!(!ep.add_tag("cheese-night"));
        assert_eq!(ep.tags, vec!["cheese-night"]);
    }
}
