//! Stream link resolution and canonicalization.
//!
//! Links attached to social posts arrive wrapped in shorteners and decorated
//! with tracking parameters. This module unwraps them and rewrites links to
//! the streaming platforms the show uses into a stable canonical form.

use url::Url;

/// Base URL of the watch page for a video ID.
const YOUTUBE_WATCH_BASE: &str = "https://www.youtube.com/watch";

/// A streaming platform recognized by host name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// The primary video platform.
    YouTube,
    /// The webinar platform used as the secondary stream.
    Crowdcast,
}

impl Platform {
    pub fn from_host(host: &str) -> Option<Self> {
        match host.to_ascii_lowercase().as_str() {
            "youtube.com" | "www.youtube.com" | "m.youtube.com" | "youtu.be" => {
                Some(Self::YouTube)
            }
            "crowdcast.io" | "www.crowdcast.io" => Some(Self::Crowdcast),
            _ => None,
        }
    }

    pub fn of(u: &Url) -> Option<Self> {
        u.host_str().and_then(Self::from_host)
    }
}

/// Picks the first of the candidate representations of a link that parses
/// as an absolute URL. Candidates are tried in the order given, so callers
/// pass the most-resolved form first. Empty candidates are skipped.
pub fn pick_url<'a, I>(candidates: I) -> Option<Url>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .find_map(|s| Url::parse(s).ok())
}

/// Rewrites a link to a recognized platform into canonical form.
///
/// Video links keep only the video identifier and are rebuilt as a long-form
/// watch URL; webinar links lose their query and fragment. Links to other
/// hosts are returned unmodified.
pub fn normalize(mut u: Url) -> Url {
    match Platform::of(&u) {
        Some(Platform::YouTube) => {
            if let Some(id) = video_id_of(&u) {
                return watch_url(&id);
            }
            let kept: Vec<(String, String)> = u
                .query_pairs()
                .filter(|(k, _)| k == "v")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            if kept.is_empty() {
                u.set_query(None);
            } else {
                u.query_pairs_mut().clear().extend_pairs(kept);
            }
            u
        }
        Some(Platform::Crowdcast) => {
            u.set_query(None);
            u.set_fragment(None);
            u
        }
        None => u,
    }
}

/// Returns the canonical watch URL for a video ID.
pub fn watch_url(id: &str) -> Url {
    let mut u = Url::parse(YOUTUBE_WATCH_BASE).expect("watch base URL is valid");
    u.query_pairs_mut().append_pair("v", id);
    u
}

/// Reports whether `s` is a video URL, and if so returns its video ID.
pub fn youtube_video_id(s: &str) -> Option<String> {
    Url::parse(s).ok().as_ref().and_then(video_id_of)
}

/// Extracts the video ID from a parsed video URL. Short links carry the ID
/// as the first path segment; long links carry it in the `v` parameter.
pub fn video_id_of(u: &Url) -> Option<String> {
    if Platform::of(u) != Some(Platform::YouTube) {
        return None;
    }
    let id = if u.host_str()?.eq_ignore_ascii_case("youtu.be") {
        u.path_segments()?.next()?.trim().to_string()
    } else {
        u.query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.trim().to_string())?
    };
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_video_id() {
        let cases = [
            ("https://google.com", None),
            ("http://youtu.be/foobar?q=baz", Some("foobar")),
            ("http://youtu.be/abc123", Some("abc123")),
            ("https://www.youtube.com/watch?v=kiss_me", Some("kiss_me")),
            ("https://youtube.com/watch?v=you_fool", Some("you_fool")),
            ("https://youtube.com/watch?v=you_fool&feature=youtu.be", Some("you_fool")),
            ("https://youtube.com/watch", None),
            ("https://youtu.be/", None),
            ("not a url", None),
        ];
        for (input, want) in cases {
            assert_eq!(youtube_video_id(input).as_deref(), want, "input {:?}", input);
        }
    }

    #[test]
    fn test_pick_url_prefers_first_valid() {
        let got = pick_url([
            Some("::not-a-url::"),
            Some("https://www.youtube.com/watch?v=XYZ"),
            Some("https://t.co/short"),
        ]);
        assert_eq!(got.unwrap().as_str(), "https://www.youtube.com/watch?v=XYZ");

        let got = pick_url([None, Some(""), Some("https://t.co/short")]);
        assert_eq!(got.unwrap().as_str(), "https://t.co/short");

        assert!(pick_url([None, Some("  "), Some("garbage")]).is_none());
    }

    #[test]
    fn test_normalize_short_link() {
        let u = normalize(Url::parse("https://youtu.be/XYZ").unwrap());
        assert_eq!(u.as_str(), "https://www.youtube.com/watch?v=XYZ");
    }

    #[test]
    fn test_normalize_strips_tracking_parameters() {
        let u = normalize(Url::parse("https://youtube.com/watch?v=ID&feature=x&utm_source=tw").unwrap());
        assert_eq!(u.as_str(), "https://www.youtube.com/watch?v=ID");
        assert_eq!(video_id_of(&u).as_deref(), Some("ID"));
    }

    #[test]
    fn test_normalize_crowdcast_drops_query() {
        let u = normalize(Url::parse("https://www.crowdcast.io/e/ilof-100?utm_campaign=x#chat").unwrap());
        assert_eq!(u.as_str(), "https://www.crowdcast.io/e/ilof-100");
        assert_eq!(Platform::of(&u), Some(Platform::Crowdcast));
    }

    #[test]
    fn test_normalize_leaves_other_hosts_alone() {
        let raw = "https://example.com/page?ref=twitter&x=1";
        assert_eq!(normalize(Url::parse(raw).unwrap()).as_str(), raw);
    }

    #[test]
    fn test_normalize_video_link_without_id() {
        let u = normalize(Url::parse("https://www.youtube.com/channel/abc?feature=share").unwrap());
        assert_eq!(u.as_str(), "https://www.youtube.com/channel/abc");
        assert!(video_id_of(&u).is_none());
    }
}
