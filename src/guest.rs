//! The guest registry.
//!
//! All guests are kept in one YAML file as a list of records. The file may
//! start with a block of `#` comments maintained by hand; that block is
//! carried over byte-for-byte whenever the registry is rewritten.

use crate::atomic::write_atomic;
use crate::error::{CatalogError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// A person who appeared on one or more episodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guest {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "twitter", default, skip_serializing_if = "String::is_empty")]
    pub handle: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default)]
    pub episodes: Vec<u32>,
}

impl Guest {
    /// Reports whether `self` and `other` denote the same person: equal
    /// non-empty names, or equal non-empty handles. Handles are compared
    /// ignoring case.
    pub fn same_person(&self, other: &Guest) -> bool {
        (!self.name.is_empty() && self.name == other.name)
            || (!self.handle.is_empty() && self.handle.eq_ignore_ascii_case(&other.handle))
    }

    /// Reports whether the guest appeared on episode `ep`.
    pub fn on_episode(&self, ep: u32) -> bool {
        self.episodes.contains(&ep)
    }
}

impl fmt::Display for Guest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.url.is_empty() {
            write!(f, " <{}>", self.url)?;
        }
        if !self.handle.is_empty() {
            write!(f, " (@{})", self.handle)?;
        }
        if !self.episodes.is_empty() {
            write!(f, " {:?}", self.episodes)?;
        }
        Ok(())
    }
}

/// Finds the record in `entries` for the same person as `needle`.
pub fn find_guest<'a>(needle: &Guest, entries: &'a mut [Guest]) -> Option<&'a mut Guest> {
    entries.iter_mut().find(|g| g.same_person(needle))
}

/// Merges the guests appearing on `episode` into `entries`.
///
/// Unknown guests are appended with just this episode; known guests gain the
/// episode number if they lack it. Existing names, links and notes are never
/// overwritten. Returns whether any record was created or modified.
pub fn merge_guests(episode: u32, entries: &mut Vec<Guest>, appearances: &[Guest]) -> bool {
    let mut changed = false;
    for g in appearances {
        match find_guest(g, entries) {
            None => {
                let mut added = g.clone();
                added.episodes = vec![episode];
                entries.push(added);
                changed = true;
            }
            Some(old) if !old.on_episode(episode) => {
                old.episodes.push(episode);
                old.episodes.sort_unstable();
                changed = true;
            }
            Some(_) => {}
        }
    }
    changed
}

// ============================================================================
// Registry file
// ============================================================================

/// The parsed guest file: its leading comment block and the records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    pub comments: String,
    pub entries: Vec<Guest>,
}

fn first_non_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[^#]").expect("valid comment regex"))
}

impl Registry {
    /// Parses registry text. `path` is used for error reports.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let split = first_non_comment().find(text).map(|m| m.start()).unwrap_or(text.len());
        let (comments, content) = text.split_at(split);

        let entries: Vec<Guest> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_yaml::from_str::<Option<Vec<Guest>>>(content)
                .map_err(|e| CatalogError::malformed(path, format!("decoding guests: {}", e)))?
                .unwrap_or_default()
        };

        Ok(Self {
            comments: comments.to_string(),
            entries,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(path, &text)
    }

    /// Renders the registry. Each record is serialized on its own, separated
    /// by a blank line, so that a change to one guest is a local diff.
    pub fn render(&self) -> Result<String> {
        let mut out = self.comments.clone();
        for (i, g) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&serde_yaml::to_string(std::slice::from_ref(g))?);
        }
        Ok(out)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let text = self.render()?;
        write_atomic(path, text.as_bytes())
    }
}

/// Records the guests appearing on `episode` in the registry at `path`.
///
/// The file is rewritten only if some record changed. Reports whether it was.
pub fn add_or_update_guests(episode: u32, path: &Path, guests: &[Guest]) -> Result<bool> {
    if guests.is_empty() {
        return Ok(false);
    }
    let mut reg = Registry::load(path)?;
    if !merge_guests(episode, &mut reg.entries, guests) {
        log::debug!("Guest list {} unchanged for episode {}", path.display(), episode);
        return Ok(false);
    }
    reg.write(path)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn guest(name: &str, handle: &str) -> Guest {
        Guest {
            name: name.to_string(),
            handle: handle.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut entries = Vec::new();
        let g = guest("Alice Example", "alice");

        assert!(merge_guests(10, &mut entries, &[g.clone()]));
        assert!(!merge_guests(10, &mut entries, &[g]));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].episodes, vec![10]);
    }

    #[test]
    fn test_merge_appends_and_sorts_episodes() {
        let mut entries = vec![Guest {
            episodes: vec![3, 40],
            ..guest("Alice Example", "alice")
        }];
        assert!(merge_guests(12, &mut entries, &[guest("Alice Example", "")]));
        assert_eq!(entries[0].episodes, vec![3, 12, 40]);
    }

    #[test]
    fn test_same_handle_different_name_merges() {
        let mut entries = vec![Guest {
            episodes: vec![1],
            ..guest("Alice Example", "alice")
        }];
        assert!(merge_guests(2, &mut entries, &[guest("Dr. Alice Example", "alice")]));
        assert_eq!(entries.len(), 1);
        // The existing name is never overwritten.
        assert_eq!(entries[0].name, "Alice Example");
        assert_eq!(entries[0].episodes, vec![1, 2]);
    }

    #[test]
    fn test_handle_match_ignores_case() {
        let mut entries = vec![Guest {
            episodes: vec![1],
            ..guest("", "AliceEx")
        }];
        assert!(merge_guests(2, &mut entries, &[guest("Alice Example", "aliceex")]));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].handle, "AliceEx");
        assert_eq!(entries[0].episodes, vec![1, 2]);
    }

    #[test]
    fn test_empty_handle_never_matches_handle_only_record() {
        let mut entries = vec![Guest {
            episodes: vec![1],
            ..guest("", "mystery")
        }];
        assert!(merge_guests(2, &mut entries, &[guest("Bob Example", "")]));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].episodes, vec![1]);
        assert_eq!(entries[1].episodes, vec![2]);
    }

    #[test]
    fn test_handle_only_records_do_not_match_each_other() {
        let mut entries = vec![guest("", "first")];
        merge_guests(5, &mut entries, &[guest("", "second")]);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_new_guests_keep_order_of_appearance() {
        let mut entries = vec![guest("Zed", "zed")];
        merge_guests(
            7,
            &mut entries,
            &[guest("Carol", "carol"), guest("Zed", ""), guest("Bob", "bob")],
        );
        let names: Vec<&str> = entries.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Zed", "Carol", "Bob"]);
    }

    #[test]
    fn test_merge_does_not_touch_existing_notes_or_url() {
        let mut entries = vec![Guest {
            url: "https://alice.example".into(),
            notes: "Law professor".into(),
            episodes: vec![1],
            ..guest("Alice", "alice")
        }];
        let newer = Guest {
            url: "https://other.example".into(),
            notes: "New bio".into(),
            ..guest("Alice", "alice")
        };
        merge_guests(2, &mut entries, &[newer]);
        assert_eq!(entries[0].url, "https://alice.example");
        assert_eq!(entries[0].notes, "Law professor");
    }

    #[test]
    fn test_registry_preserves_comment_header() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("guests.yaml");
        let header = "# Guest list for the show.\n# Edit by hand with care.\n";
        std::fs::write(
            &path,
            format!("{}- name: Alice\n  twitter: alice\n  episodes:\n  - 1\n", header),
        )
        .unwrap();

        assert!(add_or_update_guests(4, &path, &[guest("Bob", "bob")]).unwrap());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(header));
        let reg = Registry::load(&path).unwrap();
        assert_eq!(reg.comments, header);
        assert_eq!(reg.entries.len(), 2);
        assert_eq!(reg.entries[1].name, "Bob");
        assert_eq!(reg.entries[1].episodes, vec![4]);
        // Records are separated by a blank line.
        assert!(text.contains("\n\n- name: Bob\n"));
    }

    #[test]
    fn test_unchanged_registry_is_not_rewritten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("guests.yaml");
        let original = "# header\n- name: Alice\n  episodes: [1, 2]\n";
        std::fs::write(&path, original).unwrap();

        assert!(!add_or_update_guests(2, &path, &[guest("Alice", "")]).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_malformed_registry_is_fatal() {
        let err = Registry::parse(Path::new("guests.yaml"), "- name: [unclosed\n").unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { .. }));
    }

    #[test]
    fn test_guest_display() {
        let g = Guest {
            url: "https://alice.example".into(),
            episodes: vec![1, 2],
            ..guest("Alice", "alice")
        };
        assert_eq!(g.to_string(), "Alice <https://alice.example> (@alice) [1, 2]");
    }
}
