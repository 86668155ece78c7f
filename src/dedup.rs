//! Filtering of repeated or empty announcements.
//!
//! The same broadcast is sometimes announced more than once, for example
//! when a post is corrected and reposted. Such repeats carry the same links
//! and the same guests as the original.

use crate::guest::Guest;
use crate::social::Update;

/// Drops updates with no links and no guests, and updates whose links and
/// guests match an earlier kept update. Order is preserved.
pub fn dedup_updates(updates: Vec<Update>) -> Vec<Update> {
    let mut kept: Vec<Update> = Vec::with_capacity(updates.len());
    for up in updates {
        if !up.has_content() {
            log::info!("Skipping update {}: no stream links or guests", up.post_id);
            continue;
        }
        if let Some(prev) = kept.iter().find(|k| same_announcement(k, &up)) {
            log::info!("Skipping update {}: repeats update {}", up.post_id, prev.post_id);
            continue;
        }
        kept.push(up);
    }
    kept
}

fn same_announcement(a: &Update, b: &Update) -> bool {
    a.youtube == b.youtube && a.crowdcast == b.crowdcast && same_guests(&a.guests, &b.guests)
}

/// Unordered comparison of guest lists under the guest identity rule.
fn same_guests(a: &[Guest], b: &[Guest]) -> bool {
    a.len() == b.len()
        && a.iter().all(|g| b.iter().any(|h| g.same_person(h)))
        && b.iter().all(|g| a.iter().any(|h| g.same_person(h)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn update(id: &str, youtube: &str, guests: &[(&str, &str)]) -> Update {
        Update {
            post_id: id.to_string(),
            posted: Utc.with_ymd_and_hms(2023, 6, 12, 15, 0, 0).unwrap(),
            air_date: NaiveDate::from_ymd_opt(2023, 6, 12).unwrap(),
            youtube: youtube.to_string(),
            crowdcast: String::new(),
            guests: guests
                .iter()
                .map(|(name, handle)| Guest {
                    name: name.to_string(),
                    handle: handle.to_string(),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn ids(ups: &[Update]) -> Vec<&str> {
        ups.iter().map(|u| u.post_id.as_str()).collect()
    }

    #[test]
    fn test_identical_updates_keep_first() {
        let link = "https://www.youtube.com/watch?v=A";
        let ups = dedup_updates(vec![
            update("1", link, &[("Alice", "alice"), ("Bob", "bob")]),
            update("2", link, &[("Bob", "bob"), ("Alice", "alice")]),
        ]);
        assert_eq!(ids(&ups), vec!["1"]);
    }

    #[test]
    fn test_empty_update_is_dropped() {
        let ups = dedup_updates(vec![update("1", "", &[])]);
        assert!(ups.is_empty());
    }

    #[test]
    fn test_guest_identity_applies_to_repeats() {
        let link = "https://www.youtube.com/watch?v=A";
        let ups = dedup_updates(vec![
            update("1", link, &[("", "alice")]),
            update("2", link, &[("Alice Example", "alice")]),
        ]);
        assert_eq!(ids(&ups), vec!["1"]);
    }

    #[test]
    fn test_distinct_updates_survive_in_order() {
        let ups = dedup_updates(vec![
            update("1", "https://www.youtube.com/watch?v=A", &[("Alice", "alice")]),
            update("2", "https://www.youtube.com/watch?v=B", &[("Alice", "alice")]),
            update("3", "https://www.youtube.com/watch?v=B", &[("Alice", "alice"), ("Bob", "bob")]),
            update("4", "", &[("Carol", "carol")]),
        ]);
        assert_eq!(ids(&ups), vec!["1", "2", "3", "4"]);
    }
}
