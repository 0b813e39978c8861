use std::collections::BTreeSet;
use std::io::Write;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::models::{ArchiveEntry, ComicRecord, ComicRef};

/// Ids a numeric source never serves, skipped by prev/next navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationRule {
    skip_ids: BTreeSet<u64>,
}

impl NavigationRule {
    pub fn new<I: IntoIterator<Item = u64>>(skip_ids: I) -> Self {
        Self {
            skip_ids: skip_ids.into_iter().collect(),
        }
    }

    pub fn skips(&self, id: u64) -> bool {
        self.skip_ids.contains(&id)
    }

    pub fn next_id(&self, id: &str) -> String {
        match id.parse::<u64>() {
            Ok(mut n) => {
                n = n.saturating_add(1);
                while n < u64::MAX && self.skips(n) {
                    n += 1;
                }
                n.to_string()
            }
            Err(_) => id.to_string(),
        }
    }

    /// Saturates at 0; a source's lowest id minus one is simply "not found".
    pub fn prev_id(&self, id: &str) -> String {
        match id.parse::<u64>() {
            Ok(mut n) => {
                n = n.saturating_sub(1);
                while n > 0 && self.skips(n) {
                    n -= 1;
                }
                n.to_string()
            }
            Err(_) => id.to_string(),
        }
    }
}

/// Where an incoming link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLink {
    Comic(String),
    Archive,
    Home,
    Unsupported,
}

/// Everything the viewer needs from one comic site.
///
/// `fetch_*` methods block and must run off the interactive thread; the URL
/// predicates are pure.
pub trait ComicProvider: Send + Sync {
    /// Stable key, one archive cache per source.
    fn source_id(&self) -> &str;
    fn display_name(&self) -> &str;

    fn first_id(&self) -> String;
    fn navigation(&self) -> &NavigationRule;

    fn fetch_comic(&self, reference: &ComicRef, cancel: &CancelToken) -> Result<ComicRecord>;
    fn fetch_random_reference(&self, cancel: &CancelToken) -> Result<ComicRef>;
    fn fetch_archive(&self, cancel: &CancelToken) -> Result<Vec<ArchiveEntry>>;
    /// Stream an image or attachment into `dest`; returns bytes written.
    fn download(&self, url: &str, dest: &mut dyn Write, cancel: &CancelToken) -> Result<u64>;

    fn id_from_url(&self, url: &str) -> Option<String>;
    fn is_comic_url(&self, url: &str) -> bool;
    fn is_archive_url(&self, url: &str) -> bool;
    fn is_home_url(&self, url: &str) -> bool;

    fn archive_url(&self) -> String;
    fn comic_page_url(&self, id: &str) -> String;
    /// `None` when the source has no explanation pages.
    fn explain_url(&self, _id: &str) -> Option<String> {
        None
    }
    /// Whether an explanation page actually exists for `id`.
    fn has_explanation(&self, _id: &str, _cancel: &CancelToken) -> Result<bool> {
        Ok(false)
    }

    fn classify(&self, url: &str) -> DeepLink {
        if self.is_comic_url(url) {
            if let Some(id) = self.id_from_url(url) {
                return DeepLink::Comic(id);
            }
        }
        if self.is_archive_url(url) {
            DeepLink::Archive
        } else if self.is_home_url(url) {
            DeepLink::Home
        } else {
            DeepLink::Unsupported
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_reserved_id_in_both_directions() {
        let rule = NavigationRule::new([404]);
        assert_eq!(rule.next_id("403"), "405");
        assert_eq!(rule.prev_id("405"), "403");
        assert_eq!(rule.next_id("404"), "405");
        assert_eq!(rule.prev_id("404"), "403");
        assert_eq!(rule.next_id("1"), "2");
    }

    #[test]
    fn adjacent_reserved_ids_are_all_skipped() {
        let rule = NavigationRule::new([10, 11]);
        assert_eq!(rule.next_id("9"), "12");
        assert_eq!(rule.prev_id("12"), "9");
    }

    #[test]
    fn no_rule_means_plain_arithmetic() {
        let rule = NavigationRule::default();
        assert_eq!(rule.next_id("403"), "404");
        assert_eq!(rule.prev_id("1"), "0");
        assert_eq!(rule.prev_id("0"), "0");
    }

    #[test]
    fn skipping_stops_at_the_end_of_the_id_range() {
        let rule = NavigationRule::new([u64::MAX - 1, u64::MAX]);
        assert_eq!(rule.next_id(&(u64::MAX - 2).to_string()), u64::MAX.to_string());
        assert_eq!(rule.next_id(&u64::MAX.to_string()), u64::MAX.to_string());
    }

    #[test]
    fn non_numeric_ids_stay_put() {
        let rule = NavigationRule::new([404]);
        assert_eq!(rule.next_id("intro"), "intro");
        assert_eq!(rule.prev_id("intro"), "intro");
    }
}
