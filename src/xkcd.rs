use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::error::{ComicError, Result};
use crate::models::{ArchiveEntry, ComicRecord, ComicRef};
use crate::provider::{ComicProvider, NavigationRule};
use crate::transport::{answers_ok, download_to, fetch_lines, fetch_text, Transport};

const LATEST_URL: &str = "https://xkcd.com/info.0.json";
const ARCHIVE_URL: &str = "https://xkcd.com/archive/";
const RANDOM_URL: &str = "https://c.xkcd.com/random/comic/";

/// xkcd's own "404 Not Found" joke; there is no comic behind it.
pub const XKCD_ERROR_PAGE: u64 = 404;

lazy_static! {
    static ref HOME_PATTERN: Regex = Regex::new(r"^https?://(www\.)?xkcd\.com/?$").unwrap();
    static ref COMIC_PATTERN: Regex =
        Regex::new(r"^https?://(www\.)?xkcd\.com/([0-9]+)/?$").unwrap();
    static ref ARCHIVE_PATTERN: Regex =
        Regex::new(r"^https?://(www\.)?xkcd\.com/archive/?$").unwrap();
    // group 1: comic number, group 2: date, group 3: title
    static ref ARCHIVE_ITEM_PATTERN: Regex =
        Regex::new(r#"<a href="/(\d+)/" title="(\d+-\d+-\d+)">([^<]+)</a><br/>"#).unwrap();
}

/// Shape of `info.0.json`.
#[derive(Debug, Deserialize)]
struct ComicJson {
    num: u64,
    title: String,
    alt: String,
    img: String,
    #[serde(default)]
    link: Option<String>,
}

pub struct XkcdProvider {
    transport: Arc<dyn Transport>,
    navigation: NavigationRule,
    max_redirects: u32,
}

impl XkcdProvider {
    pub fn new(transport: Arc<dyn Transport>, navigation: NavigationRule, max_redirects: u32) -> Self {
        Self {
            transport,
            navigation,
            max_redirects,
        }
    }

    fn data_url(&self, reference: &ComicRef) -> String {
        match reference {
            ComicRef::Latest => LATEST_URL.to_string(),
            ComicRef::Id(id) => format!("https://xkcd.com/{}/info.0.json", id),
        }
    }

    fn parse_comic(&self, text: &str) -> Result<ComicRecord> {
        let json: ComicJson = serde_json::from_str(text)?;

        let image = Url::parse(&json.img)
            .map_err(|e| ComicError::MalformedData(format!("bad image URL {:?}: {}", json.img, e)))?;
        let link = match json.link.as_deref().map(str::trim) {
            Some(link) if !link.is_empty() => Url::parse(link).ok(),
            _ => None,
        };

        let id = json.num.to_string();
        Ok(ComicRecord {
            prev_id: self.navigation.prev_id(&id),
            next_id: self.navigation.next_id(&id),
            id,
            title: json.title,
            alt_text: repair_latin1_mojibake(&json.alt),
            image,
            link,
            bookmarked: false,
        })
    }
}

/// The JSON feed sometimes carries UTF-8 that was decoded as Latin-1.
/// Re-encode as Latin-1 and decode as UTF-8; keep the text if that fails.
pub fn repair_latin1_mojibake(text: &str) -> String {
    if text.chars().all(|c| (c as u32) <= 0xFF) {
        let bytes: Vec<u8> = text.chars().map(|c| c as u8).collect();
        if let Ok(fixed) = String::from_utf8(bytes) {
            return fixed;
        }
    }
    text.to_string()
}

/// Pull every archive entry out of one line; lines without one yield nothing.
pub fn parse_archive_line(line: &str) -> Vec<ArchiveEntry> {
    ARCHIVE_ITEM_PATTERN
        .captures_iter(line)
        .map(|caps| {
            let title = html_escape::decode_html_entities(caps[3].trim()).to_string();
            ArchiveEntry {
                id: caps[1].to_string(),
                title,
                published: NaiveDate::parse_from_str(&caps[2], "%Y-%m-%d").ok(),
                bookmarked: false,
            }
        })
        .collect()
}

impl ComicProvider for XkcdProvider {
    fn source_id(&self) -> &str {
        "xkcd"
    }

    fn display_name(&self) -> &str {
        "xkcd"
    }

    fn first_id(&self) -> String {
        "1".to_string()
    }

    fn navigation(&self) -> &NavigationRule {
        &self.navigation
    }

    fn fetch_comic(&self, reference: &ComicRef, cancel: &CancelToken) -> Result<ComicRecord> {
        let url = self.data_url(reference);
        let text = fetch_text(self.transport.as_ref(), &url, self.max_redirects, cancel)?;
        cancel.check()?;
        let comic = self.parse_comic(&text)?;
        debug!("Fetched comic {} ({})", comic.id, comic.title);
        Ok(comic)
    }

    fn fetch_random_reference(&self, cancel: &CancelToken) -> Result<ComicRef> {
        cancel.check()?;
        let response = self.transport.open(RANDOM_URL)?;
        cancel.check()?;

        let location = response.location.ok_or_else(|| {
            warn!("Random comic service answered {} without a redirect", response.status);
            ComicError::Network(format!(
                "random comic service answered HTTP {} without a redirect",
                response.status
            ))
        })?;

        let target = Url::parse(RANDOM_URL)
            .and_then(|base| base.join(&location))
            .map(|url| url.to_string())
            .unwrap_or(location);

        self.id_from_url(&target)
            .map(ComicRef::Id)
            .ok_or_else(|| ComicError::MalformedData(format!("random redirect to {} is not a comic", target)))
    }

    fn fetch_archive(&self, cancel: &CancelToken) -> Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        fetch_lines(
            self.transport.as_ref(),
            ARCHIVE_URL,
            self.max_redirects,
            cancel,
            |line| {
                for entry in parse_archive_line(line) {
                    if seen.insert(entry.id.clone()) {
                        entries.push(entry);
                    }
                }
                Ok(())
            },
        )?;

        info!("Loaded {} archive entries", entries.len());
        Ok(entries)
    }

    fn download(&self, url: &str, dest: &mut dyn Write, cancel: &CancelToken) -> Result<u64> {
        download_to(self.transport.as_ref(), url, self.max_redirects, cancel, dest)
    }

    fn id_from_url(&self, url: &str) -> Option<String> {
        COMIC_PATTERN
            .captures(url.trim())
            .map(|caps| caps[2].to_string())
    }

    fn is_comic_url(&self, url: &str) -> bool {
        COMIC_PATTERN.is_match(url.trim())
    }

    fn is_archive_url(&self, url: &str) -> bool {
        ARCHIVE_PATTERN.is_match(url.trim())
    }

    fn is_home_url(&self, url: &str) -> bool {
        HOME_PATTERN.is_match(url.trim())
    }

    fn archive_url(&self) -> String {
        ARCHIVE_URL.to_string()
    }

    fn comic_page_url(&self, id: &str) -> String {
        format!("https://xkcd.com/{}/", id)
    }

    fn explain_url(&self, id: &str) -> Option<String> {
        Some(format!(
            "https://www.explainxkcd.com/wiki/index.php?title={}",
            urlencoding::encode(id)
        ))
    }

    fn has_explanation(&self, id: &str, cancel: &CancelToken) -> Result<bool> {
        match self.explain_url(id) {
            Some(url) => answers_ok(self.transport.as_ref(), &url, self.max_redirects, cancel),
            None => Ok(false),
        }
    }
}
