use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::cancel::CancelToken;
use crate::db::Database;
use crate::error::Result;
use crate::models::ArchiveEntry;
use crate::provider::ComicProvider;

pub const DEFAULT_TTL_SECS: u64 = 60 * 60;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Valid,
    Stale,
}

struct Snapshot {
    entries: Arc<Vec<ArchiveEntry>>,
    captured_at: DateTime<Utc>,
}

enum Slot {
    Empty,
    Filled(Snapshot),
    Evicted,
}

/// One source's archive listing, kept for a fixed time-to-live.
///
/// The listing is swapped in wholesale once a fetch completes, so readers
/// always see one fetch's result and the last fetch to finish wins.
pub struct ArchiveCache {
    provider: Arc<dyn ComicProvider>,
    bookmarks: Database,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Slot>,
}

impl ArchiveCache {
    pub fn new(
        provider: Arc<dyn ComicProvider>,
        bookmarks: Database,
        ttl_secs: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            bookmarks,
            ttl: Duration::seconds(ttl_secs.min(i64::MAX as u64 / 1000) as i64),
            clock,
            slot: Mutex::new(Slot::Empty),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        // a panicking writer can only have left a complete slot behind
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> CacheState {
        match &*self.lock_slot() {
            Slot::Empty => CacheState::Empty,
            Slot::Evicted => CacheState::Stale,
            Slot::Filled(snapshot) => {
                if self.is_fresh(snapshot) {
                    CacheState::Valid
                } else {
                    CacheState::Stale
                }
            }
        }
    }

    // a TTL reaching past the last representable instant never expires
    fn is_fresh(&self, snapshot: &Snapshot) -> bool {
        match snapshot.captured_at.checked_add_signed(self.ttl) {
            Some(expires_at) => self.clock.now() < expires_at,
            None => true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.state() == CacheState::Valid
    }

    /// Age of the cached listing, if there is one.
    pub fn age(&self) -> Option<Duration> {
        match &*self.lock_slot() {
            Slot::Filled(snapshot) => Some(self.clock.now() - snapshot.captured_at),
            _ => None,
        }
    }

    /// Cached listing while valid, otherwise a blocking fetch.
    pub fn get_data(&self, cancel: &CancelToken) -> Result<Arc<Vec<ArchiveEntry>>> {
        {
            let slot = self.lock_slot();
            if let Slot::Filled(snapshot) = &*slot {
                if self.is_fresh(snapshot) {
                    debug!("Archive cache hit for {}", self.provider.source_id());
                    return Ok(Arc::clone(&snapshot.entries));
                }
            }
        }

        debug!("Archive cache miss for {}", self.provider.source_id());
        self.fetch_and_cache(cancel)
    }

    /// Fetch again even if the cached listing is still fresh.
    pub fn refresh(&self, cancel: &CancelToken) -> Result<Arc<Vec<ArchiveEntry>>> {
        info!("Refreshing archive for {}", self.provider.source_id());
        self.fetch_and_cache(cancel)
    }

    /// Drop the listing, e.g. when the host is short on memory.
    pub fn evict(&self) {
        let mut slot = self.lock_slot();
        if matches!(*slot, Slot::Filled(_)) {
            *slot = Slot::Evicted;
        }
    }

    /// Mirror a bookmark toggle into the cached listing.
    pub fn set_bookmarked(&self, id: &str, bookmarked: bool) {
        let mut slot = self.lock_slot();
        if let Slot::Filled(snapshot) = &mut *slot {
            let entries = Arc::make_mut(&mut snapshot.entries);
            if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
                entry.bookmarked = bookmarked;
            }
        }
    }

    fn fetch_and_cache(&self, cancel: &CancelToken) -> Result<Arc<Vec<ArchiveEntry>>> {
        let mut entries = self.provider.fetch_archive(cancel)?;
        cancel.check()?;

        let bookmarked = match self.bookmarks.bookmarked_ids() {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Bookmark lookup failed, listing archive without bookmarks: {}", e);
                HashSet::new()
            }
        };
        for entry in entries.iter_mut() {
            entry.bookmarked = bookmarked.contains(&entry.id);
        }

        let entries = Arc::new(entries);
        let mut slot = self.lock_slot();
        *slot = Slot::Filled(Snapshot {
            entries: Arc::clone(&entries),
            captured_at: self.clock.now(),
        });
        Ok(entries)
    }
}

/// One archive cache per comic source, created on first use.
pub struct ArchiveRegistry {
    caches: Mutex<HashMap<String, Arc<ArchiveCache>>>,
    bookmarks: Database,
    ttl_secs: u64,
    clock: Arc<dyn Clock>,
}

impl ArchiveRegistry {
    pub fn new(bookmarks: Database, ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            caches: Mutex::new(HashMap::new()),
            bookmarks,
            ttl_secs,
            clock,
        }
    }

    pub fn archive_for(&self, provider: &Arc<dyn ComicProvider>) -> Arc<ArchiveCache> {
        let mut caches = self
            .caches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            caches
                .entry(provider.source_id().to_string())
                .or_insert_with(|| {
                    Arc::new(ArchiveCache::new(
                        Arc::clone(provider),
                        self.bookmarks.clone(),
                        self.ttl_secs,
                        Arc::clone(&self.clock),
                    ))
                }),
        )
    }
}

/// Which listing the archive view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveView {
    All,
    Bookmarks,
    SearchTitle(String),
}

/// Entries whose lowercased title contains every whitespace-separated token
/// of `query`. An empty query matches everything.
pub fn search_by_title(entries: &[ArchiveEntry], query: &str) -> Vec<ArchiveEntry> {
    let query = query.to_lowercase();
    let tokens: Vec<&str> = query.split_whitespace().collect();

    entries
        .iter()
        .filter(|entry| {
            let title = entry.title.to_lowercase();
            tokens.iter().all(|token| title.contains(token))
        })
        .cloned()
        .collect()
}

pub fn load_view(
    view: &ArchiveView,
    cache: &ArchiveCache,
    bookmarks: &Database,
    cancel: &CancelToken,
) -> Result<Vec<ArchiveEntry>> {
    match view {
        ArchiveView::All => Ok(cache.get_data(cancel)?.as_ref().clone()),
        ArchiveView::Bookmarks => {
            cancel.check()?;
            bookmarks.get_all_bookmarks()
        }
        ArchiveView::SearchTitle(query) => {
            let entries = cache.get_data(cancel)?;
            cancel.check()?;
            Ok(search_by_title(&entries, query))
        }
    }
}
