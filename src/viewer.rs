use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::archive::{load_view, ArchiveCache, ArchiveRegistry, ArchiveView};
use crate::db::Database;
use crate::error::{ComicError, Result};
use crate::models::{ArchiveEntry, ComicRecord, ComicRef};
use crate::pipeline::{Outcome, ProgressIndicator, Task};
use crate::provider::{ComicProvider, DeepLink};
use crate::share;

/// What the presentation layer should show after a task ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    None,
    /// Short-lived, non-blocking message.
    Transient(String),
    /// Blocking error dialog; the text holds every error reported since the
    /// dialog was last dismissed.
    Dialog(String),
}

/// Error messages queued into a single dialog.
#[derive(Debug, Default)]
pub struct ErrorReport {
    buffer: String,
    showing: bool,
}

impl ErrorReport {
    /// Queue `reason` and return the full dialog text.
    pub fn push(&mut self, reason: &str) -> String {
        if !self.showing {
            self.buffer.clear();
        }
        if !self.buffer.is_empty() {
            self.buffer.push_str("\n\n");
        }
        self.buffer.push_str(reason);
        self.showing = true;
        self.buffer.clone()
    }

    pub fn dismiss(&mut self) {
        self.showing = false;
    }

    pub fn is_showing(&self) -> bool {
        self.showing
    }

    pub fn message(&self) -> &str {
        &self.buffer
    }
}

/// Where a deep link led.
pub enum LinkAction {
    Comic(Task<ComicRecord>),
    Archive(Task<Vec<ArchiveEntry>>),
    Notice(Notice),
}

/// Drives comic and archive loads for one source: starts background tasks
/// and folds their outcomes into viewer state and user notices.
pub struct ComicViewer {
    provider: Arc<dyn ComicProvider>,
    bookmarks: Database,
    archive: Arc<ArchiveCache>,
    progress: Arc<dyn ProgressIndicator>,
    current: Option<ComicRecord>,
    last_read: Option<String>,
    errors: ErrorReport,
}

impl ComicViewer {
    pub fn new(
        provider: Arc<dyn ComicProvider>,
        bookmarks: Database,
        registry: &ArchiveRegistry,
        progress: Arc<dyn ProgressIndicator>,
    ) -> Self {
        let archive = registry.archive_for(&provider);
        Self {
            provider,
            bookmarks,
            archive,
            progress,
            current: None,
            last_read: None,
            errors: ErrorReport::default(),
        }
    }

    /// Reopen the last comic when asked to and one is known, else the newest.
    pub fn startup_reference(reopen_last: bool, last_comic: Option<&str>) -> ComicRef {
        match last_comic {
            Some(id) if reopen_last && !id.trim().is_empty() => ComicRef::id(id.trim()),
            _ => ComicRef::Latest,
        }
    }

    pub fn provider(&self) -> &Arc<dyn ComicProvider> {
        &self.provider
    }

    pub fn current(&self) -> Option<&ComicRecord> {
        self.current.as_ref()
    }

    pub fn last_read(&self) -> Option<&str> {
        self.last_read.as_deref()
    }

    pub fn errors(&self) -> &ErrorReport {
        &self.errors
    }

    pub fn dismiss_errors(&mut self) {
        self.errors.dismiss();
    }

    pub fn load_comic(&self, reference: ComicRef) -> Task<ComicRecord> {
        let provider = Arc::clone(&self.provider);
        let bookmarks = self.bookmarks.clone();
        info!("Loading comic {}", reference);

        Task::spawn("Loading comic...", Arc::clone(&self.progress), move |cancel| {
            let mut comic = provider.fetch_comic(&reference, cancel)?;
            comic.bookmarked = bookmarks.is_bookmarked(&comic.id).unwrap_or_else(|e| {
                warn!("Couldn't read bookmark state of {}: {}", comic.id, e);
                false
            });
            Ok(comic)
        })
    }

    pub fn go_to(&self, id: &str) -> Task<ComicRecord> {
        self.load_comic(ComicRef::id(id))
    }

    pub fn go_first(&self) -> Task<ComicRecord> {
        self.load_comic(ComicRef::Id(self.provider.first_id()))
    }

    pub fn go_last(&self) -> Task<ComicRecord> {
        self.load_comic(ComicRef::Latest)
    }

    /// `None` until a comic is active.
    pub fn go_prev(&self) -> Option<Task<ComicRecord>> {
        let prev = self.current.as_ref()?.prev_id.clone();
        Some(self.load_comic(ComicRef::Id(prev)))
    }

    pub fn go_next(&self) -> Option<Task<ComicRecord>> {
        let next = self.current.as_ref()?.next_id.clone();
        Some(self.load_comic(ComicRef::Id(next)))
    }

    /// First half of "random": resolve the id, then hand the outcome to
    /// [`ComicViewer::finish_random`].
    pub fn go_random(&self) -> Task<ComicRef> {
        let provider = Arc::clone(&self.provider);
        Task::spawn("Randomizing...", Arc::clone(&self.progress), move |cancel| {
            provider.fetch_random_reference(cancel)
        })
    }

    pub fn finish_random(&mut self, outcome: Outcome<ComicRef>) -> std::result::Result<Task<ComicRecord>, Notice> {
        match outcome {
            Outcome::Success(reference) => Ok(self.load_comic(reference)),
            Outcome::Failure(e) => {
                warn!("Random comic lookup failed: {}", e);
                Err(Notice::Transient("Failed to get random comic".into()))
            }
            Outcome::Cancelled => Err(Notice::None),
        }
    }

    pub fn open_deep_link(&self, url: &str) -> LinkAction {
        match self.provider.classify(url) {
            DeepLink::Comic(id) => LinkAction::Comic(self.go_to(&id)),
            DeepLink::Archive => LinkAction::Archive(self.load_archive(ArchiveView::All)),
            DeepLink::Home => LinkAction::Comic(self.go_last()),
            DeepLink::Unsupported => LinkAction::Notice(Notice::Transient(
                "This comic viewer can't display this content.".into(),
            )),
        }
    }

    /// Map a failed or cancelled task onto what the user gets to see.
    pub fn report(&mut self, error: &ComicError) -> Notice {
        match error {
            ComicError::Cancelled => Notice::None,
            ComicError::NotFound(_) => Notice::Transient("Comic doesn't exist".into()),
            other => {
                warn!("{}", other);
                Notice::Dialog(self.errors.push(&other.to_string()))
            }
        }
    }

    pub fn finish_comic(&mut self, outcome: Outcome<ComicRecord>) -> Notice {
        match outcome {
            Outcome::Success(comic) => {
                info!("Showing comic {} ({})", comic.id, comic.title);
                let notice = if comic.link.is_some() {
                    Notice::Transient(
                        "This comic has a link or larger image attached.".into(),
                    )
                } else {
                    Notice::None
                };
                self.last_read = Some(comic.id.clone());
                self.current = Some(comic);
                notice
            }
            Outcome::Failure(e) => self.report(&e),
            Outcome::Cancelled => Notice::None,
        }
    }

    pub fn load_archive(&self, view: ArchiveView) -> Task<Vec<ArchiveEntry>> {
        let archive = Arc::clone(&self.archive);
        let bookmarks = self.bookmarks.clone();
        Task::spawn("Loading archive...", Arc::clone(&self.progress), move |cancel| {
            load_view(&view, &archive, &bookmarks, cancel)
        })
    }

    pub fn finish_archive(
        &mut self,
        outcome: Outcome<Vec<ArchiveEntry>>,
    ) -> std::result::Result<Vec<ArchiveEntry>, Notice> {
        match outcome {
            Outcome::Success(entries) => Ok(entries),
            Outcome::Failure(ComicError::NotFound(what)) => Err(Notice::Dialog(
                self.errors.push(&format!("Archive not found: {}", what)),
            )),
            Outcome::Failure(e) => Err(self.report(&e)),
            Outcome::Cancelled => Err(Notice::None),
        }
    }

    /// Reports plain success or failure; the reason only goes to the log.
    pub fn refresh_archive(&self) -> Task<bool> {
        let archive = Arc::clone(&self.archive);
        Task::spawn("Loading archive...", Arc::clone(&self.progress), move |cancel| {
            match archive.refresh(cancel) {
                Ok(_) => Ok(true),
                Err(ComicError::Cancelled) => Err(ComicError::Cancelled),
                Err(e) => {
                    warn!("Archive refresh failed: {}", e);
                    Ok(false)
                }
            }
        })
    }

    /// After a successful refresh, reload `view` from the fresh cache.
    pub fn finish_refresh(
        &mut self,
        outcome: Outcome<bool>,
        view: ArchiveView,
    ) -> std::result::Result<Task<Vec<ArchiveEntry>>, Notice> {
        match outcome {
            Outcome::Success(true) => Ok(self.load_archive(view)),
            Outcome::Success(false) | Outcome::Failure(_) => Err(Notice::Transient(
                "Failed to refresh archive cache".into(),
            )),
            Outcome::Cancelled => Err(Notice::None),
        }
    }

    /// Save the active comic's image into `dir` for sharing as an attachment.
    pub fn save_image(&self, dir: PathBuf) -> std::result::Result<Task<PathBuf>, Notice> {
        let Some(comic) = self.current.clone() else {
            return Err(Notice::Transient("No image loaded.".into()));
        };
        let provider = Arc::clone(&self.provider);
        Ok(Task::spawn("Saving image...", Arc::clone(&self.progress), move |cancel| {
            share::save_image(provider.as_ref(), &comic, &dir, cancel)
        }))
    }

    pub fn finish_save_image(&mut self, outcome: Outcome<PathBuf>) -> std::result::Result<PathBuf, Notice> {
        match outcome {
            Outcome::Success(path) => Ok(path),
            Outcome::Failure(ComicError::Cancelled) | Outcome::Cancelled => Err(Notice::None),
            Outcome::Failure(e) => {
                warn!("Saving image failed: {}", e);
                Err(Notice::Dialog(
                    self.errors.push(&format!("Couldn't save attachment: {}", e)),
                ))
            }
        }
    }

    /// `None` until a comic is active.
    pub fn check_explanation(&self) -> Option<Task<bool>> {
        let id = self.current.as_ref()?.id.clone();
        let provider = Arc::clone(&self.provider);
        Some(Task::spawn("Looking up explanation...", Arc::clone(&self.progress), move |cancel| {
            provider.has_explanation(&id, cancel)
        }))
    }

    pub fn finish_explanation(&mut self, outcome: Outcome<bool>) -> Notice {
        match outcome {
            Outcome::Success(true) | Outcome::Cancelled => Notice::None,
            Outcome::Failure(ComicError::Cancelled) => Notice::None,
            Outcome::Success(false) | Outcome::Failure(_) => Notice::Transient(
                "This comic has no user-supplied explanation.".into(),
            ),
        }
    }

    /// Flip the active comic's bookmark. Returns the new state, or `None`
    /// when nothing is shown.
    pub fn toggle_bookmark(&mut self) -> Result<Option<bool>> {
        let Some(comic) = self.current.as_mut() else {
            return Ok(None);
        };

        let bookmarked = !comic.bookmarked;
        if bookmarked {
            self.bookmarks.add_bookmark(&comic.id, &comic.title)?;
        } else {
            self.bookmarks.remove_bookmark(&comic.id)?;
        }
        comic.bookmarked = bookmarked;
        self.archive.set_bookmarked(&comic.id, bookmarked);
        Ok(Some(bookmarked))
    }

    /// Bookmark or un-bookmark an archive row.
    pub fn set_archive_bookmark(&mut self, entry: &ArchiveEntry, bookmarked: bool) -> Result<()> {
        if bookmarked {
            self.bookmarks.add_bookmark(&entry.id, &entry.title)?;
        } else {
            self.bookmarks.remove_bookmark(&entry.id)?;
        }
        self.archive.set_bookmarked(&entry.id, bookmarked);
        if let Some(comic) = self.current.as_mut() {
            if comic.id == entry.id {
                comic.bookmarked = bookmarked;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::ManualClock;
    use crate::archive::DEFAULT_TTL_SECS;
    use crate::pipeline::testing::CountingProgress;
    use crate::pipeline::NoProgress;
    use crate::provider::NavigationRule;
    use crate::transport::testing::CannedTransport;
    use crate::xkcd::{XkcdProvider, XKCD_ERROR_PAGE};
    use chrono::Utc;

    const ARCHIVE_URL: &str = "https://xkcd.com/archive/";
    const RANDOM_URL: &str = "https://c.xkcd.com/random/comic/";

    fn comic_json(num: u64, title: &str) -> String {
        format!(
            r#"{{"num":{},"title":"{}","alt":"alt {}","img":"https://imgs.xkcd.com/comics/{}.png"}}"#,
            num, title, num, num
        )
    }

    fn transport() -> Arc<CannedTransport> {
        let transport = CannedTransport::new()
            .ok("https://xkcd.com/info.0.json", &comic_json(405, "Journal 3"))
            .ok("https://xkcd.com/1/info.0.json", &comic_json(1, "Barrel - Part 1"))
            .ok("https://xkcd.com/2/info.0.json", &comic_json(2, "Petit Trees (sketch)"))
            .ok("https://xkcd.com/403/info.0.json", &comic_json(403, "Convincing Pickup Line"))
            .ok(
                "https://xkcd.com/353/info.0.json",
                r#"{"num":353,"title":"Python","alt":"","img":"https://imgs.xkcd.com/comics/python.png","link":"https://xkcd.com/353/large/"}"#,
            )
            .with("https://xkcd.com/0/info.0.json", 404, None, "")
            .with("https://xkcd.com/406/info.0.json", 404, None, "")
            .with("https://xkcd.com/500/info.0.json", 500, None, "")
            .ok(
                ARCHIVE_URL,
                concat!(
                    "<a href=\"/2/\" title=\"2006-1-1\">Petit Trees (sketch)</a><br/>\n",
                    "<a href=\"/1/\" title=\"2006-1-1\">Barrel - Part 1</a><br/>\n",
                ),
            )
            .redirect(RANDOM_URL, 302, "https://xkcd.com/2/");
        Arc::new(transport)
    }

    fn viewer_with(transport: Arc<CannedTransport>, progress: Arc<dyn ProgressIndicator>) -> (ComicViewer, Database) {
        let provider: Arc<dyn ComicProvider> = Arc::new(XkcdProvider::new(
            transport,
            NavigationRule::new([XKCD_ERROR_PAGE]),
            2,
        ));
        let db = Database::open_in_memory().unwrap();
        let registry = ArchiveRegistry::new(
            db.clone(),
            DEFAULT_TTL_SECS,
            Arc::new(ManualClock::new(Utc::now())),
        );
        (ComicViewer::new(provider, db.clone(), &registry, progress), db)
    }

    fn viewer() -> (ComicViewer, Database) {
        viewer_with(transport(), Arc::new(NoProgress))
    }

    fn show<F>(viewer: &mut ComicViewer, start: F) -> Notice
    where
        F: FnOnce(&ComicViewer) -> Task<ComicRecord>,
    {
        let task = start(viewer);
        viewer.finish_comic(task.wait())
    }

    #[test]
    fn navigates_first_next_prev_last() {
        let (mut viewer, _) = viewer();
        assert!(viewer.go_next().is_none());

        assert_eq!(show(&mut viewer, |v| v.go_first()), Notice::None);
        assert_eq!(viewer.current().unwrap().title, "Barrel - Part 1");

        show(&mut viewer, |v| v.go_next().unwrap());
        assert_eq!(viewer.current().unwrap().id, "2");

        show(&mut viewer, |v| v.go_prev().unwrap());
        assert_eq!(viewer.current().unwrap().id, "1");

        show(&mut viewer, |v| v.go_last());
        let current = viewer.current().unwrap();
        assert_eq!(current.id, "405");
        assert_eq!(current.prev_id, "403");
        assert_eq!(viewer.last_read(), Some("405"));

        show(&mut viewer, |v| v.go_prev().unwrap());
        assert_eq!(viewer.current().unwrap().id, "403");
    }

    #[test]
    fn running_off_the_end_is_a_transient_notice() {
        let (mut viewer, _) = viewer();
        show(&mut viewer, |v| v.go_last());

        assert_eq!(
            show(&mut viewer, |v| v.go_next().unwrap()),
            Notice::Transient("Comic doesn't exist".into())
        );
        assert_eq!(viewer.current().unwrap().id, "405");
        assert!(!viewer.errors().is_showing());
    }

    #[test]
    fn other_errors_accumulate_in_one_dialog() {
        let (mut viewer, _) = viewer();

        let first = show(&mut viewer, |v| v.go_to("500"));
        let Notice::Dialog(text) = &first else {
            panic!("expected dialog, got {:?}", first);
        };
        assert!(text.contains("HTTP 500"));

        let second = show(&mut viewer, |v| v.go_to("777"));
        let Notice::Dialog(text) = &second else {
            panic!("expected dialog, got {:?}", second);
        };
        assert_eq!(text.matches("\n\n").count(), 1);
        assert!(text.contains("connection refused"));

        viewer.dismiss_errors();
        let third = show(&mut viewer, |v| v.go_to("500"));
        let Notice::Dialog(text) = &third else {
            panic!("expected dialog, got {:?}", third);
        };
        assert!(!text.contains("\n\n"));
    }

    #[test]
    fn attached_links_are_pointed_out() {
        let (mut viewer, _) = viewer();
        let notice = show(&mut viewer, |v| v.go_to("353"));
        assert!(matches!(notice, Notice::Transient(ref msg) if msg.contains("link")));
    }

    #[test]
    fn loaded_comics_carry_bookmark_state() {
        let (mut viewer, db) = viewer();
        db.add_bookmark("1", "Barrel - Part 1").unwrap();
        show(&mut viewer, |v| v.go_first());
        assert!(viewer.current().unwrap().bookmarked);

        assert_eq!(viewer.toggle_bookmark().unwrap(), Some(false));
        assert!(!db.is_bookmarked("1").unwrap());
        assert_eq!(viewer.toggle_bookmark().unwrap(), Some(true));
        assert!(db.is_bookmarked("1").unwrap());
    }

    #[test]
    fn toggle_without_a_comic_does_nothing() {
        let (mut viewer, _) = viewer();
        assert_eq!(viewer.toggle_bookmark().unwrap(), None);
    }

    #[test]
    fn random_resolves_then_loads() {
        let (mut viewer, _) = viewer();
        let task = viewer
            .finish_random(viewer.go_random().wait())
            .unwrap_or_else(|notice| panic!("unexpected {:?}", notice));
        viewer.finish_comic(task.wait());
        assert_eq!(viewer.current().unwrap().id, "2");
    }

    #[test]
    fn random_failure_is_transient() {
        let transport = transport();
        transport.set(RANDOM_URL, 200, None, "no redirect here");
        let (mut viewer, _) = viewer_with(transport, Arc::new(NoProgress));
        let outcome = viewer.go_random().wait();
        match viewer.finish_random(outcome) {
            Err(notice) => assert_eq!(notice, Notice::Transient("Failed to get random comic".into())),
            Ok(_) => panic!("random should have failed"),
        }
    }

    #[test]
    fn deep_links_are_routed() {
        let (mut viewer, _) = viewer();

        match viewer.open_deep_link("https://xkcd.com/2/") {
            LinkAction::Comic(task) => {
                viewer.finish_comic(task.wait());
            }
            _ => panic!("comic link should load a comic"),
        }
        assert_eq!(viewer.current().unwrap().id, "2");

        match viewer.open_deep_link("https://www.xkcd.com/") {
            LinkAction::Comic(task) => {
                viewer.finish_comic(task.wait());
            }
            _ => panic!("home link should load the latest comic"),
        }
        assert_eq!(viewer.current().unwrap().id, "405");

        match viewer.open_deep_link("http://xkcd.com/archive") {
            LinkAction::Archive(task) => {
                let entries = viewer.finish_archive(task.wait()).unwrap();
                assert_eq!(entries.len(), 2);
            }
            _ => panic!("archive link should open the archive"),
        }

        assert!(matches!(
            viewer.open_deep_link("https://example.com/"),
            LinkAction::Notice(Notice::Transient(_))
        ));
    }

    #[test]
    fn archive_views_and_bookmark_toggles_agree() {
        let (mut viewer, db) = viewer();
        let all = viewer.finish_archive(viewer.load_archive(ArchiveView::All).wait()).unwrap();
        assert!(all.iter().all(|e| !e.bookmarked));

        viewer.set_archive_bookmark(&all[0], true).unwrap();
        assert!(db.is_bookmarked("2").unwrap());

        let again = viewer.finish_archive(viewer.load_archive(ArchiveView::All).wait()).unwrap();
        assert!(again.iter().find(|e| e.id == "2").unwrap().bookmarked);

        let marked = viewer
            .finish_archive(viewer.load_archive(ArchiveView::Bookmarks).wait())
            .unwrap();
        assert_eq!(marked.len(), 1);

        let found = viewer
            .finish_archive(viewer.load_archive(ArchiveView::SearchTitle("BARREL part".into())).wait())
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1");
    }

    #[test]
    fn refresh_reloads_the_view() {
        let transport = transport();
        let (mut viewer, _) = viewer_with(transport.clone(), Arc::new(NoProgress));
        viewer.finish_archive(viewer.load_archive(ArchiveView::All).wait()).unwrap();

        let reload = viewer
            .finish_refresh(viewer.refresh_archive().wait(), ArchiveView::All)
            .unwrap_or_else(|notice| panic!("unexpected {:?}", notice));
        viewer.finish_archive(reload.wait()).unwrap();
        assert_eq!(transport.count(ARCHIVE_URL), 2);
    }

    #[test]
    fn failed_refresh_is_transient() {
        let transport = transport();
        transport.set(ARCHIVE_URL, 503, None, "");
        let (mut viewer, _) = viewer_with(transport, Arc::new(NoProgress));
        match viewer.finish_refresh(viewer.refresh_archive().wait(), ArchiveView::All) {
            Err(notice) => assert_eq!(
                notice,
                Notice::Transient("Failed to refresh archive cache".into())
            ),
            Ok(_) => panic!("refresh should have failed"),
        }
    }

    #[test]
    fn cancelled_load_changes_nothing() {
        let progress = Arc::new(CountingProgress::default());
        let (mut viewer, _) = viewer_with(transport(), progress.clone());

        let task = viewer.go_first();
        task.cancel();
        assert_eq!(viewer.finish_comic(task.wait()), Notice::None);
        assert!(viewer.current().is_none());
        assert_eq!(progress.dismissals(), 1);
    }

    #[test]
    fn saving_needs_a_comic_and_reports_failures() {
        let transport = transport();
        transport.set("https://imgs.xkcd.com/comics/1.png", 200, None, "barrel");
        let (mut viewer, _) = viewer_with(transport.clone(), Arc::new(NoProgress));
        let dir = tempfile::tempdir().unwrap();

        match viewer.save_image(dir.path().to_path_buf()) {
            Err(notice) => assert_eq!(notice, Notice::Transient("No image loaded.".into())),
            Ok(_) => panic!("nothing to save yet"),
        }

        show(&mut viewer, |v| v.go_first());
        let task = viewer.save_image(dir.path().to_path_buf()).unwrap();
        let path = viewer.finish_save_image(task.wait()).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "barrel");

        transport.set("https://imgs.xkcd.com/comics/1.png", 503, None, "");
        let task = viewer.save_image(dir.path().to_path_buf()).unwrap();
        match viewer.finish_save_image(task.wait()) {
            Err(Notice::Dialog(text)) => assert!(text.starts_with("Couldn't save attachment: ")),
            other => panic!("expected dialog, got {:?}", other),
        }
    }

    #[test]
    fn missing_explanation_is_a_transient_notice() {
        let transport = transport();
        transport.set("https://www.explainxkcd.com/wiki/index.php?title=1", 200, None, "");
        transport.set("https://www.explainxkcd.com/wiki/index.php?title=2", 404, None, "");
        let (mut viewer, _) = viewer_with(transport, Arc::new(NoProgress));
        assert!(viewer.check_explanation().is_none());

        show(&mut viewer, |v| v.go_first());
        let task = viewer.check_explanation().unwrap();
        assert_eq!(viewer.finish_explanation(task.wait()), Notice::None);

        show(&mut viewer, |v| v.go_next().unwrap());
        let task = viewer.check_explanation().unwrap();
        assert_eq!(
            viewer.finish_explanation(task.wait()),
            Notice::Transient("This comic has no user-supplied explanation.".into())
        );
    }

    #[test]
    fn startup_prefers_the_last_comic_when_asked() {
        assert_eq!(ComicViewer::startup_reference(false, Some("42")), ComicRef::Latest);
        assert_eq!(ComicViewer::startup_reference(true, Some("42")), ComicRef::id("42"));
        assert_eq!(ComicViewer::startup_reference(true, None), ComicRef::Latest);
        assert_eq!(ComicViewer::startup_reference(true, Some(" ")), ComicRef::Latest);
    }

    #[test]
    fn error_report_queues_until_dismissed() {
        let mut report = ErrorReport::default();
        assert_eq!(report.push("one"), "one");
        assert_eq!(report.push("two"), "one\n\ntwo");
        report.dismiss();
        assert_eq!(report.push("three"), "three");
        assert_eq!(report.message(), "three");
    }
}
