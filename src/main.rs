use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};
use std::thread;
use std::time::Duration;

use comic_viewer::archive::{ArchiveRegistry, ArchiveView, SystemClock};
use comic_viewer::cancel::CancelToken;
use comic_viewer::config::{AppPaths, Settings};
use comic_viewer::db::Database;
use comic_viewer::models::{ArchiveEntry, ComicRecord, ComicRef};
use comic_viewer::pipeline::{Outcome, ProgressIndicator, Task};
use comic_viewer::provider::ComicProvider;
use comic_viewer::share;
use comic_viewer::transport::HttpTransport;
use comic_viewer::viewer::{ComicViewer, LinkAction, Notice};
use comic_viewer::xkcd::XkcdProvider;

#[derive(Parser)]
#[command(name = "comic-viewer", version, about = "Read, bookmark and search xkcd from the terminal")]
struct Cli {
    /// Where settings.json and bookmarks.db live (default ~/.comic_viewer)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override how long the archive listing stays cached, in seconds
    #[arg(long, global = true)]
    cache_ttl: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Last comic read if reopening is enabled, otherwise the newest
    Start,
    /// Show a comic by id, or the newest one
    Show { id: Option<String> },
    First,
    Last,
    /// The comic after the last one read
    Next,
    /// The comic before the last one read
    Prev,
    Random,
    /// Follow a link to a comic, the archive or the home page
    Open { url: String },
    Archive {
        /// Fetch the listing again even if the cached one is fresh
        #[arg(long)]
        refresh: bool,
    },
    Bookmarks,
    /// Archive entries whose title contains every word of the query
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Bookmark a comic (or remove the bookmark)
    Bookmark {
        id: String,
        #[arg(long)]
        remove: bool,
    },
    Share {
        id: Option<String>,
        /// Copy the share text to the clipboard
        #[arg(long)]
        copy: bool,
        /// Open the comic page in the browser
        #[arg(long)]
        browser: bool,
        /// Open the explanation page in the browser
        #[arg(long)]
        explain: bool,
        /// Print a mailto: link
        #[arg(long)]
        mail: bool,
        /// Save the comic image to the temp directory and print its path
        #[arg(long)]
        image: bool,
    },
    /// Print the settings in use
    Config {
        /// Reopen the last comic on `start`
        #[arg(long)]
        reopen_last: Option<bool>,
    },
}

/// Prints the task label on stderr and ends the line when dismissed.
struct TerminalProgress;

impl ProgressIndicator for TerminalProgress {
    fn show(&self, message: &str) {
        if std::io::stdin().is_terminal() {
            eprint!("{} (q + Enter to cancel) ", message);
        } else {
            eprint!("{} ", message);
        }
        let _ = std::io::stderr().flush();
    }

    fn dismiss(&self) {
        eprintln!();
    }
}

/// One stdin reader for the whole run; "q" cancels whichever task is in flight.
struct QuitWatcher {
    current: Arc<Mutex<Option<CancelToken>>>,
    started: Once,
}

impl QuitWatcher {
    fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            started: Once::new(),
        }
    }

    fn watch(&self, token: CancelToken) {
        if !std::io::stdin().is_terminal() {
            return;
        }
        if let Ok(mut current) = self.current.lock() {
            *current = Some(token);
        }
        let current = Arc::clone(&self.current);
        self.started.call_once(move || {
            thread::spawn(move || {
                let mut line = String::new();
                while std::io::stdin().read_line(&mut line).unwrap_or(0) > 0 {
                    if line.trim().eq_ignore_ascii_case("q") {
                        if let Ok(current) = current.lock() {
                            if let Some(token) = current.as_ref() {
                                token.cancel();
                            }
                        }
                    }
                    line.clear();
                }
            });
        });
    }
}

struct App {
    viewer: ComicViewer,
    settings: Settings,
    paths: AppPaths,
    watcher: QuitWatcher,
}

impl App {
    fn await_task<T: Send + 'static>(&self, mut task: Task<T>) -> Outcome<T> {
        self.watcher.watch(task.cancel_token());
        loop {
            if let Some(outcome) = task.try_outcome() {
                return outcome;
            }
            thread::sleep(Duration::from_millis(50));
        }
    }

    fn notify(&mut self, notice: Notice) {
        match notice {
            Notice::None => {}
            Notice::Transient(message) => eprintln!("{}", message),
            Notice::Dialog(message) => {
                eprintln!("Error\n{}", message);
                self.viewer.dismiss_errors();
            }
        }
    }

    /// Run a comic load to completion and print the result.
    fn show_comic(&mut self, task: Task<ComicRecord>) -> Option<ComicRecord> {
        let outcome = self.await_task(task);
        let loaded = matches!(outcome, Outcome::Success(_));
        let notice = self.viewer.finish_comic(outcome);

        let comic = if loaded {
            self.viewer.current().cloned()
        } else {
            None
        };
        if let Some(comic) = &comic {
            print_comic(comic);
            self.remember(&comic.id);
        }
        self.notify(notice);
        comic
    }

    fn remember(&mut self, id: &str) {
        self.settings.record_last_read(id);
        if let Err(e) = self.settings.save(&self.paths.settings_file()) {
            eprintln!("Couldn't save settings: {:#}", e);
        }
    }

    fn show_archive(&mut self, task: Task<Vec<ArchiveEntry>>) {
        let outcome = self.await_task(task);
        match self.viewer.finish_archive(outcome) {
            Ok(entries) => print_entries(&entries),
            Err(notice) => self.notify(notice),
        }
    }

    /// The comic to navigate from: the last one read, else the newest.
    fn load_base(&mut self) -> Option<ComicRecord> {
        let reference = match self.settings.last_comic.clone() {
            Some(id) => ComicRef::Id(id),
            None => ComicRef::Latest,
        };
        let task = self.viewer.load_comic(reference);
        let outcome = self.await_task(task);
        let notice = self.viewer.finish_comic(outcome);
        self.notify(notice);
        self.viewer.current().cloned()
    }

    fn step(&mut self, forward: bool) -> Result<()> {
        if self.load_base().is_none() {
            bail!("no comic to navigate from");
        }
        let task = if forward {
            self.viewer.go_next()
        } else {
            self.viewer.go_prev()
        };
        if let Some(task) = task {
            self.show_comic(task);
        }
        Ok(())
    }

    fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Start => {
                let reference = ComicViewer::startup_reference(
                    self.settings.reopen_last_comic,
                    self.settings.last_comic.as_deref(),
                );
                let task = self.viewer.load_comic(reference);
                self.show_comic(task);
            }
            Command::Show { id } => {
                let task = match id {
                    Some(id) => self.viewer.go_to(&id),
                    None => self.viewer.go_last(),
                };
                self.show_comic(task);
            }
            Command::First => {
                let task = self.viewer.go_first();
                self.show_comic(task);
            }
            Command::Last => {
                let task = self.viewer.go_last();
                self.show_comic(task);
            }
            Command::Next => self.step(true)?,
            Command::Prev => self.step(false)?,
            Command::Random => {
                let task = self.viewer.go_random();
                let outcome = self.await_task(task);
                match self.viewer.finish_random(outcome) {
                    Ok(task) => {
                        self.show_comic(task);
                    }
                    Err(notice) => self.notify(notice),
                }
            }
            Command::Open { url } => match self.viewer.open_deep_link(&url) {
                LinkAction::Comic(task) => {
                    self.show_comic(task);
                }
                LinkAction::Archive(task) => self.show_archive(task),
                LinkAction::Notice(notice) => self.notify(notice),
            },
            Command::Archive { refresh } => {
                if refresh {
                    let task = self.viewer.refresh_archive();
                    let outcome = self.await_task(task);
                    match self.viewer.finish_refresh(outcome, ArchiveView::All) {
                        Ok(reload) => self.show_archive(reload),
                        Err(notice) => self.notify(notice),
                    }
                } else {
                    let task = self.viewer.load_archive(ArchiveView::All);
                    self.show_archive(task);
                }
            }
            Command::Bookmarks => {
                let task = self.viewer.load_archive(ArchiveView::Bookmarks);
                self.show_archive(task);
            }
            Command::Search { query } => {
                let task = self
                    .viewer
                    .load_archive(ArchiveView::SearchTitle(query.join(" ")));
                self.show_archive(task);
            }
            Command::Bookmark { id, remove } => {
                let task = self.viewer.go_to(&id);
                let Some(comic) = self.show_comic(task) else {
                    return Ok(());
                };
                if comic.bookmarked == remove {
                    self.viewer
                        .toggle_bookmark()
                        .context("updating bookmark")?;
                }
                if remove {
                    println!("Removed bookmark for #{}", comic.id);
                } else {
                    println!("Bookmarked #{}", comic.id);
                }
            }
            Command::Share {
                id,
                copy,
                browser,
                explain,
                mail,
                image,
            } => {
                let task = match id.or_else(|| self.settings.last_comic.clone()) {
                    Some(id) => self.viewer.go_to(&id),
                    None => self.viewer.go_last(),
                };
                let Some(comic) = self.show_comic(task) else {
                    return Ok(());
                };
                let provider = Arc::clone(self.viewer.provider());
                let text = share::share_text(provider.as_ref(), &comic);
                println!("{}", text);
                if mail {
                    println!("{}", share::mailto_link(provider.as_ref(), &comic));
                }
                if copy {
                    share::copy_to_clipboard(&text)?;
                    eprintln!("Copied to clipboard");
                }
                if browser {
                    let url = comic
                        .link
                        .as_ref()
                        .map(|link| link.to_string())
                        .unwrap_or_else(|| provider.comic_page_url(&comic.id));
                    share::open_in_browser(&url)?;
                }
                if explain {
                    if let Some(task) = self.viewer.check_explanation() {
                        let outcome = self.await_task(task);
                        let notice = self.viewer.finish_explanation(outcome);
                        self.notify(notice);
                    }
                    if let Some(url) = provider.explain_url(&comic.id) {
                        share::open_in_browser(&url)?;
                    }
                }
                if image {
                    match self.viewer.save_image(std::env::temp_dir()) {
                        Ok(task) => {
                            let outcome = self.await_task(task);
                            match self.viewer.finish_save_image(outcome) {
                                Ok(path) => println!("{}", path.display()),
                                Err(notice) => self.notify(notice),
                            }
                        }
                        Err(notice) => self.notify(notice),
                    }
                }
            }
            Command::Config { reopen_last } => {
                if let Some(reopen) = reopen_last {
                    self.settings.reopen_last_comic = reopen;
                    self.settings.save(&self.paths.settings_file())?;
                }
                println!("# {}", self.paths.settings_file().display());
                println!("{}", serde_json::to_string_pretty(&self.settings)?);
            }
        }
        Ok(())
    }
}

fn print_comic(comic: &ComicRecord) {
    let marker = if comic.bookmarked { "  [bookmarked]" } else { "" };
    println!("#{} {}{}", comic.id, comic.title, marker);
    println!("{}", comic.image);
    if comic.has_alt_text() {
        println!("\n{}\n", comic.alt_text);
    }
    if let Some(link) = &comic.link {
        println!("link: {}", link);
    }
    println!("prev: {}  next: {}", comic.prev_id, comic.next_id);
}

fn print_entries(entries: &[ArchiveEntry]) {
    for entry in entries {
        let marker = if entry.bookmarked { "*" } else { " " };
        match entry.published {
            Some(date) => println!("{} {}  ({})", marker, entry.label(), date),
            None => println!("{} {}", marker, entry.label()),
        }
    }
    eprintln!("{} entries", entries.len());
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let paths = AppPaths::resolve(cli.data_dir.clone())?;
    let mut settings = Settings::load(&paths.settings_file());
    if let Some(ttl) = cli.cache_ttl {
        settings.cache_ttl_secs = ttl;
    }
    debug!("Using data dir {}", paths.data_dir.display());

    let database = Database::open(&paths.database_file())
        .with_context(|| format!("opening {}", paths.database_file().display()))?;
    let transport = Arc::new(
        HttpTransport::new(&settings.user_agent, settings.request_timeout())
            .context("building HTTP client")?,
    );
    let provider: Arc<dyn ComicProvider> = Arc::new(XkcdProvider::new(
        transport,
        settings.navigation(),
        settings.max_redirects,
    ));
    let registry = ArchiveRegistry::new(database.clone(), settings.cache_ttl_secs, Arc::new(SystemClock));
    let viewer = ComicViewer::new(provider, database, &registry, Arc::new(TerminalProgress));

    let mut app = App {
        viewer,
        settings,
        paths,
        watcher: QuitWatcher::new(),
    };
    app.run(cli.command.unwrap_or(Command::Start))
}
