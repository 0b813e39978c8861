use chrono::NaiveDate;
use reqwest::Url;

/// Which comic to load: a concrete id or whatever the source publishes last.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComicRef {
    Latest,
    Id(String),
}

impl ComicRef {
    pub fn id(id: impl Into<String>) -> Self {
        ComicRef::Id(id.into())
    }
}

impl std::fmt::Display for ComicRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComicRef::Latest => write!(f, "latest"),
            ComicRef::Id(id) => write!(f, "#{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComicRecord {
    pub id: String,
    pub title: String,
    pub alt_text: String,
    pub image: Url,
    pub link: Option<Url>, // larger image or external page attached to the comic
    pub prev_id: String,
    pub next_id: String,
    pub bookmarked: bool,
}

impl ComicRecord {
    pub fn has_alt_text(&self) -> bool {
        !self.alt_text.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub id: String,
    pub title: String,
    pub published: Option<NaiveDate>,
    pub bookmarked: bool,
}

impl ArchiveEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            published: None,
            bookmarked: false,
        }
    }

    /// "id - title", the way archive rows are listed.
    pub fn label(&self) -> String {
        format!("{} - {}", self.id, self.title)
    }
}

impl From<&ComicRecord> for ArchiveEntry {
    fn from(comic: &ComicRecord) -> Self {
        Self {
            id: comic.id.clone(),
            title: comic.title.clone(),
            published: None,
            bookmarked: comic.bookmarked,
        }
    }
}
