use anyhow::{Context, Result};
use log::{info, warn};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::error::ComicError;
use crate::models::ComicRecord;
use crate::provider::ComicProvider;

/// What gets pasted or sent: title and page link.
pub fn share_text(provider: &dyn ComicProvider, comic: &ComicRecord) -> String {
    format!(
        "{} #{}: {} - {}",
        provider.display_name(),
        comic.id,
        comic.title,
        provider.comic_page_url(&comic.id)
    )
}

pub fn mailto_link(provider: &dyn ComicProvider, comic: &ComicRecord) -> String {
    let subject = format!("{}: {}", provider.display_name(), comic.title);
    let mut body = share_text(provider, comic);
    if comic.has_alt_text() {
        body.push_str("\n\n");
        body.push_str(&comic.alt_text);
    }
    format!(
        "mailto:?subject={}&body={}",
        urlencoding::encode(&subject),
        urlencoding::encode(&body)
    )
}

pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("opening clipboard")?;
    clipboard
        .set_text(text.to_string())
        .context("copying to clipboard")?;
    Ok(())
}

pub fn open_in_browser(url: &str) -> Result<()> {
    info!("Opening {}", url);
    open::that(url).with_context(|| format!("Failed to open URL: {}", url))?;
    Ok(())
}

/// `xkcd-attachment-353-python.png` and the like.
pub fn attachment_path(provider: &dyn ComicProvider, comic: &ComicRecord, dir: &Path) -> PathBuf {
    let file_name = comic
        .image
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("image");
    dir.join(format!(
        "{}-attachment-{}-{}",
        provider.source_id(),
        comic.id,
        file_name
    ))
}

/// Download the comic's image into `dir`. A partial file is removed when the
/// download fails or is cancelled.
pub fn save_image(
    provider: &dyn ComicProvider,
    comic: &ComicRecord,
    dir: &Path,
    cancel: &CancelToken,
) -> crate::error::Result<PathBuf> {
    cancel.check()?;
    let path = attachment_path(provider, comic, dir);
    let file = File::create(&path)
        .map_err(|e| ComicError::StorageUnavailable(format!("{}: {}", path.display(), e)))?;

    let mut writer = BufWriter::new(file);
    match provider.download(comic.image.as_str(), &mut writer, cancel) {
        Ok(bytes) => {
            info!("Saved {} bytes to {}", bytes, path.display());
            Ok(path)
        }
        Err(e) => {
            drop(writer);
            if let Err(remove_err) = fs::remove_file(&path) {
                warn!("Couldn't remove {}: {}", path.display(), remove_err);
            }
            Err(e)
        }
    }
}
