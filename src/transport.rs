use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::Url;
use std::io::{BufRead, Read, Write};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::{ComicError, Result};

/// Status line, redirect target and an unread body.
pub struct RawResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: Box<dyn BufRead + Send>,
}

/// One request, no redirect following. Redirects are handled by
/// [`open_following_redirects`] so the hop count stays bounded.
pub trait Transport: Send + Sync {
    fn open(&self, url: &str) -> Result<RawResponse>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(Policy::none())
            .build()?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> Result<RawResponse> {
        debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(RawResponse {
            status,
            location,
            body: Box::new(std::io::BufReader::new(response)),
        })
    }
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

fn resolve(base: &str, location: &str) -> Result<String> {
    let base = Url::parse(base).map_err(|e| ComicError::Network(format!("Malformed URL: {}", e)))?;
    base.join(location)
        .map(|url| url.to_string())
        .map_err(|e| ComicError::Network(format!("Invalid redirect: {}", e)))
}

/// Open `url`, following at most `max_redirects` hops.
///
/// 404 maps to [`ComicError::NotFound`]; any other non-2xx status is a
/// network failure.
pub fn open_following_redirects(
    transport: &dyn Transport,
    url: &str,
    max_redirects: u32,
) -> Result<RawResponse> {
    let mut current = url.to_string();
    let mut redirects = 0;

    loop {
        let response = transport.open(&current)?;
        match response.status {
            status if is_redirect(status) => {
                if redirects >= max_redirects {
                    warn!("Giving up on {} after {} redirects", url, redirects);
                    return Err(ComicError::Network("Too many HTTP redirects".into()));
                }
                let location = response
                    .location
                    .ok_or_else(|| ComicError::Network("Invalid redirect".into()))?;
                current = resolve(&current, &location)?;
                redirects += 1;
                debug!("Redirect {} -> {}", redirects, current);
            }
            404 => return Err(ComicError::NotFound(current)),
            200..=299 => return Ok(response),
            status => {
                return Err(ComicError::Network(format!(
                    "HTTP {} from {}",
                    status, current
                )))
            }
        }
    }
}

/// Stream the body of `url` line by line, checking `cancel` before each line.
pub fn fetch_lines<F>(
    transport: &dyn Transport,
    url: &str,
    max_redirects: u32,
    cancel: &CancelToken,
    mut on_line: F,
) -> Result<()>
where
    F: FnMut(&str) -> Result<()>,
{
    cancel.check()?;
    let mut response = open_following_redirects(transport, url, max_redirects)?;

    let mut buf = Vec::new();
    loop {
        cancel.check()?;
        buf.clear();
        let read = response.body.read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        on_line(line.trim_end_matches(['\r', '\n']))?;
    }

    Ok(())
}

const CHUNK_SIZE: usize = 512;

/// Copy the body of `url` into `dest`, checking `cancel` before each chunk.
/// Returns the number of bytes written.
pub fn download_to(
    transport: &dyn Transport,
    url: &str,
    max_redirects: u32,
    cancel: &CancelToken,
    dest: &mut dyn Write,
) -> Result<u64> {
    cancel.check()?;
    let mut response = open_following_redirects(transport, url, max_redirects)?;

    let mut buf = [0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        cancel.check()?;
        let read = response.body.read(&mut buf)?;
        if read == 0 {
            break;
        }
        dest.write_all(&buf[..read])
            .map_err(|e| ComicError::StorageUnavailable(format!("writing download: {}", e)))?;
        written += read as u64;
    }
    dest.flush()
        .map_err(|e| ComicError::StorageUnavailable(format!("writing download: {}", e)))?;

    debug!("Downloaded {} bytes from {}", written, url);
    Ok(written)
}

/// Whether `url` answers 200 once redirects are followed. Any failure other
/// than cancellation counts as "no".
pub fn answers_ok(
    transport: &dyn Transport,
    url: &str,
    max_redirects: u32,
    cancel: &CancelToken,
) -> Result<bool> {
    cancel.check()?;
    match open_following_redirects(transport, url, max_redirects) {
        Ok(response) => Ok(response.status == 200),
        Err(ComicError::Cancelled) => Err(ComicError::Cancelled),
        Err(e) => {
            debug!("{} is not available: {}", url, e);
            Ok(false)
        }
    }
}

/// Whole body as text, one `\n` per line.
pub fn fetch_text(
    transport: &dyn Transport,
    url: &str,
    max_redirects: u32,
    cancel: &CancelToken,
) -> Result<String> {
    let mut text = String::new();
    fetch_lines(transport, url, max_redirects, cancel, |line| {
        text.push_str(line);
        text.push('\n');
        Ok(())
    })?;
    Ok(text)
}


#[cfg(test)]
mod tests {
    use super::testing::CannedTransport;
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn follows_a_bounded_number_of_redirects() {
        let transport = CannedTransport::new()
            .redirect("http://a.test/", 301, "https://a.test/")
            .redirect("https://a.test/", 302, "/home")
            .ok("https://a.test/home", "hello\nworld\n");

        let text = fetch_text(&transport, "http://a.test/", 2, &CancelToken::new()).unwrap();
        assert_eq!(text, "hello\nworld\n");

        let err = fetch_text(&transport, "http://a.test/", 1, &CancelToken::new()).unwrap_err();
        assert_eq!(err, ComicError::Network("Too many HTTP redirects".into()));
    }

    #[test]
    fn redirect_without_location_is_invalid() {
        let transport = CannedTransport::new().with("http://a.test/", 302, None, "");
        let err = fetch_text(&transport, "http://a.test/", 2, &CancelToken::new()).unwrap_err();
        assert_eq!(err, ComicError::Network("Invalid redirect".into()));
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        let transport = CannedTransport::new()
            .with("http://a.test/gone", 404, None, "")
            .with("http://a.test/broken", 500, None, "");

        let cancel = CancelToken::new();
        let missing = fetch_text(&transport, "http://a.test/gone", 2, &cancel).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        let broken = fetch_text(&transport, "http://a.test/broken", 2, &cancel).unwrap_err();
        assert_eq!(broken.kind(), ErrorKind::Network);
    }

    #[test]
    fn cancellation_stops_between_lines() {
        let transport = CannedTransport::new().ok("http://a.test/", "1\n2\n3\n4\n5\n");
        let cancel = CancelToken::new();
        let mut seen = Vec::new();

        let result = fetch_lines(&transport, "http://a.test/", 2, &cancel, |line| {
            seen.push(line.to_string());
            if seen.len() == 2 {
                cancel.cancel();
            }
            Ok(())
        });

        assert_eq!(result, Err(ComicError::Cancelled));
        assert_eq!(seen, vec!["1", "2"]);
    }

    #[test]
    fn already_cancelled_never_touches_the_network() {
        let transport = CannedTransport::new().ok("http://a.test/", "x");
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            fetch_text(&transport, "http://a.test/", 2, &cancel),
            Err(ComicError::Cancelled)
        );
        assert!(transport.requests().is_empty());
    }

    /// Collects what it is given and cancels after the first write.
    struct CancelAfterFirstWrite {
        cancel: CancelToken,
        written: Vec<u8>,
    }

    impl Write for CancelAfterFirstWrite {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            self.cancel.cancel();
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn downloads_the_whole_body() {
        let body = "x".repeat(1300);
        let transport = CannedTransport::new()
            .redirect("http://a.test/img", 302, "/img.png")
            .ok("http://a.test/img.png", &body);

        let mut dest = Vec::new();
        let written =
            download_to(&transport, "http://a.test/img", 2, &CancelToken::new(), &mut dest).unwrap();
        assert_eq!(written, 1300);
        assert_eq!(dest, body.into_bytes());
    }

    #[test]
    fn download_stops_between_chunks() {
        let transport = CannedTransport::new().ok("http://a.test/img.png", &"x".repeat(2000));
        let cancel = CancelToken::new();
        let mut dest = CancelAfterFirstWrite {
            cancel: cancel.clone(),
            written: Vec::new(),
        };

        let result = download_to(&transport, "http://a.test/img.png", 2, &cancel, &mut dest);
        assert_eq!(result, Err(ComicError::Cancelled));
        assert_eq!(dest.written.len(), CHUNK_SIZE);
    }

    #[test]
    fn answers_ok_only_for_200() {
        let transport = CannedTransport::new()
            .ok("http://a.test/page", "")
            .with("http://a.test/missing", 404, None, "")
            .with("http://a.test/empty", 204, None, "");
        let cancel = CancelToken::new();

        assert_eq!(answers_ok(&transport, "http://a.test/page", 2, &cancel), Ok(true));
        assert_eq!(answers_ok(&transport, "http://a.test/missing", 2, &cancel), Ok(false));
        assert_eq!(answers_ok(&transport, "http://a.test/empty", 2, &cancel), Ok(false));
        assert_eq!(answers_ok(&transport, "http://a.test/offline", 2, &cancel), Ok(false));

        cancel.cancel();
        assert_eq!(
            answers_ok(&transport, "http://a.test/page", 2, &cancel),
            Err(ComicError::Cancelled)
        );
    }
}
