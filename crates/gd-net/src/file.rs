//! Built-in transports: local files, internal `about:` pages and a refusal
//! for schemes without a transport.

use crate::local::LocalHub;
use crate::mime::guess_from_extension;
use crate::request::ResponseFeed;
use crate::request::Transport;
use crate::request::TransportFactory;
use crate::status::StatusCode;
use crate::url::GemUrl;
use crate::url::percent_decode;
use gd_core::BrowserError;
use gd_core::BrowserResult;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::thread;

const READ_CHUNK_BYTES: usize = 16 * 1024;

const ABOUT_BLANK: &str = "";
const ABOUT_HELP: &str = "# Help\n\
Scroll with the wheel or arrow keys. Press a link's key to open it.\n\
=> about:blank Blank page\n";

/// Streams a file from disk on a worker thread.
#[derive(Debug, Default)]
pub struct FileTransport;

impl Transport for FileTransport {
    fn start(&mut self, url: &str, feed: ResponseFeed) -> BrowserResult<()> {
        let path = file_path(url);
        let name = format!("gd-file-{}", feed.id().0);
        thread::Builder::new()
            .name(name)
            .spawn(move || stream_file(path, &feed))
            .map(|_| ())
            .map_err(|error| BrowserError::io("net.file.spawn_failed", "file reader", &error))
    }
}

fn file_path(url: &str) -> PathBuf {
    match GemUrl::parse(url) {
        Ok(parsed) => PathBuf::from(percent_decode(parsed.path())),
        Err(_) => PathBuf::from(url.trim_start_matches("file://")),
    }
}

fn stream_file(path: PathBuf, feed: &ResponseFeed) {
    let mut file = match File::open(&path) {
        Ok(file) => file,
        Err(error) => {
            tracing::debug!(path = %path.display(), %error, "cannot open file");
            feed.fail(StatusCode::FAILED_TO_OPEN_FILE, &path.display().to_string());
            return;
        }
    };
    let mime = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or("application/octet-stream", guess_from_extension);
    feed.set_header(StatusCode::SUCCESS, mime);

    let mut chunk = vec![0_u8; READ_CHUNK_BYTES];
    loop {
        if feed.is_cancelled() {
            return;
        }
        match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => feed.append_body(&chunk[..read]),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "file read failed");
                break;
            }
        }
    }
    feed.finish();
}

/// Serves built-in `about:` pages synchronously.
#[derive(Debug, Default)]
pub struct AboutTransport;

impl Transport for AboutTransport {
    fn start(&mut self, url: &str, feed: ResponseFeed) -> BrowserResult<()> {
        let page = url
            .split_once(':')
            .map_or("", |(_, rest)| rest)
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let body = match page {
            "blank" => ABOUT_BLANK,
            "help" => ABOUT_HELP,
            _ => {
                feed.fail(StatusCode::NOT_FOUND, "");
                return Ok(());
            }
        };
        feed.set_header(StatusCode::SUCCESS, "text/gemini; charset=utf-8");
        feed.append_body(body.as_bytes());
        feed.finish();
        Ok(())
    }
}

/// Finishes immediately with an unsupported-scheme status.
#[derive(Debug, Default)]
pub struct UnsupportedTransport;

impl Transport for UnsupportedTransport {
    fn start(&mut self, url: &str, feed: ResponseFeed) -> BrowserResult<()> {
        tracing::debug!(url, "no transport for scheme");
        feed.fail(StatusCode::UNSUPPORTED_SCHEME, url);
        Ok(())
    }
}

/// Routes `file:` and `about:` to the built-in transports and, when a hub
/// is attached, every other scheme to it.
#[derive(Debug, Clone, Default)]
pub struct DefaultTransports {
    remote: Option<LocalHub>,
}

impl DefaultTransports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote(hub: LocalHub) -> Self {
        Self { remote: Some(hub) }
    }
}

impl TransportFactory for DefaultTransports {
    fn transport_for(&self, url: &str) -> Box<dyn Transport> {
        let scheme = crate::url::scheme_of(url);
        match scheme.as_str() {
            "file" => Box::new(FileTransport),
            "about" => Box::new(AboutTransport),
            _ => match &self.remote {
                Some(hub) => hub.transport_for(url),
                None => Box::new(UnsupportedTransport),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DefaultTransports;
    use crate::request::NoticeKind;
    use crate::request::Request;
    use crate::request::RequestId;
    use crate::request::TransportFactory;
    use crate::request::notice_channel;
    use crate::status::StatusCode;
    use std::fs;
    use std::time::Duration;
    use std::time::SystemTime;
    use std::time::UNIX_EPOCH;

    fn fetch(url: &str) -> Request {
        let (sender, receiver) = notice_channel();
        let factory = DefaultTransports::new();
        let mut request = Request::new(RequestId(1), url, factory.transport_for(url), sender);
        assert!(request.submit().is_ok());
        loop {
            let notice = receiver.recv_timeout(Duration::from_secs(5));
            assert!(notice.is_ok());
            let notice = notice.unwrap_or_else(|_| unreachable!());
            if notice.kind == NoticeKind::Finished {
                break;
            }
            request.acknowledge_update();
        }
        request
    }

    #[test]
    fn reads_gemtext_file() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_nanos())
            .unwrap_or_default();
        let dir = std::env::temp_dir().join(format!("gd-net-file-{nanos}"));
        assert!(fs::create_dir_all(&dir).is_ok());
        let path = dir.join("page.gmi");
        assert!(fs::write(&path, "# Title\n").is_ok());

        let request = fetch(&format!("file://{}", path.display()));
        let response = request.snapshot();
        assert_eq!(response.status, StatusCode::SUCCESS);
        assert!(response.meta.starts_with("text/gemini"));
        assert_eq!(response.body, b"# Title\n");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_reports_failure() {
        let request = fetch("file:///definitely/not/here.gmi");
        assert_eq!(request.status(), StatusCode::FAILED_TO_OPEN_FILE);
    }

    #[test]
    fn about_and_unknown_schemes() {
        let blank = fetch("about:blank");
        assert_eq!(blank.status(), StatusCode::SUCCESS);
        assert_eq!(blank.body_size(), 0);
        let unknown = fetch("gemini://example/");
        assert_eq!(unknown.status(), StatusCode::UNSUPPORTED_SCHEME);
    }
}
