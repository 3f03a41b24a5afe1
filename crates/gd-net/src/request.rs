//! Background request handle shared between a transport and its owner.

use crate::status::StatusCode;
use gd_core::BrowserResult;
use gd_security::TrustSnapshot;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc;

/// Identifier the owner assigns to each request it creates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

/// Status line, metadata, body and certificate facts of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GmResponse {
    pub status: StatusCode,
    pub meta: String,
    pub body: Vec<u8>,
    pub cert: TrustSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Updated,
    Finished,
}

/// Progress notification delivered to the owning thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestNotice {
    pub id: RequestId,
    pub kind: NoticeKind,
}

pub type NoticeSender = mpsc::Sender<RequestNotice>;
pub type NoticeReceiver = mpsc::Receiver<RequestNotice>;

pub fn notice_channel() -> (NoticeSender, NoticeReceiver) {
    mpsc::channel()
}

#[derive(Debug, Default)]
struct Shared {
    response: Mutex<GmResponse>,
    finished: AtomicBool,
    cancelled: AtomicBool,
    update_pending: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, GmResponse> {
        match self.response.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Writer side handed to a transport.
///
/// Every method is a no-op once the owner has cancelled the request, so a
/// transport that is still winding down never reaches the owner again.
#[derive(Debug, Clone)]
pub struct ResponseFeed {
    id: RequestId,
    shared: Arc<Shared>,
    notices: NoticeSender,
}

impl ResponseFeed {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    pub fn set_header(&self, status: StatusCode, meta: &str) {
        if self.is_cancelled() {
            return;
        }
        {
            let mut response = self.shared.lock();
            response.status = status;
            response.meta = meta.to_owned();
        }
        self.notify_updated();
    }

    pub fn set_certificate(&self, cert: TrustSnapshot) {
        if self.is_cancelled() {
            return;
        }
        self.shared.lock().cert = cert;
    }

    pub fn append_body(&self, bytes: &[u8]) {
        if self.is_cancelled() {
            return;
        }
        self.shared.lock().body.extend_from_slice(bytes);
        self.notify_updated();
    }

    pub fn finish(&self) {
        if self.is_cancelled() || self.shared.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.notices.send(RequestNotice {
            id: self.id,
            kind: NoticeKind::Finished,
        });
    }

    /// Header-only response that completes immediately.
    pub fn fail(&self, status: StatusCode, meta: &str) {
        self.set_header(status, meta);
        self.finish();
    }

    /// At most one unconsumed update notice is queued at a time.
    fn notify_updated(&self) {
        if self.shared.update_pending.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.notices.send(RequestNotice {
            id: self.id,
            kind: NoticeKind::Updated,
        });
    }
}

/// Produces the bytes of a request on behalf of [`Request`].
pub trait Transport: Send {
    fn start(&mut self, url: &str, feed: ResponseFeed) -> BrowserResult<()>;
}

/// Picks the transport for a URL.
pub trait TransportFactory: Send + Sync {
    fn transport_for(&self, url: &str) -> Box<dyn Transport>;
}

/// Owner side of one fetch.
pub struct Request {
    id: RequestId,
    url: String,
    shared: Arc<Shared>,
    notices: NoticeSender,
    transport: Option<Box<dyn Transport>>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl Request {
    pub fn new(
        id: RequestId,
        url: &str,
        transport: Box<dyn Transport>,
        notices: NoticeSender,
    ) -> Self {
        Self {
            id,
            url: url.to_owned(),
            shared: Arc::new(Shared::default()),
            notices,
            transport: Some(transport),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Hands the request to its transport; a second call does nothing.
    pub fn submit(&mut self) -> BrowserResult<()> {
        let Some(mut transport) = self.transport.take() else {
            return Ok(());
        };
        let feed = ResponseFeed {
            id: self.id,
            shared: Arc::clone(&self.shared),
            notices: self.notices.clone(),
        };
        tracing::debug!(id = self.id.0, url = %self.url, "submitting request");
        transport.start(&self.url, feed)
    }

    pub fn status(&self) -> StatusCode {
        self.shared.lock().status
    }

    pub fn meta(&self) -> String {
        self.shared.lock().meta.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    pub fn body_size(&self) -> usize {
        self.shared.lock().body.len()
    }

    /// Exclusive access to the live response; hold only while reading.
    pub fn lock_response(&self) -> MutexGuard<'_, GmResponse> {
        self.shared.lock()
    }

    /// Copy of the response as received so far.
    pub fn snapshot(&self) -> GmResponse {
        self.shared.lock().clone()
    }

    /// Re-arms the update notice after the owner has processed one.
    pub fn acknowledge_update(&self) {
        self.shared.update_pending.store(false, Ordering::Release);
    }

    pub fn cancel(&self) {
        if !self.shared.cancelled.swap(true, Ordering::AcqRel) {
            tracing::debug!(id = self.id.0, url = %self.url, "request cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        self.shared.cancelled.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::NoticeKind;
    use super::Request;
    use super::RequestId;
    use super::ResponseFeed;
    use super::Transport;
    use super::notice_channel;
    use crate::status::StatusCode;
    use gd_core::BrowserResult;
    use std::sync::Arc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture {
        feed: Arc<Mutex<Option<ResponseFeed>>>,
    }

    impl Transport for Capture {
        fn start(&mut self, _url: &str, feed: ResponseFeed) -> BrowserResult<()> {
            match self.feed.lock() {
                Ok(mut slot) => *slot = Some(feed),
                Err(poisoned) => *poisoned.into_inner() = Some(feed),
            }
            Ok(())
        }
    }

    fn started() -> (Request, ResponseFeed, super::NoticeReceiver) {
        let (sender, receiver) = notice_channel();
        let capture = Capture::default();
        let slot = Arc::clone(&capture.feed);
        let mut request = Request::new(RequestId(7), "gemini://x/", Box::new(capture), sender);
        assert!(request.submit().is_ok());
        let feed = slot
            .lock()
            .unwrap_or_else(|_| unreachable!())
            .clone()
            .unwrap_or_else(|| unreachable!());
        (request, feed, receiver)
    }

    #[test]
    fn updates_coalesce_until_acknowledged() {
        let (request, feed, receiver) = started();
        feed.set_header(StatusCode::SUCCESS, "text/gemini");
        feed.append_body(b"# a");
        feed.append_body(b"\n");
        let notices: Vec<_> = receiver.try_iter().collect();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Updated);
        assert_eq!(request.body_size(), 4);

        request.acknowledge_update();
        feed.append_body(b"more");
        assert_eq!(receiver.try_iter().count(), 1);
    }

    #[test]
    fn finish_is_reported_once() {
        let (request, feed, receiver) = started();
        feed.fail(StatusCode::NOT_FOUND, "missing");
        feed.finish();
        let kinds: Vec<_> = receiver.try_iter().map(|notice| notice.kind).collect();
        assert_eq!(kinds, vec![NoticeKind::Updated, NoticeKind::Finished]);
        assert!(request.is_finished());
        assert_eq!(request.status(), StatusCode::NOT_FOUND);
        assert_eq!(request.meta(), "missing");
    }

    #[test]
    fn cancelled_request_stays_silent() {
        let (request, feed, receiver) = started();
        request.cancel();
        feed.append_body(b"late");
        feed.finish();
        assert_eq!(receiver.try_iter().count(), 0);
        assert_eq!(request.body_size(), 0);
        drop(request);
        assert!(feed.is_cancelled());
    }
}
