//! In-memory transport whose responses are fed by the caller.

use crate::request::ResponseFeed;
use crate::request::Transport;
use crate::request::TransportFactory;
use gd_core::BrowserResult;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

/// A request that reached the hub, waiting for the caller to answer it.
#[derive(Debug, Clone)]
pub struct PendingFeed {
    pub url: String,
    pub feed: ResponseFeed,
}

/// Collects started requests so a driver or test can answer them.
#[derive(Debug, Clone, Default)]
pub struct LocalHub {
    pending: Arc<Mutex<Vec<PendingFeed>>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PendingFeed>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Number of requests started and not yet taken.
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Removes and returns every pending request.
    pub fn take_all(&self) -> Vec<PendingFeed> {
        std::mem::take(&mut *self.lock())
    }

    /// Removes the oldest pending request.
    pub fn next(&self) -> Option<PendingFeed> {
        let mut pending = self.lock();
        if pending.is_empty() {
            return None;
        }
        Some(pending.remove(0))
    }
}

impl TransportFactory for LocalHub {
    fn transport_for(&self, _url: &str) -> Box<dyn Transport> {
        Box::new(LocalTransport { hub: self.clone() })
    }
}

struct LocalTransport {
    hub: LocalHub,
}

impl Transport for LocalTransport {
    fn start(&mut self, url: &str, feed: ResponseFeed) -> BrowserResult<()> {
        self.hub.lock().push(PendingFeed {
            url: url.to_owned(),
            feed,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LocalHub;
    use crate::request::Request;
    use crate::request::RequestId;
    use crate::request::TransportFactory;
    use crate::request::notice_channel;
    use crate::status::StatusCode;

    #[test]
    fn hub_hands_out_feeds_in_order() {
        let hub = LocalHub::new();
        let (sender, receiver) = notice_channel();
        let mut first = Request::new(
            RequestId(1),
            "gemini://a/",
            hub.transport_for("gemini://a/"),
            sender.clone(),
        );
        let mut second = Request::new(
            RequestId(2),
            "gemini://b/",
            hub.transport_for("gemini://b/"),
            sender,
        );
        assert!(first.submit().is_ok());
        assert!(second.submit().is_ok());
        assert_eq!(hub.pending_count(), 2);

        let pending = hub.next().unwrap_or_else(|| unreachable!());
        assert_eq!(pending.url, "gemini://a/");
        pending.feed.fail(StatusCode::GONE, "bye");
        assert!(first.is_finished());
        assert!(!second.is_finished());
        assert_eq!(receiver.try_iter().count(), 2);
        assert_eq!(hub.take_all().len(), 1);
    }
}
