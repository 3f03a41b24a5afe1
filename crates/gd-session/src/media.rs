//! Background fetches of inline images, audio and downloads.

use crate::DocumentSession;
use gd_core::BrowserError;
use gd_core::BrowserResult;
use gd_document::LinkFlags;
use gd_document::LinkId;
use gd_document::MediaFlags;
use gd_document::MediaKind;
use gd_ipc::SessionEvent;
use gd_net::GemUrl;
use gd_net::Request;
use gd_net::RequestId;
use gd_net::mime::extension_for;
use gd_net::url::absolute_url;
use gd_storage::download_file_name;
use std::path::PathBuf;

/// One in-flight or completed media fetch, keyed by link.
#[derive(Debug)]
pub(crate) struct MediaRequest {
    pub(crate) link: LinkId,
    pub(crate) request: Request,
    /// Content filters may run on the result; off for explicit downloads.
    pub(crate) apply_filters: bool,
}

/// At most one request per link.
#[derive(Debug, Default)]
pub(crate) struct MediaRequests {
    items: Vec<MediaRequest>,
}

impl MediaRequests {
    pub(crate) fn find(&self, link: LinkId) -> Option<&MediaRequest> {
        self.items.iter().find(|item| item.link == link)
    }

    pub(crate) fn find_by_id(&self, id: RequestId) -> Option<&MediaRequest> {
        self.items.iter().find(|item| item.request.id() == id)
    }

    pub(crate) fn contains_id(&self, id: RequestId) -> bool {
        self.find_by_id(id).is_some()
    }

    fn push(&mut self, item: MediaRequest) {
        self.items.push(item);
    }

    pub(crate) fn remove(&mut self, link: LinkId) -> Option<MediaRequest> {
        let index = self.items.iter().position(|item| item.link == link)?;
        Some(self.items.remove(index))
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn links(&self) -> Vec<LinkId> {
        self.items.iter().map(|item| item.link).collect()
    }
}

/// Transfer state of a media link, for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaProgress {
    pub bytes: usize,
    pub finished: bool,
}

impl DocumentSession {
    /// Starts fetching the content behind `link`.
    ///
    /// Returns `false` when the link already has a request or none could be
    /// started.
    pub(crate) fn request_media(&mut self, link: LinkId, apply_filters: bool) -> bool {
        if self.media_requests.find(link).is_some() {
            return false;
        }
        let Some(target) = self.doc.link_url(link) else {
            return false;
        };
        let url = absolute_url(&self.persisted.url, target);
        let id = self.next_request_id();
        let transport = self.context.transports.transport_for(&url);
        let mut request = Request::new(id, &url, transport, self.notice_tx.clone());
        if let Err(error) = request.submit() {
            tracing::warn!(%error, %url, link, "media request failed to start");
            self.emit(SessionEvent::Message {
                title: "MEDIA REQUEST FAILED".to_owned(),
                text: error.message.clone(),
            });
            return false;
        }
        tracing::debug!(id = id.0, %url, link, "media request started");
        self.media_requests.push(MediaRequest {
            link,
            request,
            apply_filters,
        });
        self.invalidate_link(link);
        true
    }

    fn is_download_request(&self, link: LinkId) -> bool {
        self.doc.media().find_download_for(link).is_some()
    }

    pub(crate) fn on_media_updated(&mut self, id: RequestId) {
        let Some(item) = self.media_requests.find_by_id(id) else {
            return;
        };
        let link = item.link;
        let (status, meta, body) = {
            let response = item.request.lock_response();
            (response.status, response.meta.clone(), response.body.clone())
        };
        item.request.acknowledge_update();

        if status.is_success() && (self.is_download_request(link) || meta.starts_with("audio/")) {
            let changed = self.doc.media_mut().set_data(
                link,
                Some(&meta),
                &body,
                MediaFlags::PARTIAL.union(MediaFlags::ALLOW_HIDE),
            );
            if changed {
                self.redo_layout();
            }
            self.update_visible();
            self.invalidate();
        }
        self.invalidate_link(link);
    }

    pub(crate) fn on_media_finished(&mut self, id: RequestId) {
        let Some(item) = self.media_requests.find_by_id(id) else {
            return;
        };
        let link = item.link;
        let response = item.request.snapshot();
        let status = response.status;

        if status.is_success() {
            let presentable = self.is_download_request(link)
                || response.meta.starts_with("image/")
                || response.meta.starts_with("audio/");
            if presentable {
                self.doc.media_mut().set_data(
                    link,
                    Some(&response.meta),
                    &response.body,
                    MediaFlags::ALLOW_HIDE,
                );
                self.redo_layout();
                self.update_visible();
                self.invalidate();
            }
            tracing::debug!(id = id.0, link, bytes = response.body.len(), "media finished");
        } else {
            let error = status.error();
            tracing::warn!(id = id.0, link, status = status.as_i32(), "media request failed");
            self.emit(SessionEvent::Message {
                title: error.title.to_owned(),
                text: error.info.to_owned(),
            });
            self.media_requests.remove(link);
        }
        self.invalidate_link(link);
    }

    /// Stops and forgets the fetch for `link`.
    pub fn cancel_media(&mut self, link: LinkId) -> bool {
        let Some(item) = self.media_requests.remove(link) else {
            return false;
        };
        item.request.cancel();
        self.invalidate_link(link);
        true
    }

    /// Fetches `link` as a download shown below the link.
    pub fn download_link(&mut self, link: LinkId) -> bool {
        let Some(target) = self.doc.link_url(link) else {
            return false;
        };
        let url = absolute_url(&self.persisted.url, target);
        self.doc.media_mut().set_download_url(link, &url);
        let started = self.request_media(link, false);
        self.redo_layout();
        self.update_visible();
        self.invalidate();
        started
    }

    /// Starts loading the first visible image link that has no content yet.
    pub(crate) fn fetch_next_unfetched_image(&mut self) -> bool {
        let candidates: Vec<LinkId> = self
            .visible
            .links
            .iter()
            .filter_map(|handle| self.doc.run(*handle))
            .filter(|run| {
                run.link_id != 0 && run.media_kind == MediaKind::None && !run.is_decoration()
            })
            .map(|run| run.link_id)
            .collect();
        for link in candidates {
            let flags = self.doc.link_flags(link);
            if flags.is_media_link()
                && flags.contains(LinkFlags::IMAGE_EXT)
                && !flags.intersects(LinkFlags::CONTENT.union(LinkFlags::PERMANENT))
                && self.request_media(link, true)
            {
                return true;
            }
        }
        false
    }

    pub fn media_progress(&self, link: LinkId) -> Option<MediaProgress> {
        let item = self.media_requests.find(link)?;
        Some(MediaProgress {
            bytes: item.request.body_size(),
            finished: item.request.is_finished(),
        })
    }

    pub fn media_request_count(&self) -> usize {
        self.media_requests.len()
    }

    pub fn media_request_links(&self) -> Vec<LinkId> {
        self.media_requests.links()
    }

    /// Whether content filters were enabled for the request of `link`.
    pub fn media_filters_enabled(&self, link: LinkId) -> Option<bool> {
        self.media_requests.find(link).map(|item| item.apply_filters)
    }

    /// Writes the fetched content of `link` to the downloads directory.
    pub fn save_media(&mut self, link: LinkId) -> BrowserResult<PathBuf> {
        let Some(item) = self.media_requests.find(link) else {
            return Err(BrowserError::new(
                "session.media_not_requested",
                format!("link {link} has no fetched content"),
            ));
        };
        if !item.request.is_finished() {
            return Err(BrowserError::new(
                "session.media_incomplete",
                format!("content of link {link} is still downloading"),
            ));
        }
        let response = item.request.snapshot();
        let basename = GemUrl::parse(item.request.url())
            .ok()
            .and_then(|url| url.basename())
            .unwrap_or_default();
        let essence = response.meta.split(';').next().unwrap_or("").trim().to_owned();
        let name = download_file_name(&basename, Some(extension_for(&essence)));
        self.save_bytes(&name, &response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::MediaRequests;

    #[test]
    fn empty_requests_have_no_links() {
        let mut requests = MediaRequests::default();
        assert_eq!(requests.len(), 0);
        assert!(requests.links().is_empty());
        assert!(requests.remove(1).is_none());
        requests.clear();
        assert!(requests.find(1).is_none());
    }
}
