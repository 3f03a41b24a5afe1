//! URL changes, history movement, page information and persisted state.

use crate::DocumentSession;
use crate::RequestState;
use gd_core::BrowserError;
use gd_core::BrowserResult;
use gd_core::Int2;
use gd_core::Rect;
use gd_ipc::SessionEvent;
use gd_ipc::TabMode;
use gd_net::GemUrl;
use gd_net::url::percent_encode;
use gd_security::CertFlags;
use gd_storage::PersistedSession;
use std::fmt::Write as _;

/// Text and available actions of the page information dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub text: String,
    pub can_trust: bool,
    pub have_fingerprint: bool,
}

fn strip_fragment(url: &str) -> &str {
    url.split_once('#').map_or(url, |(base, _)| base)
}

fn url_user(url: &str) -> String {
    GemUrl::parse(url)
        .map(|parsed| parsed.username().to_owned())
        .unwrap_or_default()
}

impl DocumentSession {
    /// Opens `url` in this tab as a new history entry.
    pub fn set_url(&mut self, url: &str) {
        self.open_url(url, 0);
    }

    pub(crate) fn open_url(&mut self, url: &str, redirects: u8) {
        let url = strip_fragment(url).to_owned();
        tracing::info!(%url, redirects, "navigating");
        self.persisted.history.add_url(&url);
        self.redirect_count = redirects;
        self.init_norm_scroll_y = 0.0;
        self.set_url_from_cache(&url, false);
    }

    /// Shows `url`, reusing a cached response from history when allowed.
    pub fn set_url_from_cache(&mut self, url: &str, from_cache: bool) {
        self.link_keys.visible = false;
        self.persisted.url = strip_fragment(url).to_owned();
        self.title_user = url_user(&self.persisted.url);
        if !from_cache || !self.update_from_history() {
            self.fetch();
        }
    }

    fn cancel_request_for_navigation(&mut self) {
        if let Some(request) = self.request.take() {
            request.cancel();
            self.emit(SessionEvent::RequestCancelled {
                url: self.persisted.url.clone(),
            });
        }
    }

    /// Returns to the previous history entry.
    pub fn navigate_back(&mut self) -> bool {
        self.cancel_request_for_navigation();
        let Some(entry) = self.persisted.history.go_back() else {
            return false;
        };
        let (url, norm) = (entry.url.clone(), entry.norm_scroll_y);
        self.emit(SessionEvent::NavigateBack);
        self.redirect_count = 0;
        self.init_norm_scroll_y = norm;
        self.set_url_from_cache(&url, true);
        true
    }

    pub fn navigate_forward(&mut self) -> bool {
        let Some(entry) = self.persisted.history.go_forward() else {
            return false;
        };
        let (url, norm) = (entry.url.clone(), entry.norm_scroll_y);
        self.emit(SessionEvent::NavigateForward);
        self.redirect_count = 0;
        self.init_norm_scroll_y = norm;
        self.set_url_from_cache(&url, true);
        true
    }

    /// Opens the directory containing the current page.
    pub fn navigate_parent(&mut self) -> bool {
        let Some(parent) = GemUrl::parse(&self.persisted.url)
            .ok()
            .and_then(|url| url.parent())
        else {
            return false;
        };
        let url = parent.as_str().to_owned();
        self.emit(SessionEvent::NavigateParent { url: url.clone() });
        self.set_url(&url);
        true
    }

    /// Opens `scheme://host[:port]/` of the current page.
    pub fn navigate_root(&mut self) -> bool {
        let Ok(current) = GemUrl::parse(&self.persisted.url) else {
            return false;
        };
        let url = format!("{}/", current.root());
        self.emit(SessionEvent::NavigateRoot { url: url.clone() });
        self.set_url(&url);
        true
    }

    /// Drops the running fetch; an unfinished page falls back to the
    /// previous entry.
    pub fn cancel(&mut self) -> bool {
        let Some(request) = self.request.take() else {
            return false;
        };
        request.cancel();
        tracing::debug!(url = %self.persisted.url, "request cancelled");
        self.emit(SessionEvent::RequestCancelled {
            url: self.persisted.url.clone(),
        });
        if self.state != RequestState::Ready {
            self.state = RequestState::Ready;
            self.navigate_back();
        }
        true
    }

    /// Fetches the current URL again, keeping the relative scroll position.
    pub fn reload(&mut self) {
        self.init_norm_scroll_y = self.norm_scroll_pos();
        self.fetch();
    }

    /// Reloads when the auto-reload interval has elapsed since the page was
    /// received. Returns whether a reload started.
    pub fn autoreload_check(&mut self) -> bool {
        let interval_ms = self.persisted.reload_interval.seconds() * 1000;
        if interval_ms == 0 || self.request.is_some() {
            return false;
        }
        let now = self.now();
        let due = self
            .source_time
            .is_none_or(|received| now.saturating_sub(received) >= interval_ms);
        if due {
            tracing::debug!(url = %self.persisted.url, "auto-reloading");
            self.reload();
        }
        due
    }

    /// Sends the answer to an input prompt as the query of the current URL.
    pub fn submit_input(&mut self, value: &str) {
        let base = self
            .persisted
            .url
            .split_once('?')
            .map_or(self.persisted.url.as_str(), |(base, _)| base);
        let url = format!("{base}?{}", percent_encode(value));
        self.open_link(&url, TabMode::Current);
    }

    pub fn cancel_input(&mut self) -> bool {
        self.navigate_back()
    }

    pub fn page_info(&self) -> PageInfo {
        let cached_meta = self
            .persisted
            .history
            .find_url(&self.persisted.url)
            .and_then(|recent| recent.cached_response.as_ref())
            .map(|response| response.meta.as_str());
        let meta = cached_meta.unwrap_or(&self.source_mime);
        let bytes = self.source_content.len();

        let mut text = String::new();
        if self.source_header.is_empty() {
            let _ = writeln!(text, "{meta}\n{bytes} bytes");
        } else {
            let _ = writeln!(text, "{}", self.source_header);
            if bytes > 0 {
                let _ = writeln!(text, "{bytes} bytes");
            }
        }
        text.push('\n');
        text.push_str(&self.cert.status_text());
        PageInfo {
            text,
            can_trust: self.cert.can_trust(),
            have_fingerprint: self.cert.have_fingerprint(),
        }
    }

    /// Asks the application to show the page information dialog.
    pub fn show_page_info(&mut self) {
        let info = self.page_info();
        self.emit(SessionEvent::PageInfoRequested {
            text: info.text,
            can_trust: info.can_trust,
            have_fingerprint: info.have_fingerprint,
        });
    }

    /// Pins the server certificate of the current host.
    pub fn trust_certificate(&mut self) -> BrowserResult<()> {
        if !self.cert.can_trust() {
            return Err(BrowserError::new(
                "session.trust_not_allowed",
                format!("the certificate of `{}` cannot be trusted", self.persisted.url),
            ));
        }
        let host = GemUrl::parse(&self.persisted.url)?.host().to_owned();
        self.context
            .trust_store()
            .set_trusted(&host, &self.cert.fingerprint, self.cert.expiry)?;
        self.cert.flags.insert(CertFlags::TRUSTED);
        self.update_trust(None);
        self.redo_layout();
        self.invalidate();
        self.update_visible();
        self.show_page_info();
        Ok(())
    }

    /// Certificate fingerprint as lower-case hex.
    pub fn copy_fingerprint(&self) -> Option<String> {
        self.cert
            .have_fingerprint()
            .then(|| self.cert.fingerprint_hex())
    }

    /// Document title and URL user, else the host, else "Blank Page".
    pub fn bookmark_title(&self) -> String {
        let mut parts = Vec::new();
        if let Some(title) = self.doc.title().filter(|title| !title.is_empty()) {
            parts.push(title);
        }
        if !self.title_user.is_empty() {
            parts.push(self.title_user.clone());
        }
        if parts.is_empty() {
            let host = GemUrl::parse(&self.persisted.url)
                .map(|url| url.host().to_owned())
                .unwrap_or_default();
            if !host.is_empty() {
                parts.push(host);
            }
        }
        if parts.is_empty() {
            parts.push("Blank Page".to_owned());
        }
        parts.join(" \u{2014} ")
    }

    pub fn serialize_state(&self) -> BrowserResult<Vec<u8>> {
        self.persisted.encode()
    }

    /// Restores URL, reload interval and history, then shows the page from
    /// the cache or fetches it.
    pub fn deserialize_state(&mut self, payload: &[u8]) -> BrowserResult<()> {
        self.persisted = PersistedSession::decode(payload)?;
        self.title_user = url_user(&self.persisted.url);
        tracing::debug!(url = %self.persisted.url, entries = self.persisted.history.len(), "session restored");
        if !self.update_from_history() && !self.persisted.url.is_empty() {
            self.fetch();
        }
        Ok(())
    }

    /// New viewport size; the first visible line stays where it was.
    pub fn resize(&mut self, width: i32, height: i32) {
        let anchor = self
            .visible
            .first
            .and_then(|handle| self.doc.run(handle))
            .map(|run| (run.text.start, self.visible_range().start - run.bounds.top()));

        self.viewport = Int2::new(width.max(1), height.max(1));
        self.vis_buf.resize(self.viewport.y);
        self.click
            .set_bounds(Rect::new(0, 0, self.viewport.x, self.viewport.y));
        self.link_keys.visible = false;
        self.reset_wide_runs();
        let doc_width = self.document_width();
        self.doc.set_width(doc_width);
        self.document_runs_invalidated();
        tracing::debug!(width, height, doc_width, "viewport resized");

        let top = anchor.and_then(|(loc, offset)| {
            self.doc
                .find_run_at_source(loc)
                .and_then(|handle| self.doc.run(handle))
                .map(|run| run.bounds.top() + offset)
        });
        match top {
            Some(top) => self.scroll_to(top + self.config.line_height, false),
            None => self.scroll(0),
        }
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::strip_fragment;
    use super::url_user;

    #[test]
    fn fragments_are_not_part_of_the_page() {
        assert_eq!(strip_fragment("gemini://a/b#top"), "gemini://a/b");
        assert_eq!(strip_fragment("gemini://a/b"), "gemini://a/b");
    }

    #[test]
    fn user_comes_from_the_url() {
        assert_eq!(url_user("gemini://alice@example.org/"), "alice");
        assert_eq!(url_user("gemini://example.org/"), "");
        assert_eq!(url_user("not a url"), "");
    }
}
