//! Primary fetch: notice dispatch, response classification and the
//! document source that results from it.

use crate::DocumentSession;
use crate::RequestState;
use crate::error_page::error_page_source;
use gd_core::BrowserError;
use gd_core::BrowserResult;
use gd_document::LinkId;
use gd_document::MediaFlags;
use gd_document::SourceFormat;
use gd_ipc::SessionEvent;
use gd_ipc::TabMode;
use gd_net::ContentKind;
use gd_net::ContentType;
use gd_net::GemUrl;
use gd_net::GmResponse;
use gd_net::NoticeKind;
use gd_net::Request;
use gd_net::RequestNotice;
use gd_net::StatusCategory;
use gd_net::StatusCode;
use gd_net::mime::decode_text;
use gd_net::url::absolute_url;
use gd_net::url::scheme_of;
use gd_security::CertFlags;
use gd_security::TrustSnapshot;

/// Link id of the single link in an image or audio pseudo-document.
const MEDIA_PAGE_LINK: LinkId = 1;

impl DocumentSession {
    /// Handles every notice queued by the background fetches.
    ///
    /// Returns the number of notices consumed.
    pub fn poll(&mut self) -> usize {
        let notices: Vec<RequestNotice> = self.notices.try_iter().collect();
        for notice in &notices {
            self.dispatch_notice(*notice);
        }
        notices.len()
    }

    fn dispatch_notice(&mut self, notice: RequestNotice) {
        let primary = self.request.as_ref().map(Request::id);
        if primary == Some(notice.id) {
            match notice.kind {
                NoticeKind::Updated => self.on_request_updated(),
                NoticeKind::Finished => self.on_request_finished(),
            }
        } else if self.media_requests.contains_id(notice.id) {
            match notice.kind {
                NoticeKind::Updated => self.on_media_updated(notice.id),
                NoticeKind::Finished => self.on_media_finished(notice.id),
            }
        } else {
            tracing::warn!(id = notice.id.0, kind = ?notice.kind, "dropping notice of a released request");
        }
    }

    /// Releases any previous request and starts fetching the current URL.
    pub(crate) fn fetch(&mut self) {
        if let Some(previous) = self.request.take() {
            previous.cancel();
        }
        tracing::debug!(url = %self.persisted.url, "fetch started");
        self.emit(SessionEvent::RequestStarted {
            url: self.persisted.url.clone(),
        });
        self.media_requests.clear();
        self.cert.reset();
        self.link_keys.visible = false;
        self.state = RequestState::Fetching;

        match self.start_request() {
            Ok(request) => self.request = Some(request),
            Err(error) => {
                tracing::warn!(%error, url = %self.persisted.url, "request could not be started");
                self.emit(SessionEvent::Message {
                    title: "REQUEST FAILED".to_owned(),
                    text: error.message.clone(),
                });
                self.source_status = StatusCode::TEMPORARY_FAILURE;
                self.show_error_page(StatusCode::TEMPORARY_FAILURE, None);
            }
        }
    }

    fn start_request(&mut self) -> BrowserResult<Request> {
        let id = self.next_request_id();
        let url = self.persisted.url.clone();
        let transport = self.context.transports.transport_for(&url);
        let mut request = Request::new(id, &url, transport, self.notice_tx.clone());
        request.submit().map_err(|error| {
            BrowserError::new(
                "session.request_spawn_failed",
                format!("failed to start request for `{url}`: {}", error.message),
            )
        })?;
        Ok(request)
    }

    fn on_request_updated(&mut self) {
        let Some(request) = self.request.as_ref() else {
            return;
        };
        let id = request.id();
        let bytes = request.body_size();
        self.source_content = request.lock_response().body.clone();
        self.emit(SessionEvent::RequestUpdated {
            url: self.persisted.url.clone(),
            bytes: bytes as u64,
        });
        self.check_response();
        if let Some(request) = self.request.as_ref().filter(|request| request.id() == id) {
            request.acknowledge_update();
        }
    }

    fn on_request_finished(&mut self) {
        let Some(request) = self.request.as_ref() else {
            return;
        };
        let id = request.id();
        let response = request.snapshot();
        self.source_content = response.body.clone();
        self.source_header = if response.status.is_success() {
            String::new()
        } else {
            format!("{} {}", response.status.as_i32(), response.meta)
        };
        self.check_response();
        if self.request.as_ref().map(Request::id) != Some(id) {
            return;
        }

        let now = self.now();
        let height = self.doc.size().y as f32;
        self.scroll_y.init(self.init_norm_scroll_y * height, now);
        self.state = RequestState::Ready;
        let cacheable = scheme_of(&self.persisted.url) != "about"
            && response.meta.to_ascii_lowercase().starts_with("text/");
        if cacheable {
            self.persisted.history.set_cached_response(&response);
        }
        self.request = None;
        self.update_visible();

        tracing::info!(
            url = %self.persisted.url,
            status = response.status.as_i32(),
            bytes = response.body.len(),
            "request finished"
        );
        self.emit(SessionEvent::RequestFinished {
            url: self.persisted.url.clone(),
            status: response.status.as_i32(),
        });
        self.emit(SessionEvent::DocumentChanged {
            url: self.persisted.url.clone(),
        });
        if let Some(heading) = self.pending_goto_heading.take() {
            self.scroll_to_heading(&heading);
        }
    }

    /// Classifies the response received so far.
    fn check_response(&mut self) {
        let Some(request) = self.request.as_ref() else {
            return;
        };
        let status = request.status();
        if status == StatusCode::NONE {
            return;
        }
        let response = request.snapshot();

        match self.state {
            RequestState::Fetching => {
                self.state = RequestState::ReceivedPartial;
                self.update_trust(Some(&response.cert));
                let now = self.now();
                self.side_opacity.init(0.0, now);
                self.source_header = format!("{} {}", status.as_i32(), status.error().title);
                self.source_status = status;
                tracing::debug!(url = %self.persisted.url, status = status.as_i32(), "response header received");

                match status.category() {
                    StatusCategory::Input => self.request_input(&response),
                    StatusCategory::Success => {
                        self.scroll_y.init(0.0, now);
                        self.doc.reset();
                        self.document_runs_invalidated();
                        self.reset_wide_runs();
                        self.update_document(&response, true);
                    }
                    StatusCategory::Redirect => self.handle_redirect(&response.meta),
                    category => {
                        let code = if status.defined_error().is_some() {
                            status
                        } else {
                            match category {
                                StatusCategory::TemporaryFailure => StatusCode::TEMPORARY_FAILURE,
                                StatusCategory::PermanentFailure => StatusCode::PERMANENT_FAILURE,
                                _ => StatusCode::UNKNOWN_STATUS,
                            }
                        };
                        self.show_error_page(code, Some(&response.meta));
                    }
                }
            }
            RequestState::ReceivedPartial if status.is_success() => {
                self.update_document(&response, false);
            }
            RequestState::Blank | RequestState::ReceivedPartial | RequestState::Ready => {}
        }
    }

    fn request_input(&mut self, response: &GmResponse) {
        let parsed = GemUrl::parse(&self.persisted.url).ok();
        let host = parsed
            .as_ref()
            .map(|url| url.host().to_owned())
            .unwrap_or_default();
        let prompt = if response.meta.is_empty() {
            let path = parsed.as_ref().map_or("", |url| url.path());
            format!("Please enter input for {path}:")
        } else {
            response.meta.clone()
        };
        self.emit(SessionEvent::InputRequested {
            host,
            prompt,
            sensitive: response.status == StatusCode::SENSITIVE_INPUT,
        });
    }

    /// Same-scheme redirects are followed; anything else ends in an error page.
    fn handle_redirect(&mut self, meta: &str) {
        let meta = meta.trim();
        if meta.is_empty() {
            self.show_error_page(StatusCode::INVALID_REDIRECT, None);
            return;
        }
        let target = absolute_url(&self.persisted.url, meta);
        if self.redirect_count >= self.config.max_redirects {
            tracing::info!(url = %target, count = self.redirect_count, "too many redirects");
            self.show_error_page(StatusCode::TOO_MANY_REDIRECTS, Some(&target));
        } else if scheme_of(&target) == scheme_of(&self.persisted.url) {
            let redirects = self.redirect_count + 1;
            tracing::info!(from = %self.persisted.url, to = %target, redirects, "following redirect");
            self.request = None;
            self.emit(SessionEvent::Open {
                url: target.clone(),
                tab: TabMode::Current,
                redirects,
            });
            self.open_url(&target, redirects);
            return;
        } else {
            self.show_error_page(StatusCode::SCHEME_CHANGE_REDIRECT, Some(&target));
        }
        self.request = None;
    }

    /// Turns the response body into the document source.
    fn update_document(&mut self, response: &GmResponse, initial: bool) {
        if self.state == RequestState::Ready
            || response.status.category() == StatusCategory::Input
        {
            return;
        }
        let finished = self.request.as_ref().is_none_or(Request::is_finished);
        self.invalidate();
        self.source_mime.clear();
        self.source_time = Some(self.now());

        let mut source = String::from_utf8_lossy(&response.body).into_owned();
        if response.status.is_success() {
            let content = ContentType::parse(&response.meta);
            self.source_mime = content.essence.clone();
            match content.kind {
                ContentKind::Gemini | ContentKind::PlainText => {
                    let format = if content.kind == ContentKind::Gemini {
                        SourceFormat::Gemini
                    } else {
                        SourceFormat::PlainText
                    };
                    self.doc.set_format(format);
                    let charset = content.charset.as_deref().filter(|_| !content.is_utf8());
                    source = decode_text(&response.body, charset);
                }
                ContentKind::Image | ContentKind::Audio => {
                    self.doc.set_format(SourceFormat::Gemini);
                    let audio = content.kind == ContentKind::Audio;
                    let flags = if finished {
                        MediaFlags::empty()
                    } else {
                        MediaFlags::PARTIAL
                    };
                    if (audio && initial) || (!audio && finished) {
                        let title = GemUrl::parse(&self.persisted.url)
                            .ok()
                            .and_then(|url| url.basename())
                            .unwrap_or_else(|| if audio { "Audio" } else { "Image" }.to_owned());
                        source = format!("=> {} {}\n", self.persisted.url, title);
                        self.doc.media_mut().set_data(
                            MEDIA_PAGE_LINK,
                            Some(&response.meta),
                            &response.body,
                            flags,
                        );
                    } else if audio {
                        self.doc.media_mut().set_data(
                            MEDIA_PAGE_LINK,
                            Some(&response.meta),
                            &response.body,
                            flags,
                        );
                        let runs = self.visible.media.clone();
                        self.invalid.extend(runs);
                        return;
                    } else {
                        source.clear();
                    }
                }
                ContentKind::Unsupported => {
                    self.show_error_page(StatusCode::UNSUPPORTED_MIME_TYPE, Some(&response.meta));
                    return;
                }
            }
        }
        self.set_source(&source);
    }

    /// Replaces the document text and lays it out at the current width.
    pub(crate) fn set_source(&mut self, source: &str) {
        self.doc.set_url(&self.persisted.url);
        let width = self.document_width();
        self.doc.set_source(source, width);
        self.document_runs_invalidated();
        self.select_mark = None;
        self.found_mark = None;
        self.update_visible();
        self.invalidate();
    }

    /// Shows a generated page describing `code` and finishes the fetch.
    pub(crate) fn show_error_page(&mut self, code: StatusCode, meta: Option<&str>) {
        tracing::debug!(url = %self.persisted.url, code = code.as_i32(), "showing error page");
        let source = error_page_source(code, meta, self.config.ordinal_platform.save_shortcut());
        self.doc.set_banner(self.cert.banner_kind());
        self.doc.set_format(SourceFormat::Gemini);
        self.set_source(&source);
        let now = self.now();
        self.scroll_y.init(0.0, now);
        self.side_opacity.init(0.0, now);
        self.reset_wide_runs();
        self.state = RequestState::Ready;
    }

    /// Refreshes the certificate snapshot and the banner derived from it.
    pub(crate) fn update_trust(&mut self, cert: Option<&TrustSnapshot>) {
        if let Some(cert) = cert {
            self.cert = cert.clone();
        }
        if !self.cert.flags.contains(CertFlags::AVAILABLE) {
            return;
        }
        let host = GemUrl::parse(&self.persisted.url)
            .map(|url| url.host().to_owned())
            .unwrap_or_default();
        let pinned = !host.is_empty()
            && self
                .context
                .trust_store()
                .is_trusted(&host, &self.cert.fingerprint);
        if pinned {
            self.cert.flags.insert(CertFlags::TRUSTED);
        }
        self.doc.set_banner(self.cert.banner_kind());
    }

    /// Shows the cached response of the current URL instead of fetching.
    ///
    /// Returns `false` when history has nothing cached for it.
    pub(crate) fn update_from_history(&mut self) -> bool {
        let Some(recent) = self.persisted.history.find_url(&self.persisted.url) else {
            return false;
        };
        let Some(response) = recent.cached_response.clone() else {
            return false;
        };
        let norm = recent.norm_scroll_y;
        tracing::debug!(url = %self.persisted.url, "showing cached content");

        if let Some(previous) = self.request.take() {
            previous.cancel();
        }
        self.media_requests.clear();
        self.doc.reset();
        self.document_runs_invalidated();
        self.state = RequestState::Fetching;
        self.init_norm_scroll_y = norm;
        self.reset_wide_runs();
        self.update_trust(Some(&response.cert));
        self.source_status = StatusCode::SUCCESS;
        self.source_header = "(cached content)".to_owned();
        self.source_content = response.body.clone();
        self.update_document(&response, true);

        let now = self.now();
        let height = self.doc.size().y as f32;
        self.scroll_y.init(norm * height, now);
        self.state = RequestState::Ready;
        self.update_side_opacity(false);
        self.update_visible();
        self.emit(SessionEvent::DocumentChanged {
            url: self.persisted.url.clone(),
        });
        true
    }
}
