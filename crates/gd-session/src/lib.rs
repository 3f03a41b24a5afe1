//! Document session controller: one browsing tab from URL to painted tiles.

mod config;
mod context;
mod draw;
mod error_page;
mod interaction;
mod lifecycle;
mod media;
mod navigation;
mod ordinal;
mod scroll;
mod text;
mod ticker;
mod visible;
mod wide;


pub use config::OrdinalPlatform;
pub use config::SessionConfig;
pub use context::SessionContext;
pub use interaction::Modifiers;
pub use interaction::PointerButton;
pub use media::MediaProgress;
pub use navigation::PageInfo;
pub use ordinal::OrdinalMode;
pub use visible::VisibleSet;

use crate::interaction::Mark;
use crate::media::MediaRequests;
use crate::ordinal::LinkKeys;
use crate::ticker::MediaTicker;
use crate::wide::WideBlocks;
use gd_anim::AnimatedScalar;
use gd_anim::Click;
use gd_core::Int2;
use gd_core::Rect;
use gd_document::Document;
use gd_document::LineDocument;
use gd_document::LinkId;
use gd_document::MediaId;
use gd_ipc::SessionEvent;
use gd_net::NoticeReceiver;
use gd_net::NoticeSender;
use gd_net::Request;
use gd_net::RequestId;
use gd_net::StatusCode;
use gd_net::notice_channel;
use gd_render::Frame;
use gd_render::InvalidationSet;
use gd_render::Painter;
use gd_render::TileCache;
use gd_render::VisBuffer;
use gd_security::LockIndicator;
use gd_security::TrustSnapshot;
use gd_storage::History;
use gd_storage::PersistedSession;
use gd_storage::ReloadInterval;
use std::ops::Range;

/// Viewport assumed until the first [`DocumentSession::resize`].
pub const DEFAULT_VIEWPORT: Int2 = Int2::new(800, 600);

/// Progress of the primary fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Blank,
    Fetching,
    ReceivedPartial,
    Ready,
}

/// Everything one tab knows about the page it shows.
///
/// All methods run on the owning thread. Background fetches report through
/// a notice channel that [`DocumentSession::poll`] drains once per frame.
pub struct DocumentSession {
    context: SessionContext,
    config: SessionConfig,
    doc: Box<dyn Document>,
    state: RequestState,
    persisted: PersistedSession,
    title_user: String,

    request: Option<Request>,
    next_request_id: u64,
    notice_tx: NoticeSender,
    notices: NoticeReceiver,
    media_requests: MediaRequests,
    redirect_count: u8,
    init_norm_scroll_y: f32,
    pending_goto_heading: Option<String>,

    cert: TrustSnapshot,
    source_header: String,
    source_mime: String,
    source_status: StatusCode,
    source_content: Vec<u8>,
    source_time: Option<u64>,

    viewport: Int2,
    scroll_y: AnimatedScalar,
    scroll_animating: bool,
    side_opacity: AnimatedScalar,
    center_vertically: bool,
    side_heading: Option<String>,
    visible: VisibleSet,
    wide: WideBlocks,
    invalid: InvalidationSet,
    vis_buf: VisBuffer,

    click: Click,
    last_pointer: Option<Int2>,
    no_hover_while_scrolling: bool,
    hover_link: LinkId,
    context_link: LinkId,
    selecting: bool,
    select_mark: Option<Mark>,
    found_mark: Option<Range<usize>>,
    link_keys: LinkKeys,
    grabbed_player: Option<(MediaId, f32)>,
    ticker: MediaTicker,
}

impl std::fmt::Debug for DocumentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSession")
            .field("url", &self.persisted.url)
            .field("state", &self.state)
            .field("request", &self.request)
            .field("media_requests", &self.media_requests.len())
            .finish_non_exhaustive()
    }
}

impl DocumentSession {
    pub fn new(context: SessionContext, config: SessionConfig, doc: Box<dyn Document>) -> Self {
        let now = context.clock.now_ms();
        let (notice_tx, notices) = notice_channel();
        Self {
            context,
            config,
            doc,
            state: RequestState::Blank,
            persisted: PersistedSession::default(),
            title_user: String::new(),
            request: None,
            next_request_id: 0,
            notice_tx,
            notices,
            media_requests: MediaRequests::default(),
            redirect_count: 0,
            init_norm_scroll_y: 0.0,
            pending_goto_heading: None,
            cert: TrustSnapshot::default(),
            source_header: String::new(),
            source_mime: String::new(),
            source_status: StatusCode::NONE,
            source_content: Vec::new(),
            source_time: None,
            viewport: DEFAULT_VIEWPORT,
            scroll_y: AnimatedScalar::new(0.0, now),
            scroll_animating: false,
            side_opacity: AnimatedScalar::new(0.0, now),
            center_vertically: false,
            side_heading: None,
            visible: VisibleSet::default(),
            wide: WideBlocks::new(now),
            invalid: InvalidationSet::default(),
            vis_buf: VisBuffer::new(DEFAULT_VIEWPORT.y),
            click: Click::new(Rect::new(0, 0, DEFAULT_VIEWPORT.x, DEFAULT_VIEWPORT.y)),
            last_pointer: None,
            no_hover_while_scrolling: false,
            hover_link: 0,
            context_link: 0,
            selecting: false,
            select_mark: None,
            found_mark: None,
            link_keys: LinkKeys::default(),
            grabbed_player: None,
            ticker: MediaTicker::default(),
        }
    }

    /// Session backed by the fixed-pitch [`LineDocument`] layout.
    pub fn with_line_layout(context: SessionContext, config: SessionConfig) -> Self {
        let doc = LineDocument::new(config.layout_metrics());
        Self::new(context, config, Box::new(doc))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn url(&self) -> &str {
        &self.persisted.url
    }

    pub fn document(&self) -> &dyn Document {
        self.doc.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.persisted.history
    }

    pub fn reload_interval(&self) -> ReloadInterval {
        self.persisted.reload_interval
    }

    pub fn set_reload_interval(&mut self, interval: ReloadInterval) {
        self.persisted.reload_interval = interval;
    }

    pub fn is_requesting(&self) -> bool {
        self.request.is_some()
    }

    pub fn redirect_count(&self) -> u8 {
        self.redirect_count
    }

    pub fn certificate(&self) -> &TrustSnapshot {
        &self.cert
    }

    pub fn lock_indicator(&self) -> LockIndicator {
        self.cert.lock_indicator()
    }

    pub fn source_header(&self) -> &str {
        &self.source_header
    }

    pub fn source_mime(&self) -> &str {
        &self.source_mime
    }

    pub fn source_status(&self) -> StatusCode {
        self.source_status
    }

    pub fn source_content(&self) -> &[u8] {
        &self.source_content
    }

    pub fn viewport(&self) -> Int2 {
        self.viewport
    }

    pub fn visible(&self) -> &VisibleSet {
        &self.visible
    }

    /// Current scroll position in document pixels.
    pub fn scroll_y(&self) -> i32 {
        self.scroll_value()
    }

    pub fn side_opacity(&self) -> f32 {
        self.side_opacity.value_at(self.now())
    }

    /// Top-level heading the reader is currently in.
    pub fn side_heading(&self) -> Option<&str> {
        self.side_heading.as_deref()
    }

    pub fn hover_link(&self) -> Option<LinkId> {
        (self.hover_link != 0).then_some(self.hover_link)
    }

    /// Link the last secondary click landed on.
    pub fn context_link(&self) -> Option<LinkId> {
        (self.context_link != 0).then_some(self.context_link)
    }

    /// Selected source range, normalized.
    pub fn selection(&self) -> Option<Range<usize>> {
        self.select_mark.map(Mark::range)
    }

    pub fn found_mark(&self) -> Option<Range<usize>> {
        self.found_mark.clone()
    }

    /// Download progress label, shown once a fetch grows past 250 kB.
    pub fn fetch_progress(&self) -> Option<String> {
        let request = self.request.as_ref()?;
        let bytes = request.body_size();
        (bytes >= 250_000).then(|| format!("{:.3} MB", bytes as f64 / 1.0e6))
    }

    /// Drains fetch notices, polls animations and syncs the tile cache.
    pub fn frame(&mut self, painter: &mut dyn Painter) -> Frame {
        self.poll();
        self.tick();
        self.draw(painter)
    }

    fn now(&self) -> u64 {
        self.context.clock.now_ms()
    }

    fn next_request_id(&mut self) -> RequestId {
        self.next_request_id += 1;
        RequestId(self.next_request_id)
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(error) = self.context.events.send(&event) {
            tracing::warn!(%error, event = event.name(), "session event not delivered");
        }
    }

    /// Forgets everything that pointed into the previous layout.
    fn document_runs_invalidated(&mut self) {
        self.visible.clear();
        self.hover_link = 0;
        self.context_link = 0;
        self.invalid.clear();
    }

    /// Drops every drawn tile; the next frame repaints the visible range.
    fn invalidate(&mut self) {
        self.vis_buf.invalidate();
        self.invalid.clear();
    }

    fn redo_layout(&mut self) {
        self.doc.redo_layout();
        self.document_runs_invalidated();
    }
}
